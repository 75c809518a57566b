//! Deterministic request classifier.
//!
//! Routes raw request text before any cloud call happens. Connectivity
//! complaints start a diagnosis; bare approvals confirm a pending plan;
//! everything else is answered without touching the provider.

use serde::{Deserialize, Serialize};

/// Known request intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestIntent {
    /// Remote-access connectivity complaint, starts a diagnosis
    Troubleshoot,
    /// Approval of a pending plan
    Confirmation,
    /// General question, no session needed
    GeneralQuestion,
    /// Out of scope for this engine
    Unrelated,
}

impl std::fmt::Display for RequestIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Troubleshoot => "troubleshoot",
            Self::Confirmation => "confirmation",
            Self::GeneralQuestion => "general_question",
            Self::Unrelated => "unrelated",
        };
        write!(f, "{}", s)
    }
}

const TROUBLESHOOT_HINTS: &[&str] = &[
    "rdp",
    "remote desktop",
    "3389",
    "can't connect",
    "cannot connect",
    "can not connect",
    "unable to connect",
    "connection failed",
    "connection timed out",
    "unreachable",
    "connect to my vm",
    "connect to the vm",
    "vm is not reachable",
];

const CONFIRMATION_WORDS: &[&str] = &[
    "yes", "proceed", "execute", "fix", "resolve", "apply", "confirm",
];

const CONFIRMATION_PHRASES: &[&str] = &["go ahead", "do it"];

/// Classify request text to a known intent
pub fn classify_request(text: &str) -> RequestIntent {
    let lowered = text.to_lowercase();

    // Connectivity complaints win even when phrased as approval
    // ("fix my rdp" is a new diagnosis, not a confirmation).
    if TROUBLESHOOT_HINTS.iter().any(|hint| lowered.contains(hint)) {
        return RequestIntent::Troubleshoot;
    }

    let words: Vec<&str> = lowered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .collect();
    if words.iter().any(|w| CONFIRMATION_WORDS.contains(w))
        || CONFIRMATION_PHRASES.iter().any(|p| lowered.contains(p))
    {
        return RequestIntent::Confirmation;
    }

    let trimmed = lowered.trim();
    if trimmed.ends_with('?')
        || trimmed.starts_with("how ")
        || trimmed.starts_with("what ")
        || trimmed.starts_with("why ")
        || trimmed.starts_with("help")
    {
        return RequestIntent::GeneralQuestion;
    }

    RequestIntent::Unrelated
}
