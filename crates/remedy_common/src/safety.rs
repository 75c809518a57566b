//! Request text screening.
//!
//! Incoming request text is scanned before any collection or planning
//! happens. Instruction-override attempts block the session outright;
//! personal data is masked in place; destructive phrasing only raises
//! a warning since the planner itself never deletes anything.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static OVERRIDE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)ignore\s+previous\s+instructions").unwrap(),
        Regex::new(r"(?i)forget\s+everything").unwrap(),
        Regex::new(r"(?i)you\s+are\s+now").unwrap(),
        Regex::new(r"(?i)act\s+as\s+if").unwrap(),
        Regex::new(r"(?i)pretend\s+to\s+be").unwrap(),
        Regex::new(r"(?i)system\s*:").unwrap(),
        Regex::new(r"(?i)assistant\s*:").unwrap(),
        Regex::new(r"(?i)user\s*:").unwrap(),
        Regex::new(r"<\|im_start\|>").unwrap(),
        Regex::new(r"<\|im_end\|>").unwrap(),
    ]
});

static PERSONAL_DATA_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "email",
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
        ),
        (
            "phone",
            Regex::new(r"\b\d{3}-\d{3}-\d{4}\b|\b\(\d{3}\)\s?\d{3}-\d{4}\b").unwrap(),
        ),
        ("ssn", Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap()),
        (
            "credit_card",
            Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").unwrap(),
        ),
        (
            "ip_address",
            Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap(),
        ),
    ]
});

const SUSPICIOUS_PHRASES: &[&str] = &[
    "delete everything",
    "remove all",
    "destroy",
    "wipe",
    "format c:",
    "rm -rf",
    "del /f /s",
    "shutdown -s -t 0",
];

/// Outcome of scanning one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyScan {
    /// Request must not proceed
    pub blocked: bool,
    pub block_reason: Option<String>,
    /// Request text with personal data masked
    pub sanitized: String,
    pub warnings: Vec<String>,
}

/// Scan request text for override attempts, personal data, and
/// destructive phrasing.
pub fn scan_request(text: &str) -> SafetyScan {
    for pattern in OVERRIDE_PATTERNS.iter() {
        if pattern.is_match(text) {
            return SafetyScan {
                blocked: true,
                block_reason: Some(format!(
                    "instruction override pattern detected: {}",
                    pattern.as_str()
                )),
                sanitized: String::new(),
                warnings: Vec::new(),
            };
        }
    }

    let mut sanitized = text.to_string();
    let mut warnings = Vec::new();

    for (label, pattern) in PERSONAL_DATA_PATTERNS.iter() {
        if pattern.is_match(&sanitized) {
            sanitized = pattern
                .replace_all(&sanitized, |caps: &regex::Captures| {
                    "*".repeat(caps[0].len())
                })
                .into_owned();
            warnings.push(format!("masked {} in request text", label));
        }
    }

    let lowered = text.to_lowercase();
    for phrase in SUSPICIOUS_PHRASES {
        if lowered.contains(phrase) {
            warnings.push(format!("request mentions destructive phrase: {}", phrase));
        }
    }

    SafetyScan {
        blocked: false,
        block_reason: None,
        sanitized,
        warnings,
    }
}
