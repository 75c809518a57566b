//! Audit record shared by the engine's JSONL logger and its readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One appended audit line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub action_type: String,
    pub details: String,
    pub success: bool,
}

impl AuditEntry {
    pub fn new(actor: &str, action_type: &str, details: impl Into<String>, success: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.to_string(),
            action_type: action_type.to_string(),
            details: details.into(),
            success,
        }
    }
}
