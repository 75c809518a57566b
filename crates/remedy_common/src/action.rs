//! Remediation actions and their execution records.

use serde::{Deserialize, Serialize};

/// A concrete repair step. Never mutated after planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Start the target machine.
    StartMachine,
    /// Create or update the managed allow rule at this precedence.
    EnsureAllowRule { precedence: u32 },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::StartMachine => ActionKind::StartMachine,
            Self::EnsureAllowRule { .. } => ActionKind::EnsureAllowRule,
        }
    }

    /// Operator-facing description for plan listings.
    pub fn describe(&self) -> String {
        match self {
            Self::StartMachine => "start the machine".to_string(),
            Self::EnsureAllowRule { precedence } => format!(
                "ensure an allow rule for the remote-access port at precedence {}",
                precedence
            ),
        }
    }
}

/// Payload-free mirror of [`Action`], used as a table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    StartMachine,
    EnsureAllowRule,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StartMachine => "start_machine",
            Self::EnsureAllowRule => "ensure_allow_rule",
        };
        write!(f, "{}", s)
    }
}

/// A planned step plus its dependency marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub action: Action,
    /// Skipped when an earlier machine start failed.
    pub requires_running_machine: bool,
}

/// Outcome record for one executed (or skipped) action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: Action,
    pub authorized: bool,
    /// True when the action's outcome is in effect, including the case
    /// where it was already satisfied and no write was needed.
    pub applied: bool,
    pub error: Option<String>,
    pub message: String,
}

impl ActionResult {
    pub fn succeeded(&self) -> bool {
        self.authorized && self.applied && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_mapping() {
        assert_eq!(Action::StartMachine.kind(), ActionKind::StartMachine);
        assert_eq!(
            Action::EnsureAllowRule { precedence: 499 }.kind(),
            ActionKind::EnsureAllowRule
        );
    }

    #[test]
    fn test_kind_display_matches_serde() {
        let json = serde_json::to_string(&ActionKind::EnsureAllowRule).unwrap();
        assert_eq!(json, format!("\"{}\"", ActionKind::EnsureAllowRule));
    }

    #[test]
    fn test_skipped_result_is_not_success() {
        let result = ActionResult {
            action: Action::EnsureAllowRule { precedence: 500 },
            authorized: true,
            applied: false,
            error: None,
            message: "skipped".to_string(),
        };
        assert!(!result.succeeded());
    }
}
