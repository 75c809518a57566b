//! Authorization gate.
//!
//! Every planned action maps to the platform permissions it needs. An
//! action with no mapping is denied, never waved through.

use remedy_common::{ActionKind, PlannedAction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Verdict for one planned action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateVerdict {
    pub kind: ActionKind,
    pub allowed: bool,
    pub detail: String,
}

impl GateVerdict {
    fn allowed(kind: ActionKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            allowed: true,
            detail: detail.into(),
        }
    }

    fn denied(kind: ActionKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            allowed: false,
            detail: detail.into(),
        }
    }
}

/// Permission table keyed by action kind. Any one of the listed
/// permissions suffices.
pub struct SafetyGate {
    table: HashMap<ActionKind, Vec<String>>,
}

impl Default for SafetyGate {
    fn default() -> Self {
        let mut table = HashMap::new();
        table.insert(
            ActionKind::StartMachine,
            vec!["Microsoft.Compute/virtualMachines/start/action".to_string()],
        );
        table.insert(
            ActionKind::EnsureAllowRule,
            vec!["Microsoft.Network/networkSecurityGroups/write".to_string()],
        );
        Self { table }
    }
}

impl SafetyGate {
    pub fn with_table(table: HashMap<ActionKind, Vec<String>>) -> Self {
        Self { table }
    }

    /// Check one action kind against the granted permission set.
    pub fn check(&self, kind: ActionKind, granted: &[String]) -> GateVerdict {
        let required = match self.table.get(&kind) {
            Some(required) => required,
            None => {
                warn!("No permission mapping for action {}, denying", kind);
                return GateVerdict::denied(
                    kind,
                    format!("no permission mapping for action {}", kind),
                );
            }
        };

        match required.iter().find(|p| granted.contains(p)) {
            Some(permission) => GateVerdict::allowed(kind, format!("authorized via {}", permission)),
            None => GateVerdict::denied(
                kind,
                format!("missing permission {}", required.join(" or ")),
            ),
        }
    }

    /// Check a whole plan, one verdict per action.
    pub fn check_plan(&self, plan: &[PlannedAction], granted: &[String]) -> Vec<GateVerdict> {
        plan.iter()
            .map(|planned| self.check(planned.action.kind(), granted))
            .collect()
    }

    /// Every permission the table mentions, sorted and deduplicated.
    pub fn known_permissions(&self) -> Vec<String> {
        let mut permissions: Vec<String> = self.table.values().flatten().cloned().collect();
        permissions.sort();
        permissions.dedup();
        permissions
    }
}

/// A plan proceeds only when every verdict allows it.
pub fn plan_allowed(verdicts: &[GateVerdict]) -> bool {
    verdicts.iter().all(|v| v.allowed)
}
