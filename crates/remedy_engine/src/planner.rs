//! Plan construction.
//!
//! One action per issue class, power recovery first. An outranking
//! deny at the platform minimum leaves no legal precedence for the
//! allow rule, which makes the whole plan impossible.

use crate::resolver;
use remedy_common::config::PrecedenceConfig;
use remedy_common::{Action, EngineError, Issue, PlannedAction};

/// Order remediation actions for the issues found.
pub fn plan(issues: &[Issue], window: &PrecedenceConfig) -> Result<Vec<PlannedAction>, EngineError> {
    let mut actions = Vec::new();

    if issues.iter().any(|i| matches!(i, Issue::PowerOff { .. })) {
        actions.push(PlannedAction {
            action: Action::StartMachine,
            requires_running_machine: false,
        });
    }

    let rule_fix = issues.iter().find_map(|issue| match issue {
        Issue::PortBlocked { analysis, .. } => Some(analysis.best_deny_precedence),
        Issue::PrecedenceConflict {
            deny_precedence, ..
        } => Some(Some(*deny_precedence)),
        _ => None,
    });

    if let Some(best_deny) = rule_fix {
        match resolver::fix_precedence(best_deny, window) {
            Some(precedence) => actions.push(PlannedAction {
                action: Action::EnsureAllowRule { precedence },
                requires_running_machine: false,
            }),
            None => {
                let deny = best_deny.unwrap_or(window.minimum);
                return Err(EngineError::PlanningImpossible {
                    detail: format!(
                        "deny rule at precedence {} cannot be outranked (platform minimum {})",
                        deny, window.minimum
                    ),
                });
            }
        }
    }

    Ok(actions)
}
