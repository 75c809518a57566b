//! Post-execution validation.
//!
//! Re-reads only the facts the executed actions were meant to change
//! and grades the run. A plan that applied cleanly but left the port
//! blocked is a partial success, not a success.

use crate::capability::CloudHandles;
use crate::collectors;
use crate::resolver;
use remedy_common::{
    ActionKind, ActionResult, Config, PowerState, RunStatus, TargetRef, ValidationCheck,
    ValidationReport,
};
use std::collections::HashSet;
use std::time::Duration;

/// Verify the executed plan took effect.
pub async fn validate(
    results: &[ActionResult],
    target: &TargetRef,
    cloud: &CloudHandles,
    config: &Config,
) -> ValidationReport {
    let limit = Duration::from_secs(config.collect.timeout_secs);
    let verified: HashSet<ActionKind> = results
        .iter()
        .filter(|r| r.succeeded())
        .map(|r| r.action.kind())
        .collect();

    let mut checks = Vec::new();

    if verified.contains(&ActionKind::StartMachine) {
        match collectors::collect_power(target, cloud, limit).await {
            Ok(fact) if fact.exists && fact.power_state == PowerState::Running => {
                checks.push(ValidationCheck::pass(
                    "machine_running",
                    "machine reports running",
                ));
            }
            Ok(fact) => checks.push(ValidationCheck::fail(
                "machine_running",
                format!("machine reports {}", fact.power_state),
            )),
            Err(e) => checks.push(ValidationCheck::fail(
                "machine_running",
                format!("could not re-read power state: {}", e),
            )),
        }
    }

    if verified.contains(&ActionKind::EnsureAllowRule) {
        match collectors::collect_acl(target, cloud, limit).await {
            Ok(rules) => {
                let analysis =
                    resolver::analyze_rules(&rules, config.rule.port, config.rule.protocol);
                if analysis.port_allowed && !analysis.conflict {
                    checks.push(ValidationCheck::pass(
                        "port_admitted",
                        format!("port {} is admitted", config.rule.port),
                    ));
                } else {
                    checks.push(ValidationCheck::fail(
                        "port_admitted",
                        format!("port {} is still blocked", config.rule.port),
                    ));
                }
            }
            Err(e) => checks.push(ValidationCheck::fail(
                "port_admitted",
                format!("could not re-read rules: {}", e),
            )),
        }
    }

    let all_succeeded = results.iter().all(|r| r.succeeded());
    let any_succeeded = results.iter().any(|r| r.succeeded());
    let checks_pass = checks.iter().all(|c| c.passed);

    let status = if all_succeeded && checks_pass {
        RunStatus::Success
    } else if any_succeeded {
        RunStatus::PartialSuccess
    } else {
        RunStatus::Failed
    };

    ValidationReport { checks, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{deny_rule, sim_target, Scenario, SimCloud};
    use remedy_common::Action;

    fn applied(action: Action) -> ActionResult {
        ActionResult {
            action,
            authorized: true,
            applied: true,
            error: None,
            message: "applied".to_string(),
        }
    }

    fn failed(action: Action) -> ActionResult {
        ActionResult {
            action,
            authorized: true,
            applied: false,
            error: Some("provider error".to_string()),
            message: "failed".to_string(),
        }
    }

    #[tokio::test]
    async fn test_clean_run_validates_as_success() {
        let cloud = SimCloud::with_scenario(Scenario::Healthy);
        let results = vec![
            applied(Action::StartMachine),
            applied(Action::EnsureAllowRule { precedence: 500 }),
        ];
        let report = validate(
            &results,
            &sim_target(),
            &cloud.handles(),
            &Config::default(),
        )
        .await;

        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.checks.len(), 2);
        assert!(report.checks.iter().all(|c| c.passed));
    }

    #[tokio::test]
    async fn test_applied_rule_that_left_the_port_blocked_is_partial() {
        let cloud = SimCloud::with_scenario(Scenario::Healthy);
        let target = sim_target();
        // Another deny still outranks whatever the write achieved.
        cloud.put_rules(&target.acl, vec![deny_rule("DenyAll", 3389, 100)]);

        let results = vec![applied(Action::EnsureAllowRule { precedence: 500 })];
        let report = validate(&results, &target, &cloud.handles(), &Config::default()).await;

        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert!(!report.checks[0].passed);
    }

    #[tokio::test]
    async fn test_nothing_succeeded_is_failed() {
        let cloud = SimCloud::with_scenario(Scenario::Stopped);
        let results = vec![failed(Action::StartMachine)];
        let report = validate(
            &results,
            &sim_target(),
            &cloud.handles(),
            &Config::default(),
        )
        .await;

        assert_eq!(report.status, RunStatus::Failed);
        // No check runs for an action that never applied.
        assert!(report.checks.is_empty());
    }

    #[tokio::test]
    async fn test_mixed_results_are_partial() {
        let cloud = SimCloud::with_scenario(Scenario::Healthy);
        let results = vec![
            failed(Action::StartMachine),
            applied(Action::EnsureAllowRule { precedence: 500 }),
        ];
        let report = validate(
            &results,
            &sim_target(),
            &cloud.handles(),
            &Config::default(),
        )
        .await;

        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].name, "port_admitted");
    }
}
