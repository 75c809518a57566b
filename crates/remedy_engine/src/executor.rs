//! Idempotent plan execution.
//!
//! Every action reads current state before writing and degrades to a
//! no-op when the desired state already holds. A failed machine start
//! skips later actions that depend on a running machine. Audit write
//! failures are logged and never abort the plan.

use crate::audit::AuditLogger;
use crate::capability::CloudHandles;
use remedy_common::{
    Action, ActionResult, AuditEntry, Config, EngineError, PlannedAction, PowerState, TargetRef,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

pub const AUDIT_ACTOR: &str = "remedy_engine";

/// Results plus whether cancellation cut the plan short.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub results: Vec<ActionResult>,
    pub cancelled: bool,
}

/// Execute an authorized plan in order.
pub async fn execute_plan(
    plan: &[PlannedAction],
    target: &TargetRef,
    cloud: &CloudHandles,
    audit: &AuditLogger,
    config: &Config,
    cancel: &AtomicBool,
) -> ExecutionOutcome {
    let mut results = Vec::new();
    let mut machine_start_failed = false;

    for planned in plan {
        if cancel.load(Ordering::SeqCst) {
            return ExecutionOutcome {
                results,
                cancelled: true,
            };
        }

        let result = if planned.requires_running_machine && machine_start_failed {
            ActionResult {
                action: planned.action,
                authorized: true,
                applied: false,
                error: None,
                message: "skipped: machine start failed earlier in the plan".to_string(),
            }
        } else {
            apply_action(&planned.action, target, cloud, config).await
        };

        if planned.action == Action::StartMachine && !result.succeeded() {
            machine_start_failed = true;
        }

        record(audit, &result).await;
        results.push(result);
    }

    ExecutionOutcome {
        results,
        cancelled: false,
    }
}

/// Apply one action, reading current state first.
pub async fn apply_action(
    action: &Action,
    target: &TargetRef,
    cloud: &CloudHandles,
    config: &Config,
) -> ActionResult {
    let outcome = match action {
        Action::StartMachine => start_machine(target, cloud).await,
        Action::EnsureAllowRule { precedence } => {
            ensure_allow_rule(target, cloud, config, *precedence).await
        }
    };

    match outcome {
        Ok(message) => {
            info!("{}: {}", action.kind(), message);
            ActionResult {
                action: *action,
                authorized: true,
                applied: true,
                error: None,
                message,
            }
        }
        Err(e) => {
            error!("{} failed: {}", action.kind(), e);
            ActionResult {
                action: *action,
                authorized: true,
                applied: false,
                error: Some(e.to_string()),
                message: format!("{} failed", action.kind()),
            }
        }
    }
}

async fn start_machine(target: &TargetRef, cloud: &CloudHandles) -> Result<String, EngineError> {
    let fact = cloud
        .power_read
        .get(&target.machine)
        .await
        .map_err(|e| EngineError::Execution {
            detail: format!("power read before start failed: {}", e),
        })?;

    if fact.exists && fact.power_state == PowerState::Running {
        return Ok("machine already running".to_string());
    }

    cloud
        .power_write
        .start(&target.machine)
        .await
        .map_err(|e| EngineError::Execution {
            detail: format!("machine start failed: {}", e),
        })?;

    Ok("machine start issued".to_string())
}

async fn ensure_allow_rule(
    target: &TargetRef,
    cloud: &CloudHandles,
    config: &Config,
    precedence: u32,
) -> Result<String, EngineError> {
    let spec = config.rule.allow_spec(precedence);

    let rules = cloud
        .acl_read
        .list_rules(&target.acl)
        .await
        .map_err(|e| EngineError::Execution {
            detail: format!("rule list before write failed: {}", e),
        })?;

    if let Some(existing) = rules.iter().find(|r| spec.satisfied_by(r)) {
        return Ok(format!(
            "rule {} already in place at precedence {}",
            existing.name, existing.precedence
        ));
    }

    let updating = rules.iter().any(|r| r.name == spec.name);

    cloud
        .acl_write
        .upsert_rule(&target.acl, &spec)
        .await
        .map_err(|e| EngineError::Execution {
            detail: format!("rule write failed: {}", e),
        })?;

    if updating {
        Ok(format!("rule {} updated to precedence {}", spec.name, precedence))
    } else {
        Ok(format!("rule {} added at precedence {}", spec.name, precedence))
    }
}

/// Audit record for one action result.
pub fn audit_entry_for(result: &ActionResult) -> AuditEntry {
    AuditEntry::new(
        AUDIT_ACTOR,
        &result.action.kind().to_string(),
        result
            .error
            .clone()
            .unwrap_or_else(|| result.message.clone()),
        result.applied && result.error.is_none(),
    )
}

async fn record(audit: &AuditLogger, result: &ActionResult) {
    if let Err(e) = audit.log(&audit_entry_for(result)).await {
        warn!("Audit write failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{sim_target, Scenario, SimCloud};
    use std::sync::atomic::AtomicBool;
    use tempfile::TempDir;

    async fn logger(dir: &TempDir) -> AuditLogger {
        AuditLogger::new(dir.path().join("audit.jsonl")).await.unwrap()
    }

    fn start() -> PlannedAction {
        PlannedAction {
            action: Action::StartMachine,
            requires_running_machine: false,
        }
    }

    fn rule(precedence: u32, requires_running_machine: bool) -> PlannedAction {
        PlannedAction {
            action: Action::EnsureAllowRule { precedence },
            requires_running_machine,
        }
    }

    #[tokio::test]
    async fn test_start_is_a_noop_when_already_running() {
        let cloud = SimCloud::with_scenario(Scenario::Healthy);
        let dir = TempDir::new().unwrap();
        let audit = logger(&dir).await;
        let cancel = AtomicBool::new(false);

        let outcome = execute_plan(
            &[start()],
            &sim_target(),
            &cloud.handles(),
            &audit,
            &Config::default(),
            &cancel,
        )
        .await;

        assert!(outcome.results[0].succeeded());
        assert_eq!(outcome.results[0].message, "machine already running");
        assert_eq!(cloud.power_write_count(), 0);
    }

    #[tokio::test]
    async fn test_rule_write_converges_on_the_second_run() {
        let cloud = SimCloud::with_scenario(Scenario::Blocked);
        let dir = TempDir::new().unwrap();
        let audit = logger(&dir).await;
        let cancel = AtomicBool::new(false);
        let target = sim_target();
        let plan = vec![rule(500, false)];

        let first = execute_plan(
            &plan,
            &target,
            &cloud.handles(),
            &audit,
            &Config::default(),
            &cancel,
        )
        .await;
        assert!(first.results[0].succeeded());
        assert!(first.results[0].message.contains("added at precedence 500"));

        let second = execute_plan(
            &plan,
            &target,
            &cloud.handles(),
            &audit,
            &Config::default(),
            &cancel,
        )
        .await;
        assert!(second.results[0].succeeded());
        assert!(second.results[0].message.contains("already in place"));
        assert_eq!(cloud.acl_write_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_start_skips_dependent_actions() {
        let cloud = SimCloud::with_scenario(Scenario::StoppedBlocked);
        cloud.set_fail_power_writes(true);
        let dir = TempDir::new().unwrap();
        let audit = logger(&dir).await;
        let cancel = AtomicBool::new(false);

        let plan = vec![start(), rule(500, true)];
        let outcome = execute_plan(
            &plan,
            &sim_target(),
            &cloud.handles(),
            &audit,
            &Config::default(),
            &cancel,
        )
        .await;

        assert!(!outcome.cancelled);
        assert!(!outcome.results[0].succeeded());
        assert!(outcome.results[0].error.is_some());
        assert!(outcome.results[1].message.contains("skipped"));
        assert!(!outcome.results[1].applied);
        assert_eq!(cloud.acl_write_count(), 0);

        let entries = audit.read_all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.success));
    }

    #[tokio::test]
    async fn test_independent_rule_still_runs_after_failed_start() {
        let cloud = SimCloud::with_scenario(Scenario::StoppedBlocked);
        cloud.set_fail_power_writes(true);
        let dir = TempDir::new().unwrap();
        let audit = logger(&dir).await;
        let cancel = AtomicBool::new(false);

        // ACL writes do not need the machine up.
        let plan = vec![start(), rule(500, false)];
        let outcome = execute_plan(
            &plan,
            &sim_target(),
            &cloud.handles(),
            &audit,
            &Config::default(),
            &cancel,
        )
        .await;

        assert!(!outcome.results[0].succeeded());
        assert!(outcome.results[1].succeeded());
        assert_eq!(cloud.acl_write_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_before_the_first_action() {
        let cloud = SimCloud::with_scenario(Scenario::Stopped);
        let dir = TempDir::new().unwrap();
        let audit = logger(&dir).await;
        let cancel = AtomicBool::new(true);

        let outcome = execute_plan(
            &[start()],
            &sim_target(),
            &cloud.handles(),
            &audit,
            &Config::default(),
            &cancel,
        )
        .await;

        assert!(outcome.cancelled);
        assert!(outcome.results.is_empty());
        assert_eq!(cloud.power_write_count(), 0);
    }
}
