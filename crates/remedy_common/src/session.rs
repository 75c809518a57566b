//! Session records: one troubleshooting-and-repair run from collection
//! through validation.

use crate::action::{ActionResult, PlannedAction};
use crate::issue::Issue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Machine addressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRef {
    pub resource_group: String,
    pub name: String,
}

impl std::fmt::Display for MachineRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.name)
    }
}

/// Network security group addressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclContext {
    pub resource_group: String,
    pub group_name: String,
}

impl std::fmt::Display for AclContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.group_name)
    }
}

/// Everything one run targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub machine: MachineRef,
    pub acl: AclContext,
}

impl TargetRef {
    /// Target where the security group lives in the machine's resource group.
    pub fn in_group(resource_group: &str, machine: &str, acl_group: &str) -> Self {
        Self {
            machine: MachineRef {
                resource_group: resource_group.to_string(),
                name: machine.to_string(),
            },
            acl: AclContext {
                resource_group: resource_group.to_string(),
                group_name: acl_group.to_string(),
            },
        }
    }
}

/// Stages of a session. `Validated` and `Failed` never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    Collecting,
    Diagnosed,
    AwaitingConfirmation,
    Executing,
    Validated,
    Failed,
}

impl SessionStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Validated | Self::Failed)
    }
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Collecting => "collecting",
            Self::Diagnosed => "diagnosed",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Executing => "executing",
            Self::Validated => "validated",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Validation outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One re-checked post-condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl ValidationCheck {
    pub fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Post-execution verification report. A failed expectation is data in
/// here, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<ValidationCheck>,
    pub status: RunStatus,
}

impl ValidationReport {
    /// Report for a run that found nothing to repair.
    pub fn healthy() -> Self {
        Self {
            checks: vec![],
            status: RunStatus::Success,
        }
    }
}

/// Machine-readable terminal failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PlanningImpossible,
    AuthorizationDenied,
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PlanningImpossible => "planning_impossible",
            Self::AuthorizationDenied => "authorization_denied",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Why a session ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub detail: String,
}

/// One troubleshooting-and-repair run. Owned by the session engine and
/// mutated only at stage transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub target: TargetRef,
    pub stage: SessionStage,
    pub issues: Vec<Issue>,
    pub plan: Vec<PlannedAction>,
    pub results: Vec<ActionResult>,
    pub validation: Option<ValidationReport>,
    pub narrative: Option<String>,
    pub failure: Option<FailureReason>,
    /// Originating request, stored after safety masking.
    pub request_text: Option<String>,
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(target: TargetRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            stage: SessionStage::Collecting,
            issues: vec![],
            plan: vec![],
            results: vec![],
            validation: None,
            narrative: None,
            failure: None,
            request_text: None,
            warnings: vec![],
            created_at: Utc::now(),
        }
    }

    /// Move to the terminal failed stage with a machine-readable reason.
    pub fn fail(&mut self, kind: FailureKind, detail: impl Into<String>) {
        self.stage = SessionStage::Failed;
        self.failure = Some(FailureReason {
            kind,
            detail: detail.into(),
        });
    }
}
