//! Shared data model and cross-cutting utilities for the remedy workspace.
//!
//! Plain serde types used by both the engine and the front-end, plus the
//! concerns they share: configuration loading, request safety scanning,
//! and audit record types.

pub mod acl;
pub mod action;
pub mod audit;
pub mod config;
pub mod error;
pub mod facts;
pub mod issue;
pub mod safety;
pub mod session;

pub use acl::{AclAnalysis, AclRule, Direction, PortSpec, Protocol, RuleAccess, RuleSpec};
pub use action::{Action, ActionKind, ActionResult, PlannedAction};
pub use audit::AuditEntry;
pub use config::Config;
pub use error::{CapabilityError, CollectorError, EngineError};
pub use facts::{FactKind, PowerFact, PowerState, ReachabilityFact};
pub use issue::Issue;
pub use safety::{scan_request, SafetyScan};
pub use session::{
    AclContext, FailureKind, FailureReason, MachineRef, RunStatus, Session, SessionStage,
    TargetRef, ValidationCheck, ValidationReport,
};
