//! Typed error taxonomy for the engine surface.

use crate::facts::FactKind;
use crate::session::SessionStage;
use thiserror::Error;
use uuid::Uuid;

/// Failure of one read-only fact collector. The synthesizer downgrades
/// these to issues; they are never fatal to a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectorError {
    #[error("{fact} collection timed out after {secs}s")]
    Timeout { fact: FactKind, secs: u64 },

    #[error("{fact} collection failed: {message}")]
    Failed { fact: FactKind, message: String },
}

impl CollectorError {
    pub fn fact(&self) -> FactKind {
        match self {
            Self::Timeout { fact, .. } | Self::Failed { fact, .. } => *fact,
        }
    }
}

/// Error from a cloud capability call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapabilityError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("provider call failed: {0}")]
    Provider(String),
}

/// Errors surfaced by the session engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Collector(#[from] CollectorError),

    /// No winning precedence exists; the session fails without writes.
    #[error("no viable plan: {detail}")]
    PlanningImpossible { detail: String },

    /// Gate rejection, carrying the missing permission or the
    /// input-safety reason.
    #[error("authorization denied: {detail}")]
    AuthorizationDenied { detail: String },

    /// Recorded per-action; never aborts the remaining plan by itself.
    #[error("execution failed: {detail}")]
    Execution { detail: String },

    #[error("session {id} not found")]
    SessionNotFound { id: Uuid },

    #[error("operation not valid in stage {stage}")]
    InvalidStage { stage: SessionStage },

    #[error("run cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_error_messages() {
        let err = CollectorError::Timeout {
            fact: FactKind::Power,
            secs: 10,
        };
        assert_eq!(err.to_string(), "power collection timed out after 10s");
        assert_eq!(err.fact(), FactKind::Power);
    }

    #[test]
    fn test_engine_error_wraps_collector() {
        let err: EngineError = CollectorError::Failed {
            fact: FactKind::Acl,
            message: "boom".to_string(),
        }
        .into();
        assert!(err.to_string().contains("acl collection failed"));
    }

    #[test]
    fn test_invalid_stage_names_the_stage() {
        let err = EngineError::InvalidStage {
            stage: SessionStage::Executing,
        };
        assert!(err.to_string().contains("executing"));
    }
}
