//! Session state machine and engine surface.
//!
//! A session runs Collecting -> Diagnosed -> AwaitingConfirmation ->
//! Executing -> Validated, or lands in Failed with a machine-readable
//! reason. Terminal stages never transition again; the registry lock is
//! never held across an await.

use crate::audit::AuditLogger;
use crate::capability::CloudHandles;
use crate::collectors;
use crate::diagnosis;
use crate::executor;
use crate::gate::{self, SafetyGate};
use crate::narrative::{explain_or_fallback, Narrator};
use crate::planner;
use crate::validation;
use remedy_common::{
    safety, ActionResult, Config, EngineError, FailureKind, Session, SessionStage, TargetRef,
    ValidationReport,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

struct SessionEntry {
    session: Session,
    cancel: Arc<AtomicBool>,
}

/// Drives sessions from collection through validation.
pub struct SessionEngine {
    cloud: CloudHandles,
    narrator: Arc<dyn Narrator>,
    audit: Arc<AuditLogger>,
    gate: SafetyGate,
    config: Config,
    granted: Vec<String>,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl SessionEngine {
    pub fn new(
        cloud: CloudHandles,
        narrator: Arc<dyn Narrator>,
        audit: Arc<AuditLogger>,
        config: Config,
        granted: Vec<String>,
    ) -> Self {
        Self {
            cloud,
            narrator,
            audit,
            gate: SafetyGate::default(),
            config,
            granted,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the default permission table.
    pub fn with_gate(mut self, gate: SafetyGate) -> Self {
        self.gate = gate;
        self
    }

    /// Current snapshot of a session.
    pub async fn get_session(&self, id: Uuid) -> Option<Session> {
        self.sessions
            .lock()
            .await
            .get(&id)
            .map(|entry| entry.session.clone())
    }

    /// Raise the cancel flag. A pending session fails immediately; an
    /// executing one stops at the next action boundary; a terminal one
    /// is returned unchanged.
    pub async fn cancel(&self, id: Uuid) -> Result<Session, EngineError> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or(EngineError::SessionNotFound { id })?;

        entry.cancel.store(true, Ordering::SeqCst);
        if !entry.session.stage.is_terminal() && entry.session.stage != SessionStage::Executing {
            entry
                .session
                .fail(FailureKind::Cancelled, "cancelled before execution");
            info!("Session {} cancelled", id);
        }
        Ok(entry.session.clone())
    }

    async fn insert(&self, session: Session, cancel: Arc<AtomicBool>) {
        self.sessions
            .lock()
            .await
            .insert(session.id, SessionEntry { session, cancel });
    }

    /// Apply a mutation under the registry lock and return the new
    /// snapshot. Terminal sessions come back unchanged.
    async fn update<F>(&self, id: Uuid, apply: F) -> Result<Session, EngineError>
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or(EngineError::SessionNotFound { id })?;
        if !entry.session.stage.is_terminal() {
            apply(&mut entry.session);
        }
        Ok(entry.session.clone())
    }

    /// Collect facts, diagnose, plan, and gate one target.
    ///
    /// Returns the session at `awaiting_confirmation` with a proposed
    /// plan, at `validated` when there is nothing to fix, or at `failed`
    /// when the request is rejected, planning is impossible, or the
    /// caller lacks permissions. With confirmation disabled in config the
    /// session runs straight through execution.
    pub async fn run_diagnosis(
        &self,
        target: TargetRef,
        request_text: &str,
    ) -> Result<Session, EngineError> {
        let scan = safety::scan_request(request_text);
        let mut session = Session::new(target.clone());
        let id = session.id;
        let cancel = Arc::new(AtomicBool::new(false));

        if scan.blocked {
            let reason = scan
                .block_reason
                .unwrap_or_else(|| "unsafe request".to_string());
            warn!("Session {} rejected: {}", id, reason);
            session.fail(
                FailureKind::AuthorizationDenied,
                format!("input rejected: {}", reason),
            );
            self.insert(session.clone(), cancel).await;
            return Ok(session);
        }

        session.request_text = Some(scan.sanitized);
        session.warnings = scan.warnings;
        info!("Session {} collecting facts for {}", id, target.machine);
        self.insert(session, cancel.clone()).await;

        let limit = Duration::from_secs(self.config.collect.timeout_secs);
        let facts = collectors::collect_facts(&target, &self.cloud, limit).await;

        if cancel.load(Ordering::SeqCst) {
            return self
                .update(id, |s| {
                    s.fail(FailureKind::Cancelled, "cancelled during collection")
                })
                .await;
        }

        let diagnosis = diagnosis::synthesize(&facts, &self.config.rule);
        let issues = diagnosis.issues;
        let session = self
            .update(id, move |s| {
                s.stage = SessionStage::Diagnosed;
                s.issues = issues;
            })
            .await?;
        if session.stage.is_terminal() {
            return Ok(session);
        }
        info!("Session {} diagnosed {} issues", id, session.issues.len());

        let plan = match planner::plan(&session.issues, &self.config.precedence) {
            Ok(plan) => plan,
            Err(EngineError::PlanningImpossible { detail }) => {
                warn!("Session {} unplannable: {}", id, detail);
                return self
                    .update(id, |s| s.fail(FailureKind::PlanningImpossible, detail))
                    .await;
            }
            Err(e) => return Err(e),
        };

        if plan.is_empty() {
            if session.issues.iter().all(|i| i.is_warning_only()) {
                let narrative =
                    explain_or_fallback(self.narrator.as_ref(), &session.issues, &[], &[]).await;
                info!("Session {} found nothing to fix", id);
                return self
                    .update(id, move |s| {
                        s.validation = Some(ValidationReport::healthy());
                        s.narrative = Some(narrative);
                        s.stage = SessionStage::Validated;
                    })
                    .await;
            }
            // Only blocking collection failures remain, and no plan can
            // address those.
            warn!("Session {} has no actionable issues", id);
            return self
                .update(id, |s| {
                    s.fail(
                        FailureKind::PlanningImpossible,
                        "collection failures left nothing actionable",
                    )
                })
                .await;
        }

        let verdicts = self.gate.check_plan(&plan, &self.granted);
        if !gate::plan_allowed(&verdicts) {
            let results: Vec<ActionResult> = plan
                .iter()
                .zip(&verdicts)
                .map(|(planned, verdict)| ActionResult {
                    action: planned.action,
                    authorized: verdict.allowed,
                    applied: false,
                    error: None,
                    message: verdict.detail.clone(),
                })
                .collect();

            for result in &results {
                if let Err(e) = self.audit.log(&executor::audit_entry_for(result)).await {
                    warn!("Audit write failed: {}", e);
                }
            }

            let denied: Vec<String> = verdicts
                .iter()
                .filter(|v| !v.allowed)
                .map(|v| v.detail.clone())
                .collect();
            let detail = denied.join("; ");
            warn!("Session {} not authorized: {}", id, detail);
            return self
                .update(id, move |s| {
                    s.plan = plan;
                    s.results = results;
                    s.fail(FailureKind::AuthorizationDenied, detail);
                })
                .await;
        }

        let narrative =
            explain_or_fallback(self.narrator.as_ref(), &session.issues, &plan, &[]).await;
        let session = self
            .update(id, move |s| {
                s.plan = plan;
                s.narrative = Some(narrative);
                s.stage = SessionStage::AwaitingConfirmation;
            })
            .await?;
        if session.stage.is_terminal() {
            return Ok(session);
        }

        if self.config.engine.require_confirmation {
            info!(
                "Session {} awaiting confirmation ({} actions)",
                id,
                session.plan.len()
            );
            return Ok(session);
        }

        self.confirm_and_execute(id).await
    }

    /// Execute a confirmed plan, then validate and narrate the outcome.
    pub async fn confirm_and_execute(&self, id: Uuid) -> Result<Session, EngineError> {
        // Claim the session; the stage guard keeps runs exclusive.
        let (target, plan, issues, cancel) = {
            let mut sessions = self.sessions.lock().await;
            let entry = sessions
                .get_mut(&id)
                .ok_or(EngineError::SessionNotFound { id })?;

            if entry.session.stage != SessionStage::AwaitingConfirmation {
                return Err(EngineError::InvalidStage {
                    stage: entry.session.stage,
                });
            }
            if entry.cancel.load(Ordering::SeqCst) {
                entry
                    .session
                    .fail(FailureKind::Cancelled, "cancelled before execution");
                return Ok(entry.session.clone());
            }

            entry.session.stage = SessionStage::Executing;
            (
                entry.session.target.clone(),
                entry.session.plan.clone(),
                entry.session.issues.clone(),
                entry.cancel.clone(),
            )
        };

        info!("Session {} executing {} actions", id, plan.len());
        let outcome = executor::execute_plan(
            &plan,
            &target,
            &self.cloud,
            &self.audit,
            &self.config,
            &cancel,
        )
        .await;

        if outcome.cancelled {
            warn!("Session {} cancelled between actions", id);
            let results = outcome.results;
            return self
                .update(id, move |s| {
                    s.results = results;
                    s.fail(FailureKind::Cancelled, "cancelled between actions");
                })
                .await;
        }

        let report = validation::validate(&outcome.results, &target, &self.cloud, &self.config).await;
        let narrative =
            explain_or_fallback(self.narrator.as_ref(), &issues, &plan, &outcome.results).await;
        info!("Session {} validated: {}", id, report.status);

        let results = outcome.results;
        self.update(id, move |s| {
            s.results = results;
            s.validation = Some(report);
            s.narrative = Some(narrative);
            s.stage = SessionStage::Validated;
        })
        .await
    }
}
