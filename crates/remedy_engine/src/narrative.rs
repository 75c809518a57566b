//! Operator-facing narrative for a finished session.
//!
//! The template renderer is the source of truth; the HTTP narrator
//! only rephrases its report through a local model and falls back to
//! the template whenever the endpoint misbehaves.

use async_trait::async_trait;
use remedy_common::config::NarratorConfig;
use remedy_common::{ActionResult, Issue, PlannedAction};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("narrator request failed: {0}")]
    Http(String),

    #[error("narrator returned an empty response")]
    EmptyResponse,
}

/// Turns a session's findings into prose.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn explain(
        &self,
        issues: &[Issue],
        plan: &[PlannedAction],
        results: &[ActionResult],
    ) -> Result<String, NarratorError>;
}

fn result_state(result: &ActionResult) -> &'static str {
    if result.succeeded() {
        "ok"
    } else if result.error.is_some() {
        "failed"
    } else if !result.authorized {
        "denied"
    } else {
        "skipped"
    }
}

/// Deterministic report, also the fallback for the HTTP narrator.
pub fn render_report(issues: &[Issue], plan: &[PlannedAction], results: &[ActionResult]) -> String {
    if issues.is_empty() && results.is_empty() {
        return "No problems found: the machine is running and the remote-access port is admitted."
            .to_string();
    }

    let mut out = String::new();
    if !issues.is_empty() {
        out.push_str("Findings:\n");
        for issue in issues {
            out.push_str(&format!("- {}\n", issue.summary()));
        }
    }
    if !plan.is_empty() {
        out.push_str("Plan:\n");
        for planned in plan {
            out.push_str(&format!("- {}\n", planned.action.describe()));
        }
    }
    if !results.is_empty() {
        out.push_str("Results:\n");
        for result in results {
            out.push_str(&format!("- [{}] {}\n", result_state(result), result.message));
        }
    }
    out.trim_end().to_string()
}

/// Renders the deterministic report as-is.
pub struct TemplateNarrator;

#[async_trait]
impl Narrator for TemplateNarrator {
    async fn explain(
        &self,
        issues: &[Issue],
        plan: &[PlannedAction],
        results: &[ActionResult],
    ) -> Result<String, NarratorError> {
        Ok(render_report(issues, plan, results))
    }
}

fn prompt_for(issues: &[Issue], plan: &[PlannedAction], results: &[ActionResult]) -> String {
    format!(
        "You are a cloud operations assistant. Rewrite this remediation report \
         for an operator in plain language, in at most four sentences. \
         Do not invent actions that are not listed.\n\n{}",
        render_report(issues, plan, results)
    )
}

fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_prefix = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let without_suffix = without_prefix.strip_suffix("```").unwrap_or(without_prefix);
    without_suffix.trim().to_string()
}

/// Rephrases the report through a local generation endpoint.
pub struct HttpNarrator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpNarrator {
    pub fn new(config: &NarratorConfig) -> Result<Self, NarratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NarratorError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Narrator for HttpNarrator {
    async fn explain(
        &self,
        issues: &[Issue],
        plan: &[PlannedAction],
        results: &[ActionResult],
    ) -> Result<String, NarratorError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt_for(issues, plan, results),
            "stream": false
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| NarratorError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NarratorError::Http(format!("status {}", response.status())));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NarratorError::Http(e.to_string()))?;

        let text = json
            .get("response")
            .and_then(|r| r.as_str())
            .map(strip_code_fences)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(NarratorError::EmptyResponse);
        }

        Ok(text)
    }
}

/// Narrate, falling back to the template report on any narrator error.
pub async fn explain_or_fallback(
    narrator: &dyn Narrator,
    issues: &[Issue],
    plan: &[PlannedAction],
    results: &[ActionResult],
) -> String {
    match narrator.explain(issues, plan, results).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Narrator unavailable, using template report: {}", e);
            render_report(issues, plan, results)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_common::{Action, PowerState};

    #[test]
    fn test_healthy_report_is_one_line() {
        let report = render_report(&[], &[], &[]);
        assert!(report.starts_with("No problems found"));
        assert!(!report.contains('\n'));
    }

    #[test]
    fn test_report_lists_findings_plan_and_results() {
        let issues = vec![Issue::PowerOff {
            observed: PowerState::Deallocated,
        }];
        let plan = vec![PlannedAction {
            action: Action::StartMachine,
            requires_running_machine: false,
        }];
        let results = vec![ActionResult {
            action: Action::StartMachine,
            authorized: true,
            applied: true,
            error: None,
            message: "machine start issued".to_string(),
        }];

        let report = render_report(&issues, &plan, &results);
        assert!(report.contains("Findings:"));
        assert!(report.contains("deallocated"));
        assert!(report.contains("Plan:"));
        assert!(report.contains("start the machine"));
        assert!(report.contains("Results:"));
        assert!(report.contains("[ok] machine start issued"));
    }

    #[test]
    fn test_failed_and_skipped_results_are_labeled() {
        let results = vec![
            ActionResult {
                action: Action::StartMachine,
                authorized: true,
                applied: false,
                error: Some("provider error".to_string()),
                message: "start_machine failed".to_string(),
            },
            ActionResult {
                action: Action::EnsureAllowRule { precedence: 500 },
                authorized: true,
                applied: false,
                error: None,
                message: "skipped: machine start failed earlier in the plan".to_string(),
            },
        ];
        let issues = vec![Issue::PowerOff {
            observed: PowerState::Stopped,
        }];

        let report = render_report(&issues, &[], &results);
        assert!(report.contains("[failed]"));
        assert!(report.contains("[skipped]"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\nplain\n```"), "plain");
        assert_eq!(strip_code_fences("  untouched  "), "untouched");
    }

    #[tokio::test]
    async fn test_template_narrator_matches_the_renderer() {
        let issues = vec![Issue::PowerOff {
            observed: PowerState::Stopped,
        }];
        let narrated = TemplateNarrator.explain(&issues, &[], &[]).await.unwrap();
        assert_eq!(narrated, render_report(&issues, &[], &[]));
    }
}
