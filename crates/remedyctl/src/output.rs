//! Human-readable session rendering. ASCII only, colors via owo-colors.

use owo_colors::OwoColorize;
use remedy_common::{ActionResult, RunStatus, Session, SessionStage};

/// Print a session either as pretty JSON or as a human report.
pub fn print_session(session: &Session, json: bool) {
    if json {
        match serde_json::to_string_pretty(session) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("error: could not serialize session: {}", e),
        }
        return;
    }

    println!(
        "Session {} ({})",
        session.id.to_string().cyan(),
        stage_label(session.stage)
    );
    println!(
        "Target: {} (acl {})",
        session.target.machine, session.target.acl
    );

    if !session.issues.is_empty() {
        println!();
        println!("Issues:");
        for issue in &session.issues {
            println!("  * {}", issue.summary());
        }
    }

    if !session.plan.is_empty() {
        println!();
        println!("Plan:");
        for (i, planned) in session.plan.iter().enumerate() {
            println!("  {}. {}", i + 1, planned.action.describe());
        }
    }

    if !session.results.is_empty() {
        println!();
        println!("Results:");
        for result in &session.results {
            println!("  {} {}", result_tag(result), result.message);
        }
    }

    if let Some(report) = &session.validation {
        println!();
        println!("Validation: {}", status_label(report.status));
        for check in &report.checks {
            let tag = if check.passed {
                format!("{}", "[pass]".green())
            } else {
                format!("{}", "[fail]".red())
            };
            println!("  {} {}: {}", tag, check.name, check.detail);
        }
    }

    if let Some(failure) = &session.failure {
        println!();
        println!(
            "{} {} - {}",
            "[failed]".bright_red(),
            failure.kind,
            failure.detail
        );
    }

    if !session.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &session.warnings {
            println!("  * {}", warning.yellow());
        }
    }

    if let Some(narrative) = &session.narrative {
        println!();
        println!("Summary:");
        for line in narrative.lines() {
            println!("  {}", line);
        }
    }
}

/// Print only the findings and the proposed plan, for the confirmation
/// prompt of `fix`.
pub fn print_plan(session: &Session) {
    if session.issues.is_empty() {
        println!("No issues found.");
    } else {
        println!("Findings:");
        for issue in &session.issues {
            println!("  * {}", issue.summary());
        }
    }

    if !session.plan.is_empty() {
        println!();
        println!("Proposed plan:");
        for (i, planned) in session.plan.iter().enumerate() {
            println!("  {}. {}", i + 1, planned.action.describe());
        }
    }
}

fn stage_label(stage: SessionStage) -> String {
    match stage {
        SessionStage::Validated => format!("{}", stage.green()),
        SessionStage::Failed => format!("{}", stage.red()),
        SessionStage::AwaitingConfirmation => format!("{}", stage.yellow()),
        _ => format!("{}", stage),
    }
}

fn status_label(status: RunStatus) -> String {
    match status {
        RunStatus::Success => format!("{}", status.green()),
        RunStatus::PartialSuccess => format!("{}", status.yellow()),
        RunStatus::Failed => format!("{}", status.red()),
    }
}

fn result_tag(result: &ActionResult) -> String {
    if result.succeeded() {
        format!("{}", "[ok]".green())
    } else if result.error.is_some() {
        format!("{}", "[failed]".red())
    } else if !result.authorized {
        format!("{}", "[denied]".red())
    } else {
        format!("{}", "[skipped]".yellow())
    }
}
