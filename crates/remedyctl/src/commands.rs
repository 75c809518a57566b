//! Command execution: wires the CLI flags into a session engine run.

use crate::cli::{Cli, Commands, TargetArgs};
use crate::output;
use anyhow::{anyhow, bail, Context, Result};
use console::style;
use remedy_common::{Config, RunStatus, Session, SessionStage, TargetRef};
use remedy_engine::audit::AuditLogger;
use remedy_engine::gate::SafetyGate;
use remedy_engine::narrative::{HttpNarrator, Narrator, TemplateNarrator};
use remedy_engine::sim::{SimCloud, SIM_MACHINE, SIM_RESOURCE_GROUP};
use remedy_engine::{classify_request, RequestIntent, SessionEngine};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Where finished sessions are recorded for later `session <id>` lookups.
const SESSION_DIR: &str = "./artifacts/sessions";

/// Audit trail location for simulated runs; real deployments use the
/// configured path instead.
const SIM_AUDIT_PATH: &str = "./artifacts/audit.jsonl";

const DEFAULT_REQUEST: &str = "cannot connect to my vm over the remote-access port";

pub async fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::Diagnose { target } => {
            let target = target.clone();
            diagnose_cmd(&cli, target).await
        }
        Commands::Fix { target, yes } => {
            let target = target.clone();
            let yes = *yes;
            fix_cmd(&cli, target, yes).await
        }
        Commands::Session { id } => show_session(*id, cli.json).await,
    }
}

struct PreparedRun {
    engine: SessionEngine,
    target: TargetRef,
    request: String,
}

/// Build the engine for this invocation. Only the simulated cloud is
/// available in this build, so `--simulate` is mandatory.
async fn prepare(cli: &Cli, target_args: &TargetArgs) -> Result<PreparedRun> {
    let mut config = load_config(cli)?;
    let scenario = cli.simulate.ok_or_else(|| {
        anyhow!("no cloud provider is wired into this build; use --simulate <scenario>")
    })?;

    if let Some(port) = target_args.port {
        config.rule.port = port;
    }

    let cloud = SimCloud::with_scenario(scenario);
    let audit = Arc::new(AuditLogger::new(SIM_AUDIT_PATH).await?);

    let narrator: Arc<dyn Narrator> = if config.narrator.enabled {
        Arc::new(HttpNarrator::new(&config.narrator)?)
    } else {
        Arc::new(TemplateNarrator)
    };

    let granted = if cli.permissions.is_empty() {
        SafetyGate::default().known_permissions()
    } else {
        cli.permissions.clone()
    };

    let target = resolve_target(target_args);
    let request = target_args
        .request
        .clone()
        .unwrap_or_else(|| DEFAULT_REQUEST.to_string());

    let engine = SessionEngine::new(cloud.handles(), narrator, audit, config, granted);
    Ok(PreparedRun {
        engine,
        target,
        request,
    })
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path)),
        None => Ok(Config::load()),
    }
}

/// Fill in target flags that were not given, machine names first so the
/// ACL group default can follow the "<machine>-nsg" convention.
fn resolve_target(args: &TargetArgs) -> TargetRef {
    let resource_group = args.resource_group.as_deref().unwrap_or(SIM_RESOURCE_GROUP);
    let machine = args.machine.as_deref().unwrap_or(SIM_MACHINE);
    let default_acl = format!("{}-nsg", machine);
    let acl_group = args.nsg.as_deref().unwrap_or(&default_acl);
    TargetRef::in_group(resource_group, machine, acl_group)
}

async fn diagnose_cmd(cli: &Cli, target_args: TargetArgs) -> Result<i32> {
    let prepared = prepare(cli, &target_args).await?;
    note_intent(&prepared.request, cli.json);

    let session = prepared
        .engine
        .run_diagnosis(prepared.target.clone(), &prepared.request)
        .await?;
    let path = persist_session(&session).await?;

    output::print_session(&session, cli.json);
    if !cli.json {
        println!();
        println!(
            "{}",
            style(format!("Session recorded at {}", path.display())).dim()
        );
        if session.stage == SessionStage::AwaitingConfirmation {
            println!(
                "{}",
                style("Run `remedyctl fix` to apply the plan.").dim()
            );
        }
    }
    Ok(exit_code(&session))
}

async fn fix_cmd(cli: &Cli, target_args: TargetArgs, yes: bool) -> Result<i32> {
    if cli.json && !yes {
        bail!("fix --json is non-interactive; pass --yes to execute");
    }

    let prepared = prepare(cli, &target_args).await?;
    note_intent(&prepared.request, cli.json);

    let session = prepared
        .engine
        .run_diagnosis(prepared.target.clone(), &prepared.request)
        .await?;

    let session = if session.stage == SessionStage::AwaitingConfirmation {
        if !yes {
            output::print_plan(&session);
            println!();
            if !confirm_on_stdin()? {
                persist_session(&session).await?;
                println!("Plan not applied.");
                return Ok(1);
            }
            println!();
        }
        prepared.engine.confirm_and_execute(session.id).await?
    } else {
        session
    };

    let path = persist_session(&session).await?;
    output::print_session(&session, cli.json);
    if !cli.json {
        println!();
        println!(
            "{}",
            style(format!("Session recorded at {}", path.display())).dim()
        );
    }
    Ok(exit_code(&session))
}

async fn show_session(id: Uuid, json: bool) -> Result<i32> {
    let path = PathBuf::from(SESSION_DIR).join(format!("{}.json", id));
    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("no recorded session {} under {}", id, SESSION_DIR))?;
    let session: Session =
        serde_json::from_str(&content).context("Failed to parse session record")?;
    output::print_session(&session, json);
    Ok(exit_code(&session))
}

/// Surface requests that do not look like a connectivity complaint. The
/// run still proceeds; this is a hint, not a filter.
fn note_intent(request: &str, json: bool) {
    if json {
        return;
    }
    let intent = classify_request(request);
    if matches!(
        intent,
        RequestIntent::GeneralQuestion | RequestIntent::Unrelated
    ) {
        println!(
            "{}",
            style(format!(
                "Note: request reads as {}; diagnosing the remote-access path anyway.",
                intent
            ))
            .dim()
        );
    }
}

fn confirm_on_stdin() -> Result<bool> {
    print!("Apply this plan? [y/N] ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read confirmation")?;
    let answer = line.trim();

    Ok(answer.eq_ignore_ascii_case("y")
        || classify_request(answer) == RequestIntent::Confirmation)
}

async fn persist_session(session: &Session) -> Result<PathBuf> {
    let dir = PathBuf::from(SESSION_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .context("Failed to create session directory")?;
    let path = dir.join(format!("{}.json", session.id));
    let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
    tokio::fs::write(&path, json)
        .await
        .context("Failed to write session record")?;
    Ok(path)
}

/// 0 on validated success, 1 on engine failure, 2 when validation came
/// back degraded. A diagnose-only run that is awaiting confirmation
/// exits 0.
pub fn exit_code(session: &Session) -> i32 {
    if session.stage == SessionStage::Failed {
        return 1;
    }
    match &session.validation {
        Some(report) if report.status == RunStatus::Success => 0,
        Some(_) => 2,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_common::{FailureKind, ValidationCheck, ValidationReport};

    fn blank_session() -> Session {
        Session::new(TargetRef::in_group("rg", "vm", "vm-nsg"))
    }

    #[test]
    fn test_exit_code_by_outcome() {
        let mut session = blank_session();
        session.stage = SessionStage::AwaitingConfirmation;
        assert_eq!(exit_code(&session), 0);

        session.stage = SessionStage::Validated;
        session.validation = Some(ValidationReport::healthy());
        assert_eq!(exit_code(&session), 0);

        session.validation = Some(ValidationReport {
            checks: vec![ValidationCheck::fail("port_admitted", "still blocked")],
            status: RunStatus::PartialSuccess,
        });
        assert_eq!(exit_code(&session), 2);

        session.fail(FailureKind::PlanningImpossible, "no viable plan");
        assert_eq!(exit_code(&session), 1);
    }

    #[test]
    fn test_resolve_target_defaults_to_sim_names() {
        let args = TargetArgs {
            resource_group: None,
            machine: None,
            nsg: None,
            port: None,
            request: None,
        };
        let target = resolve_target(&args);
        assert_eq!(target.machine.resource_group, SIM_RESOURCE_GROUP);
        assert_eq!(target.machine.name, SIM_MACHINE);
        assert_eq!(target.acl.group_name, format!("{}-nsg", SIM_MACHINE));
    }

    #[test]
    fn test_resolve_target_acl_follows_machine_override() {
        let args = TargetArgs {
            resource_group: Some("rg-prod".to_string()),
            machine: Some("web-01".to_string()),
            nsg: None,
            port: None,
            request: None,
        };
        let target = resolve_target(&args);
        assert_eq!(target.acl.resource_group, "rg-prod");
        assert_eq!(target.acl.group_name, "web-01-nsg");
    }
}
