//! Command-line interface definition for remedyctl.

use clap::{Args, Parser, Subcommand};
use remedy_engine::sim::Scenario;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "remedyctl")]
#[command(about = "Diagnose and repair remote-access outages", long_about = None)]
#[command(version = env!("REMEDY_VERSION"))]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Path to a config file (default: /etc/remedy/config.toml, then ./remedy.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Run against a simulated cloud scenario: stopped, blocked, conflict,
    /// stopped-blocked or healthy
    #[arg(long, global = true, value_name = "SCENARIO")]
    pub simulate: Option<Scenario>,

    /// Permissions granted to this run (comma separated; defaults to the
    /// full set the gate knows about)
    #[arg(long, global = true, value_delimiter = ',')]
    pub permissions: Vec<String>,

    /// Emit the session as JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Target selection shared by diagnose and fix.
#[derive(Args, Clone)]
pub struct TargetArgs {
    /// Resource group of the machine
    #[arg(long)]
    pub resource_group: Option<String>,

    /// Machine name
    #[arg(long)]
    pub machine: Option<String>,

    /// Network ACL group guarding the machine (default: "<machine>-nsg")
    #[arg(long)]
    pub nsg: Option<String>,

    /// Remote-access port to check (overrides the configured port)
    #[arg(long)]
    pub port: Option<u16>,

    /// The request text that triggered this run
    #[arg(long)]
    pub request: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect facts, diagnose and print the proposed plan without executing
    Diagnose {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Diagnose and execute the plan after confirmation
    Fix {
        #[command(flatten)]
        target: TargetArgs,

        /// Execute without prompting for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Show a previously recorded session
    Session {
        /// Session id to look up
        id: Uuid,
    },
}
