//! remedyctl binary entry point.

use clap::Parser;
use remedyctl::cli::Cli;
use remedyctl::commands;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Quiet by default; RUST_LOG opens up the engine's tracing output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match commands::run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
