use clap::Parser;
use saltext_hooks::cli::{run, Cli};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report.
    let filter = EnvFilter::try_from_env("SALTEXT_HOOKS_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    match run(cli) {
        Ok(outcome) => {
            tracing::info!(?outcome, "CLI completed");
            outcome.exit_code()
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
