///
/// This module implements the CLI for saltext-hooks: argument parsing, config
/// loading and turning a checker's report into output and an exit status.
///
/// All scanning and checking lives in the [`saltext-hooks-core`] crate; this
/// module is CLI glue only.
///
/// ## How To Use
/// - From pre-commit: `saltext-hooks cli-examples <files>` and `saltext-hooks autodocs`.
/// - Programmatically (integration tests): build a [`Cli`] and call [`run`].
///
/// [`saltext-hooks-core`]: ../../saltext-hooks-core/
use crate::load_config::load_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use saltext_hooks_core::autodoc::{write_pages, AutodocChecker};
use saltext_hooks_core::cli_example::CliExampleChecker;
use saltext_hooks_core::contract::{run_checker, Checker};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// pre-commit hooks for Salt extensions.
#[derive(Parser, Debug)]
#[clap(
    name = "saltext-hooks",
    version,
    about = "Validate CLI examples and autodoc pages of a Salt extension"
)]
pub struct Cli {
    /// Repository root (defaults to the config file's `root`, then the current directory)
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,

    /// Path to the YAML config file
    #[clap(long, global = true, env = "SALTEXT_HOOKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for the report
    #[clap(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate `CLI Example:` blocks in execution module docstrings
    CliExamples {
        /// Also fail public functions without a docstring or CLI example
        #[clap(long)]
        require_examples: bool,

        /// Files to check; every execution module when omitted
        files: Vec<PathBuf>,
    },
    /// Check that every loader module has an autodoc page
    Autodocs {
        /// Regenerate missing or outdated pages instead of only reporting them
        #[clap(long)]
        write: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// How a run ended, when it ended without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// Violations found, or pages rewritten by `autodocs --write`.
    Failed,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Passed => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::from(1),
        }
    }
}

fn report(checker: &dyn Checker, format: OutputFormat) -> Result<Outcome> {
    let report = run_checker(checker);
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!(
            "{}",
            report.to_json().context("Failed to serialize report")?
        ),
    }
    Ok(if report.passed() {
        Outcome::Passed
    } else {
        Outcome::Failed
    })
}

/// CLI entrypoint shared by main() and integration tests.
pub fn run(cli: Cli) -> Result<Outcome> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?cli.command,
        "saltext-hooks invoked"
    );

    let mut config = load_config(cli.config.as_deref(), cli.root.as_deref())?;

    match cli.command {
        Commands::CliExamples {
            require_examples,
            files,
        } => {
            if require_examples {
                config.cli_examples.require_examples = true;
            }
            let checker = if files.is_empty() {
                CliExampleChecker::discover(config)
                    .context("Cannot locate execution modules to check")?
            } else {
                CliExampleChecker::new(config, files)
            };
            report(&checker, cli.format)
        }
        Commands::Autodocs { write: false } => {
            let checker =
                AutodocChecker::new(config).context("Cannot locate extension sources")?;
            report(&checker, cli.format)
        }
        Commands::Autodocs { write: true } => {
            let written =
                write_pages(&config).context("Failed to regenerate documentation pages")?;
            let shown: Vec<String> = written
                .iter()
                .map(|p| config.display_path(p).display().to_string())
                .collect();
            match cli.format {
                OutputFormat::Text => {
                    for path in &shown {
                        println!("{path}");
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
            }
            info!(command = "autodocs", written = shown.len(), "Write pass complete");
            Ok(if written.is_empty() {
                Outcome::Passed
            } else {
                Outcome::Failed
            })
        }
    }
}
