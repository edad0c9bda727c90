//! Command-line interface for opsclone.
//!
//! Each command lives in its own module with its own argument struct and
//! execution logic. Global flags (verbosity, progress control) translate into
//! a [`CliConfig`] that is applied to the process environment once at the
//! start of execution, so tests can inject configuration without CLI parsing.

pub mod backup;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::constants::NO_PROGRESS_ENV;

/// Runtime configuration derived from the global CLI flags.
///
/// Holding this separately from [`Cli`] lets tests and programmatic callers
/// control behavior without touching global environment state until
/// [`CliConfig::apply_to_env`] runs.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level for the `RUST_LOG` environment variable. `None` preserves
    /// whatever is already set.
    pub log_level: Option<String>,
    /// Disable spinners and animated output.
    pub no_progress: bool,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this configuration to the process environment. Called exactly
    /// once at the start of execution, before any threads are spawned.
    pub fn apply_to_env(&self) {
        // set_var is unsafe on edition 2024; this runs single-threaded at
        // process start.
        if let Some(level) = &self.log_level {
            if std::env::var("RUST_LOG").is_err() {
                unsafe { std::env::set_var("RUST_LOG", level) };
            }
        }
        if self.no_progress {
            unsafe { std::env::set_var(NO_PROGRESS_ENV, "1") };
        }
    }
}

/// Top-level CLI: global flags plus the subcommand dispatch.
#[derive(Parser)]
#[command(
    name = "opsclone",
    about = "Capture an IoT Operations instance as a redeployable ARM template",
    version,
    long_about = "opsclone walks the cloud resource tree of an Azure IoT Operations \
                  instance and compiles it into a parameterized ARM deployment template \
                  that can recreate an equivalent instance on a different cluster."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable spinners and animated output (useful for CI and scripts).
    #[arg(long, global = true)]
    no_progress: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Capture an instance's resource tree into an ARM template bundle.
    Backup(backup::BackupCommand),
}

impl Cli {
    /// Execute with configuration derived from the parsed flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("warn".to_string())
        };
        CliConfig {
            log_level,
            no_progress: self.no_progress,
        }
    }

    /// Execute with an injected configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.apply_to_env();
        init_tracing();

        match self.command {
            Commands::Backup(cmd) => cmd.execute().await,
        }
    }
}

/// Install the global tracing subscriber, honoring `RUST_LOG`. Safe to call
/// more than once; later calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
