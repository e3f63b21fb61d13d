use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Replay cycle scheduling scenarios.
///
/// Reads a TOML scenario of timed configure/query steps, runs it against an
/// in-memory cycle store and prints one JSON document per step.
#[derive(Parser, Debug)]
#[command(name = "cadence", version, about = "Temporal configuration scheduler")]
pub struct CliArgs {
    /// Config profile (overrides CADENCE_PROFILE).
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Env file to load instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a scenario and print the results.
    Run {
        /// Path to the scenario file.
        scenario: PathBuf,

        /// Pretty-print each JSON document.
        #[arg(long)]
        pretty: bool,
    },
    /// Validate a scenario without running it.
    Check {
        /// Path to the scenario file.
        scenario: PathBuf,
    },
}
