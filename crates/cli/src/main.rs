mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cadence_cli::{render, Runner, Scenario};
use cadence_core::config::{load_dotenv, load_dotenv_from};
use cadence_core::Config;

use crate::cli::{CliArgs, Command};

fn main() -> Result<()> {
    let args = CliArgs::parse();

    match &args.env_file {
        Some(path) => load_dotenv_from(path)
            .with_context(|| format!("failed to load env file: {}", path.display()))?,
        None => load_dotenv(),
    }
    let config = match &args.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.validate().context("invalid configuration")?;

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    config.log_summary();

    match args.command {
        Command::Run { scenario, pretty } => {
            let loaded = Scenario::load(&scenario)?;
            let report = Runner::run(&loaded, config.scheduler)
                .with_context(|| format!("scenario failed: {}", scenario.display()))?;
            println!("{}", render(&report, pretty)?);
        }
        Command::Check { scenario } => {
            let loaded = Scenario::load(&scenario)?;
            loaded
                .check()
                .with_context(|| format!("invalid scenario: {}", scenario.display()))?;
            info!(
                steps = loaded.steps.len(),
                oracles = loaded.oracles.len(),
                "Scenario is valid"
            );
            println!(
                "{}: {} steps, {} oracles, ok",
                scenario.display(),
                loaded.steps.len(),
                loaded.oracles.len()
            );
        }
    }

    Ok(())
}
