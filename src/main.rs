use anyhow::{Context, Result};
use clap::Parser;
use langtidy::cli::{self, Cli};
use langtidy::config::Config;
use langtidy::logging::{self, LogOptions};
use langtidy::output::OutputFormatter;
use langtidy::sink::tracing_sink;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Error loading configuration")?;

    let log_file = logging::init_logging(LogOptions {
        log_directory: &config.log_directory,
        verbose: cli.verbose,
    });
    if let Some(path) = log_file {
        tracing::debug!("Logging to {}", path.display());
    }

    cli::run(cli.command, &config, tracing_sink(), usize::from(cli.jobs))
}
