use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use objstore_engine::{ErrorCategory, StoreError};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match commands::run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(exit_code(&err))
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<StoreError>().map(StoreError::category) {
        Some(ErrorCategory::BadRequest) => 2,
        Some(ErrorCategory::Conflict) => 3,
        Some(ErrorCategory::NotFound) => 4,
        Some(ErrorCategory::ServerError) | None => 1,
    }
}
