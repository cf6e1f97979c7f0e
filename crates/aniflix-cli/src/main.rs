mod cli;
mod commands;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use aniflix_core::config::AppConfig;
use aniflix_runtime::{Runtime, RuntimeError};

use crate::cli::Cli;
use crate::output::Output;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let log_dir = AppConfig::data_dir().join("logs");
    let _log_guard = logging::init(&config.logging, cli.verbose, &log_dir);

    let user_id = cli.user.unwrap_or(config.general.user_id);
    let runtime = match Runtime::from_config(config) {
        Ok(runtime) => runtime,
        Err(e) => return report(&e),
    };

    let out = Output::new(cli.json);
    match commands::run(&runtime, user_id, cli.command, &out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(err: &RuntimeError) -> ExitCode {
    if err.rejection().is_some() {
        eprintln!("rejected: {err}");
    } else if err.is_retryable() {
        eprintln!("error: {err} (temporary, try again)");
    } else {
        eprintln!("error: {err}");
    }
    ExitCode::from(exit_status(err))
}

/// 2 for rejected input, 3 for a retryable store failure, 1 otherwise.
fn exit_status(err: &RuntimeError) -> u8 {
    if err.rejection().is_some() {
        2
    } else if err.is_retryable() {
        3
    } else {
        1
    }
}
