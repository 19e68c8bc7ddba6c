//! Examiner CLI - automated correctness checking for programming
//! exercises

use clap::Parser;
use std::process::ExitCode;

use examiner::cli::{run_check, run_worker, Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Check {
            solution,
            student,
            pec,
            config,
            direct,
        } => run_check(
            &solution,
            &student,
            pec.as_deref(),
            config.as_deref(),
            direct,
            cli.json,
        ),
        Command::Worker => run_worker(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
