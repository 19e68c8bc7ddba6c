//! Command-line interface for the examiner engine
//!
//! Provides commands: check, worker

mod check_cmd;
mod worker_cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use check_cmd::run_check;
pub use worker_cmd::run_worker;

/// Examiner - correctness checking for programming exercises
#[derive(Parser, Debug)]
#[command(name = "examiner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a submission against a reference solution
    Check {
        /// The reference solution file
        #[arg(value_name = "SOLUTION")]
        solution: PathBuf,

        /// The learner submission file
        #[arg(value_name = "STUDENT")]
        student: PathBuf,

        /// Pre-exercise setup code file
        #[arg(long, value_name = "FILE")]
        pec: Option<PathBuf>,

        /// Session configuration file (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Run submitted code in this process instead of isolated
        /// worker processes
        #[arg(long)]
        direct: bool,
    },

    /// Serve the task protocol over stdio (spawned internally for
    /// isolated runs)
    Worker,
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
