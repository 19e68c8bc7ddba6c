//! Handler for the `examiner worker` subcommand.
//!
//! Serves the task protocol over stdio until the parent sends a
//! shutdown request or closes the task channel.

use crate::worker;

pub fn run_worker() -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    worker::serve(stdin.lock(), stdout.lock())?;
    Ok(())
}
