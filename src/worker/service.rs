//! The worker-side event loop.
//!
//! One JSON-encoded task per line on the reader, one JSON-encoded
//! outcome per line on the writer, strictly in order. Task execution
//! is wrapped in panic containment: a panic in the checking machinery
//! becomes an `InternalError` outcome, so the loop and the channel
//! survive machinery bugs. A `Shutdown` task is answered and then
//! breaks the loop.

use std::io::{BufRead, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error};

use crate::interpreter::Runtime;

use super::protocol::{Task, TaskOutcome};
use super::WorkerError;

/// Serve the task protocol until shutdown or end of input
pub fn serve(reader: impl BufRead, mut writer: impl Write) -> Result<(), WorkerError> {
    let mut runtime = Runtime::new();

    for line in reader.lines() {
        let line = line.map_err(WorkerError::Channel)?;
        if line.trim().is_empty() {
            continue;
        }

        let task: Task = match serde_json::from_str(&line) {
            Ok(task) => task,
            Err(e) => {
                // a malformed request is a machinery defect, not fatal
                error!(error = %e, "malformed task request");
                write_outcome(
                    &mut writer,
                    &TaskOutcome::InternalError(format!("malformed task request: {}", e)),
                )?;
                continue;
            }
        };

        let shutting_down = matches!(task, Task::Shutdown);
        debug!(?shutting_down, "executing task");

        let outcome = match catch_unwind(AssertUnwindSafe(|| task.execute(&mut runtime))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic);
                error!(message = %message, "task execution panicked");
                TaskOutcome::InternalError(message)
            }
        };

        write_outcome(&mut writer, &outcome)?;
        if shutting_down {
            break;
        }
    }

    Ok(())
}

fn write_outcome(writer: &mut impl Write, outcome: &TaskOutcome) -> Result<(), WorkerError> {
    let encoded = serde_json::to_string(outcome)
        .unwrap_or_else(|e| format!(r#"{{"outcome":"internal_error","data":"{}"}}"#, e));
    writeln!(writer, "{}", encoded).map_err(WorkerError::Channel)?;
    writer.flush().map_err(WorkerError::Channel)
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
