//! Handler for the `examiner check` subcommand.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::session::{ExecutionMode, ExerciseOutcome, Session, SessionConfig};

/// What a check run reports back to the caller
#[derive(Debug, Serialize)]
pub struct CheckReport {
    /// Whether the submission parsed and ran far enough to compare
    pub checked: bool,
    /// Feedback for the learner, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// The submission's captured stdout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// The submission's top-level failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn run_check(
    solution: &Path,
    student: &Path,
    pec: Option<&Path>,
    config: Option<&Path>,
    direct: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session_config = match config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if direct {
        session_config.mode = ExecutionMode::Direct;
    }

    let solution_code = read(solution)?;
    let student_code = read(student)?;
    let pec_code = match pec {
        Some(path) => read(path)?,
        None => String::new(),
    };

    let workdirs = tempfile::tempdir()?;
    let solution_dir: PathBuf = workdirs.path().join("solution");
    let student_dir: PathBuf = workdirs.path().join("student");
    std::fs::create_dir_all(&student_dir)?;

    let session = Session::new(session_config);
    let outcome = session.run_exercise(
        &pec_code,
        &solution_code,
        &student_code,
        &solution_dir,
        &student_dir,
    );
    session.kill_all();

    let report = match outcome? {
        ExerciseOutcome::ParseFeedback(feedback) => CheckReport {
            checked: false,
            feedback: Some(feedback.message),
            output: None,
            error: None,
        },
        ExerciseOutcome::Checked(root) => CheckReport {
            checked: true,
            feedback: root
                .student_error
                .as_ref()
                .map(|e| format!("Your code could not be executed: {}", e)),
            output: root.student_output.clone(),
            error: root.student_error.clone(),
        },
    };

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_human(&report);
    }
    Ok(())
}

fn print_human(report: &CheckReport) {
    if let Some(feedback) = &report.feedback {
        println!("{}", feedback);
    } else {
        println!("Submission ran cleanly.");
    }
    if let Some(output) = &report.output {
        if !output.is_empty() {
            println!("--- output ---");
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
        }
    }
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e).into())
}
