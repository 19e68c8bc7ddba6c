//! Check sessions: configuration, host registry, and the execution
//! orchestrator.
//!
//! A `Session` owns the state that would otherwise live in module
//! globals: the live-host registry, the converter table, and the
//! manual signature table. Hosts spawned through the session are
//! registered so `kill_all` (and `Drop`) can sweep them, which keeps
//! worker processes from leaking at the end of a check run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::check::converters::{manual_converters, ConverterTable};
use crate::check::feedback::Feedback;
use crate::check::signature::{manual_signatures, Signature};
use crate::check::state::State;
use crate::check::CheckError;
use crate::parser::ParsedProgram;
use crate::tasks;
use crate::worker::{DirectHost, ExecutionHost, ProcessHandle, WorkerProcess};

/// Execution fidelity for submitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Run in the calling process. Trusted code and fast paths only.
    Direct,
    /// One worker process per run, the default
    #[default]
    Isolated,
}

/// Session configuration, loadable from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub mode: ExecutionMode,
    /// Bounded wait before a hard kill, in milliseconds
    pub kill_timeout_ms: u64,
    /// Worker executable; the current executable when unset
    pub worker_exe: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Isolated,
            kill_timeout_ms: 2_000,
            worker_exe: None,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, CheckError> {
        let text = fs::read_to_string(path).map_err(|e| {
            CheckError::Internal(format!("cannot read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&text).map_err(|e| {
            CheckError::Internal(format!("invalid config {}: {}", path.display(), e))
        })
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }
}

/// The result of orchestrating one exercise
pub enum ExerciseOutcome {
    /// Both programs ran (the student's possibly with a captured
    /// failure); checking can proceed from the root state
    Checked(Rc<State>),
    /// The student's code did not parse; graceful feedback instead of
    /// a state
    ParseFeedback(Box<Feedback>),
}

/// An active checking session
pub struct Session {
    config: SessionConfig,
    registry: RefCell<Vec<ProcessHandle>>,
    pub converters: ConverterTable,
    pub signatures: HashMap<String, Signature>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            registry: RefCell::new(Vec::new()),
            converters: manual_converters(),
            signatures: manual_signatures(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Spawn an execution host pinned to a working directory and
    /// register it for sweep-kill
    pub fn spawn_host(&self, workdir: &Path) -> Result<ProcessHandle, CheckError> {
        let host = match self.config.mode {
            ExecutionMode::Direct => ExecutionHost::Direct(DirectHost::new()),
            ExecutionMode::Isolated => {
                let exe = match &self.config.worker_exe {
                    Some(exe) => exe.clone(),
                    None => std::env::current_exe().map_err(|e| {
                        CheckError::Internal(format!("cannot locate worker executable: {}", e))
                    })?,
                };
                ExecutionHost::Isolated(WorkerProcess::spawn(
                    &exe,
                    workdir,
                    self.config.kill_timeout(),
                )?)
            }
        };

        let handle: ProcessHandle = Rc::new(RefCell::new(host));
        self.registry.borrow_mut().push(Rc::clone(&handle));
        Ok(handle)
    }

    /// Number of registered live hosts
    pub fn live_hosts(&self) -> usize {
        self.registry
            .borrow()
            .iter()
            .filter(|h| h.try_borrow().map(|h| h.is_alive()).unwrap_or(false))
            .count()
    }

    /// Kill every registered host. The registry is emptied no matter
    /// how the individual kills go.
    pub fn kill_all(&self) {
        let handles: Vec<ProcessHandle> = self.registry.borrow_mut().drain(..).collect();
        for handle in handles {
            match handle.try_borrow_mut() {
                Ok(mut host) => {
                    if let Err(e) = host.kill() {
                        warn!(error = %e, "failed to kill host during sweep");
                    }
                }
                Err(_) => warn!("host busy during sweep, leaking it"),
            }
        }
    }

    /// Run the full exercise: pre-exercise code and solution in one
    /// host, pre-exercise code and submission in another, each pinned
    /// to its own working directory. The solution's directory is
    /// created if absent. Solution-side failures are instructor
    /// errors; student-side failures are captured as data on the root
    /// state.
    pub fn run_exercise(
        &self,
        pec: &str,
        solution_code: &str,
        student_code: &str,
        solution_dir: &Path,
        student_dir: &Path,
    ) -> Result<ExerciseOutcome, CheckError> {
        let pec_program = State::parse_internal(pec, "pre-exercise code")?;
        let solution = State::parse_internal(solution_code, "solution")?;
        let student = match State::parse_external(student_code, "student") {
            Ok(student) => student,
            Err(feedback) => return Ok(ExerciseOutcome::ParseFeedback(feedback)),
        };

        if !solution_dir.exists() {
            fs::create_dir_all(solution_dir).map_err(|e| {
                CheckError::Internal(format!(
                    "cannot create solution directory {}: {}",
                    solution_dir.display(),
                    e
                ))
            })?;
        }

        info!(mode = ?self.config.mode, "running exercise");

        let solution_host = self.spawn_host(solution_dir)?;
        self.run_instructor(&solution_host, &pec_program, solution_dir, "pre-exercise code")?;
        self.run_instructor(&solution_host, &solution, solution_dir, "solution")?;

        let student_host = self.spawn_host(student_dir)?;
        self.run_instructor(&student_host, &pec_program, student_dir, "pre-exercise code")?;

        let (student_output, student_error) = {
            let _guard = self.scoped_chdir(student_dir)?;
            tasks::run_code(&student_host, (*student.program).clone())?
        };
        if let Some(error) = &student_error {
            debug!(error = %error, "student run failed, captured as data");
        }

        Ok(ExerciseOutcome::Checked(State::root(
            &student,
            &solution,
            Some(student_host),
            Some(solution_host),
            Some(student_output),
            student_error,
        )))
    }

    /// Run instructor-authored code in a host; any failure aborts the
    /// check as an authoring error
    fn run_instructor(
        &self,
        host: &ProcessHandle,
        program: &ParsedProgram,
        workdir: &Path,
        what: &str,
    ) -> Result<(), CheckError> {
        let _guard = self.scoped_chdir(workdir)?;
        let (_, error) = tasks::run_code(host, (*program.program).clone())?;
        match error {
            Some(error) => Err(CheckError::Instructor(format!(
                "{} failed to run: {}",
                what, error
            ))),
            None => Ok(()),
        }
    }

    /// Direct hosts share the caller's process, so their working
    /// directory is switched around the run and always restored.
    /// Isolated hosts are already pinned at spawn time.
    fn scoped_chdir(&self, workdir: &Path) -> Result<Option<ChDir>, CheckError> {
        match self.config.mode {
            ExecutionMode::Direct => ChDir::new(workdir).map(Some).map_err(|e| {
                CheckError::Internal(format!(
                    "cannot enter working directory {}: {}",
                    workdir.display(),
                    e
                ))
            }),
            ExecutionMode::Isolated => Ok(None),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.kill_all();
    }
}

/// Scoped working-directory change; the previous directory is
/// restored on drop, success or failure
struct ChDir {
    prev: PathBuf,
}

impl ChDir {
    fn new(to: &Path) -> std::io::Result<Self> {
        let prev = std::env::current_dir()?;
        std::env::set_current_dir(to)?;
        Ok(Self { prev })
    }
}

impl Drop for ChDir {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.prev) {
            warn!(error = %e, "failed to restore working directory");
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
