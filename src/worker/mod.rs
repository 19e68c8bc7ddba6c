//! Isolated execution hosts and the client side of the task protocol.
//!
//! The default host is a `WorkerProcess`: a spawned child process
//! running the task event loop over its stdio, pinned to its own
//! working directory. `DirectHost` is the zero-isolation fidelity
//! level that runs tasks in the caller's own process, for trusted or
//! fast paths. Both answer one task at a time, synchronously.

pub mod protocol;
pub mod service;

pub use protocol::{Task, TaskOutcome};
pub use service::serve;

use std::cell::RefCell;
use std::io::{BufRead, BufReader, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::interpreter::Runtime;

/// Failures of a host or its channel. These are machinery errors;
/// failures of the code a task inspects never surface here.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(std::io::Error),

    #[error("worker channel broken: {0}")]
    Channel(std::io::Error),

    #[error("malformed worker response: {0}")]
    Decode(serde_json::Error),

    #[error("worker already terminated")]
    Terminated,

    #[error("worker did not terminate within {0:?}")]
    KillTimeout(Duration),
}

/// Opaque token distinguishing one execution host from another. Two
/// hosts in the same OS process still differ by nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIdentity {
    pid: u32,
    nonce: u64,
}

impl ProcessIdentity {
    fn next(pid: u32) -> Self {
        static NONCE: AtomicU64 = AtomicU64::new(1);
        Self {
            pid,
            nonce: NONCE.fetch_add(1, Ordering::SeqCst),
        }
    }
}

/// A child process serving the task protocol over stdio. One caller
/// owns the process for its lifetime; requests are strictly
/// synchronous, so responses arrive in submission order.
pub struct WorkerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    identity: ProcessIdentity,
    kill_timeout: Duration,
    alive: bool,
}

impl WorkerProcess {
    /// Spawn a worker pinned to a working directory
    pub fn spawn(
        exe: &Path,
        workdir: &Path,
        kill_timeout: Duration,
    ) -> Result<Self, WorkerError> {
        let mut child = Command::new(exe)
            .arg("worker")
            .current_dir(workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(WorkerError::Spawn)?;

        let stdin = child.stdin.take().ok_or_else(|| {
            WorkerError::Spawn(std::io::Error::other("worker stdin unavailable"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            WorkerError::Spawn(std::io::Error::other("worker stdout unavailable"))
        })?;

        let identity = ProcessIdentity::next(child.id());
        debug!(pid = child.id(), workdir = %workdir.display(), "spawned worker");

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
            identity,
            kill_timeout,
            alive: true,
        })
    }

    pub fn identity(&self) -> ProcessIdentity {
        self.identity
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Submit one task and block until its result arrives
    pub fn execute_task(&mut self, task: &Task) -> Result<TaskOutcome, WorkerError> {
        if !self.alive {
            return Err(WorkerError::Terminated);
        }
        let stdin = self.stdin.as_mut().ok_or(WorkerError::Terminated)?;

        let encoded = serde_json::to_string(task).map_err(WorkerError::Decode)?;
        writeln!(stdin, "{}", encoded).map_err(WorkerError::Channel)?;
        stdin.flush().map_err(WorkerError::Channel)?;

        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(WorkerError::Channel)?;
        if read == 0 {
            self.alive = false;
            return Err(WorkerError::Channel(std::io::Error::other(
                "worker closed its result channel",
            )));
        }

        serde_json::from_str(&line).map_err(WorkerError::Decode)
    }

    /// Terminate the worker. Idempotent: a second call is a no-op.
    /// Sends a shutdown request, waits for a graceful exit within the
    /// bounded timeout, then hard-kills.
    pub fn kill(&mut self) -> Result<(), WorkerError> {
        if !self.alive {
            return Ok(());
        }
        self.alive = false;

        // best effort; the channel may already be broken
        if let Some(mut stdin) = self.stdin.take() {
            if let Ok(encoded) = serde_json::to_string(&Task::Shutdown) {
                let _ = writeln!(stdin, "{}", encoded);
                let _ = stdin.flush();
            }
            // dropping stdin closes the task queue
        }

        let deadline = Instant::now() + self.kill_timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return Ok(()),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(WorkerError::Channel(e)),
            }
        }

        warn!(pid = self.child.id(), "worker unresponsive, hard-killing");
        self.child.kill().map_err(WorkerError::Channel)?;
        self.child.wait().map_err(WorkerError::Channel)?;
        Ok(())
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        let _ = self.kill();
    }
}

/// Zero-isolation host running tasks in the caller's own process
pub struct DirectHost {
    runtime: Runtime,
    identity: ProcessIdentity,
    alive: bool,
}

impl DirectHost {
    pub fn new() -> Self {
        Self {
            runtime: Runtime::new(),
            identity: ProcessIdentity::next(std::process::id()),
            alive: true,
        }
    }

    pub fn identity(&self) -> ProcessIdentity {
        self.identity
    }

    pub fn execute_task(&mut self, task: &Task) -> Result<TaskOutcome, WorkerError> {
        if !self.alive {
            return Err(WorkerError::Terminated);
        }
        let task = task.clone();
        let outcome = catch_unwind(AssertUnwindSafe(|| task.execute(&mut self.runtime)))
            .unwrap_or_else(|_| TaskOutcome::InternalError("task panicked".to_string()));
        Ok(outcome)
    }
}

impl Default for DirectHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Either fidelity level behind one interface
pub enum ExecutionHost {
    Isolated(WorkerProcess),
    Direct(DirectHost),
}

impl ExecutionHost {
    pub fn identity(&self) -> ProcessIdentity {
        match self {
            ExecutionHost::Isolated(w) => w.identity(),
            ExecutionHost::Direct(d) => d.identity(),
        }
    }

    pub fn execute_task(&mut self, task: &Task) -> Result<TaskOutcome, WorkerError> {
        match self {
            ExecutionHost::Isolated(w) => w.execute_task(task),
            ExecutionHost::Direct(d) => d.execute_task(task),
        }
    }

    pub fn kill(&mut self) -> Result<(), WorkerError> {
        match self {
            ExecutionHost::Isolated(w) => w.kill(),
            ExecutionHost::Direct(d) => {
                d.alive = false;
                Ok(())
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        match self {
            ExecutionHost::Isolated(w) => w.is_alive(),
            ExecutionHost::Direct(d) => d.alive,
        }
    }
}

/// Shared handle to a host; one logical owner drives it, the session
/// registry holds a second reference for sweep-kill.
pub type ProcessHandle = Rc<RefCell<ExecutionHost>>;
