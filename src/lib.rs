//! Examiner
//!
//! An automated correctness-checking engine for programming exercises:
//! a learner submission and an instructor solution are parsed into
//! synchronized trees, executed in isolated worker processes, and
//! compared through a narrow task protocol that turns every failure of
//! submitted code into data instead of a crash.

pub mod check;
pub mod cli;
pub mod diagnostics;
pub mod interpreter;
pub mod parser;
pub mod session;
pub mod tasks;
pub mod worker;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::check::{CheckError, Context, Descent, NodeKind, State, Subtree, SyntaxNode};
    pub use crate::diagnostics::{Diagnostic, Severity, Span};
    pub use crate::interpreter::{Runtime, Value};
    pub use crate::parser::ast::*;
    pub use crate::session::{ExerciseOutcome, Session, SessionConfig};
    pub use crate::worker::{Task, TaskOutcome};
}
