//! Comparison model between a learner submission and the reference
//! solution: layered lexical contexts, the synchronized dual-tree
//! state, memoized structural analyses, and the signature/converter
//! tables consulted while comparing runtime values.

pub mod context;
pub mod converters;
pub mod dispatcher;
pub mod feedback;
pub mod signature;
pub mod state;

pub use context::Context;
pub use converters::{Converter, ConverterTable};
pub use dispatcher::{Dispatcher, FactSet, VisitorKind};
pub use feedback::{Feedback, MessageEntry};
pub use signature::{manual_signatures, SigParam, Signature};
pub use state::{Descent, NodeKind, State, Subtree, SyntaxNode};

use thiserror::Error;

use crate::worker::WorkerError;

/// Failures of the checking machinery itself, as opposed to learner
/// code defects (which become feedback, never errors).
#[derive(Debug, Error)]
pub enum CheckError {
    /// Instructor-authored code failed to parse or run
    #[error("instructor error: {0}")]
    Instructor(String),

    /// A worker process failed or its channel broke
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// A defect in the checking machinery
    #[error("internal error: {0}")]
    Internal(String),
}
