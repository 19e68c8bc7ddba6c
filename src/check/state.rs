//! The synchronized dual-tree state.
//!
//! A `State` pairs one position in the student's tree with the
//! matching position in the solution's tree, together with the scopes,
//! runtime bindings, live execution hosts, and the feedback trail
//! accumulated on the way down. Descent into matching substructures
//! produces child states; a state is immutable once built, so derived
//! copies are produced instead of in-place edits.

use std::rc::Rc;

use crate::diagnostics::Span;
use crate::parser::ast::{Expr, Program, Stmt};
use crate::parser::{ParseError, ParseErrorKind, ParsedProgram, SourceFile};
use crate::worker::ProcessHandle;

use super::context::Context;
use super::feedback::{render_trail, Feedback, MessageEntry};
use super::CheckError;

/// One position in a parsed tree
#[derive(Debug, Clone)]
pub enum SyntaxNode {
    Program(Rc<Program>),
    Stmt(Rc<Stmt>),
    Expr(Rc<Expr>),
}

impl SyntaxNode {
    pub fn span(&self) -> &Span {
        match self {
            SyntaxNode::Program(p) => &p.span,
            SyntaxNode::Stmt(s) => s.span(),
            SyntaxNode::Expr(e) => e.span(),
        }
    }
}

/// A descent target: a real node, a bare statement list (wrapped into
/// a synthetic program node before use), or nothing.
#[derive(Debug, Clone)]
pub enum Subtree {
    Node(SyntaxNode),
    Stmts(Vec<Stmt>),
    Missing,
}

impl Subtree {
    fn resolve(self) -> Option<SyntaxNode> {
        match self {
            Subtree::Node(node) => Some(node),
            Subtree::Stmts(stmts) => Some(SyntaxNode::Program(Rc::new(Program::wrap(stmts)))),
            Subtree::Missing => None,
        }
    }
}

/// The syntactic construct a state is focused on. The construct's
/// behavior hangs off this tag instead of a subclass per construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Statements,
    FunctionDef,
    FunctionCall,
    If,
    While,
    For,
    With,
    Expression,
    Argument,
}

impl NodeKind {
    /// How feedback refers to this construct
    pub fn part_description(&self) -> &'static str {
        match self {
            NodeKind::Root => "the submission",
            NodeKind::Statements => "the highlighted code",
            NodeKind::FunctionDef => "the function definition",
            NodeKind::FunctionCall => "the function call",
            NodeKind::If => "the if statement",
            NodeKind::While => "the while loop",
            NodeKind::For => "the for loop",
            NodeKind::With => "the with statement",
            NodeKind::Expression => "the expression",
            NodeKind::Argument => "the argument",
        }
    }
}

/// The parameters of one descent step
#[derive(Debug, Clone)]
pub struct Descent {
    pub student: Subtree,
    pub solution: Subtree,
    pub student_ctx: Vec<(String, Expr)>,
    pub solution_ctx: Vec<(String, Expr)>,
    pub student_env: Vec<(String, Expr)>,
    pub solution_env: Vec<(String, Expr)>,
    pub message: Option<MessageEntry>,
    pub node_kind: Option<NodeKind>,
}

impl Descent {
    pub fn new(student: Subtree, solution: Subtree) -> Self {
        Self {
            student,
            solution,
            student_ctx: Vec::new(),
            solution_ctx: Vec::new(),
            student_env: Vec::new(),
            solution_env: Vec::new(),
            message: None,
            node_kind: None,
        }
    }

    /// A descent that does not move either tree position
    pub fn stay() -> Self {
        Self::new(Subtree::Missing, Subtree::Missing)
    }

    pub fn contexts(
        mut self,
        student: Vec<(String, Expr)>,
        solution: Vec<(String, Expr)>,
    ) -> Self {
        self.student_ctx = student;
        self.solution_ctx = solution;
        self
    }

    pub fn envs(mut self, student: Vec<(String, Expr)>, solution: Vec<(String, Expr)>) -> Self {
        self.student_env = student;
        self.solution_env = solution;
        self
    }

    pub fn message(mut self, message: MessageEntry) -> Self {
        self.message = Some(message);
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.node_kind = Some(kind);
        self
    }
}

/// A node in the synchronized traversal of the two programs
pub struct State {
    pub student_tree: SyntaxNode,
    pub solution_tree: SyntaxNode,
    pub student_source: Rc<SourceFile>,
    pub solution_source: Rc<SourceFile>,
    /// The source text of the current subtrees, re-sliced from the
    /// position maps at every descent
    pub student_code: String,
    pub solution_code: String,
    pub student_context: Context,
    pub solution_context: Context,
    /// Runtime bindings known to be in scope at this position
    pub student_env: Context,
    pub solution_env: Context,
    /// Live execution hosts, inherited unchanged through descent
    pub student_host: Option<ProcessHandle>,
    pub solution_host: Option<ProcessHandle>,
    pub messages: Vec<MessageEntry>,
    pub highlight: Option<Span>,
    pub node_kind: NodeKind,
    pub parent: Option<Rc<State>>,
    /// Raw stdout of the student's top-level run (root state only)
    pub student_output: Option<String>,
    /// Top-level failure of the student's run, carried as data
    pub student_error: Option<String>,
}

impl State {
    /// Build the root state from two parse results and the hosts that
    /// ran them
    pub fn root(
        student: &ParsedProgram,
        solution: &ParsedProgram,
        student_host: Option<ProcessHandle>,
        solution_host: Option<ProcessHandle>,
        student_output: Option<String>,
        student_error: Option<String>,
    ) -> Rc<State> {
        Rc::new(State {
            student_tree: SyntaxNode::Program(Rc::clone(&student.program)),
            solution_tree: SyntaxNode::Program(Rc::clone(&solution.program)),
            student_source: Rc::clone(&student.source),
            solution_source: Rc::clone(&solution.source),
            student_code: student.source.content().to_string(),
            solution_code: solution.source.content().to_string(),
            student_context: Context::new(),
            solution_context: Context::new(),
            student_env: Context::new(),
            solution_env: Context::new(),
            student_host,
            solution_host,
            messages: Vec::new(),
            highlight: None,
            node_kind: NodeKind::Root,
            parent: None,
            student_output,
            student_error,
        })
    }

    /// Descend into a matching pair of subtrees.
    ///
    /// When both subtrees resolve to real nodes a new child state is
    /// created, carrying re-sliced source text, derived contexts and
    /// environments, the appended message trail, the inherited hosts,
    /// and a parent link. When either subtree is missing, no descent
    /// happens: a derived copy of this state is returned with only
    /// contexts, environments and messages updated.
    pub fn to_child(self: &Rc<Self>, descent: Descent) -> Rc<State> {
        let student_context = self.student_context.update_ctx(&descent.student_ctx);
        let solution_context = self.solution_context.update_ctx(&descent.solution_ctx);
        let student_env = self.student_env.update_ctx(&descent.student_env);
        let solution_env = self.solution_env.update_ctx(&descent.solution_env);

        let mut messages = self.messages.clone();
        if let Some(message) = descent.message {
            messages.push(message);
        }

        let student_subtree = descent.student.resolve();
        let solution_subtree = descent.solution.resolve();

        match (student_subtree, solution_subtree) {
            (Some(student_tree), Some(solution_tree)) => {
                let student_code = self
                    .student_source
                    .slice(student_tree.span())
                    .to_string();
                let solution_code = self
                    .solution_source
                    .slice(solution_tree.span())
                    .to_string();
                let highlight = Some(student_tree.span().clone());

                Rc::new(State {
                    student_tree,
                    solution_tree,
                    student_source: Rc::clone(&self.student_source),
                    solution_source: Rc::clone(&self.solution_source),
                    student_code,
                    solution_code,
                    student_context,
                    solution_context,
                    student_env,
                    solution_env,
                    student_host: self.student_host.clone(),
                    solution_host: self.solution_host.clone(),
                    messages,
                    highlight,
                    node_kind: descent.node_kind.unwrap_or(self.node_kind),
                    parent: Some(Rc::clone(self)),
                    student_output: None,
                    student_error: None,
                })
            }
            _ => Rc::new(State {
                student_tree: self.student_tree.clone(),
                solution_tree: self.solution_tree.clone(),
                student_source: Rc::clone(&self.student_source),
                solution_source: Rc::clone(&self.solution_source),
                student_code: self.student_code.clone(),
                solution_code: self.solution_code.clone(),
                student_context,
                solution_context,
                student_env,
                solution_env,
                student_host: self.student_host.clone(),
                solution_host: self.solution_host.clone(),
                messages,
                highlight: self.highlight.clone(),
                node_kind: self.node_kind,
                parent: self.parent.clone(),
                student_output: self.student_output.clone(),
                student_error: self.student_error.clone(),
            }),
        }
    }

    /// Parse learner-supplied code; a failure becomes a graceful,
    /// classified feedback outcome rather than an error
    pub fn parse_external(code: &str, origin: &str) -> Result<ParsedProgram, Box<Feedback>> {
        crate::parser::parse(code, origin).map_err(|e| Box::new(classify_for_learner(e)))
    }

    /// Parse instructor-supplied code; a failure is an authoring
    /// error, never learner feedback
    pub fn parse_internal(code: &str, origin: &str) -> Result<ParsedProgram, CheckError> {
        crate::parser::parse(code, origin)
            .map_err(|e| CheckError::Instructor(format!("{} failed to parse: {}", origin, e)))
    }

    /// Whether the student and solution hosts are distinct execution
    /// contexts. Defaults to "different" when a handle cannot be
    /// inspected, the conservative answer for callers special-casing
    /// a shared process.
    pub fn has_different_processes(&self) -> bool {
        let (student, solution) = match (&self.student_host, &self.solution_host) {
            (Some(student), Some(solution)) => (student, solution),
            _ => return true,
        };
        match (student.try_borrow(), solution.try_borrow()) {
            (Ok(a), Ok(b)) => a.identity() != b.identity(),
            _ => true,
        }
    }

    /// Guard for operations only meaningful at the traversal root
    pub fn assert_root(&self, operation: &str) -> Result<(), CheckError> {
        if self.parent.is_none() {
            Ok(())
        } else {
            Err(CheckError::Internal(format!(
                "{} can only be used on the root state",
                operation
            )))
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Expand the message trail into final feedback
    pub fn build_message(&self) -> Feedback {
        Feedback {
            message: render_trail(&self.messages),
            highlight: self.highlight.clone(),
        }
    }
}

fn classify_for_learner(error: ParseError) -> Feedback {
    let message = match error.kind {
        ParseErrorKind::Indentation => format!(
            "Your code can not be parsed because of an indentation problem: {}",
            error.diagnostic.message
        ),
        ParseErrorKind::Syntax => format!(
            "Your code can not be parsed because of a syntax problem: {}",
            error.diagnostic.message
        ),
    };
    Feedback {
        message,
        highlight: Some(error.diagnostic.span),
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
