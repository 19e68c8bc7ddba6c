//! Abstract Syntax Tree definitions for the exercise language
//!
//! All nodes carry a unique node ID (identity, used for memoized
//! analyses) and a source span (the reverse index into the token map).
//! Trees are serde-serializable so they can travel across the worker
//! process boundary; node IDs are skipped during serialization, which
//! makes two parses of the same text structurally equal on the wire.

use crate::diagnostics::Span;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for AST nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Generate a new unique node ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete program: a sequence of top-level statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    #[serde(skip, default)]
    pub id: NodeId,
    pub span: Span,
    pub body: Vec<Stmt>,
}

impl Program {
    /// Wrap a bare statement list into a synthetic program node so it
    /// can be treated uniformly as one tree position.
    pub fn wrap(stmts: Vec<Stmt>) -> Self {
        let span = match (stmts.first(), stmts.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => Span::file(""),
        };
        Self {
            id: NodeId::new(),
            span,
            body: stmts,
        }
    }
}

/// Function parameter with optional default value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    #[serde(skip, default)]
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub default: Option<Expr>,
}

/// One `with` item: a scope-manager expression and the names it binds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithItem {
    #[serde(skip, default)]
    pub id: NodeId,
    pub span: Span,
    pub context_expr: Expr,
    pub optional_vars: Vec<String>,
}

/// Assignment target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssignTarget {
    Name {
        span: Span,
        name: String,
    },
    Attribute {
        span: Span,
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        span: Span,
        value: Box<Expr>,
        index: Box<Expr>,
    },
}

impl AssignTarget {
    pub fn span(&self) -> &Span {
        match self {
            AssignTarget::Name { span, .. }
            | AssignTarget::Attribute { span, .. }
            | AssignTarget::Subscript { span, .. } => span,
        }
    }
}

/// Statement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Stmt {
    Assign {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        target: AssignTarget,
        value: Expr,
    },
    Expr {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        expr: Expr,
    },
    FunctionDef {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
    Return {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        value: Option<Expr>,
    },
    If {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        test: Expr,
        body: Vec<Stmt>,
    },
    For {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        target: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
    With {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },
    Pass {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Assign { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::FunctionDef { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::For { span, .. }
            | Stmt::With { span, .. }
            | Stmt::Pass { span, .. } => span,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Stmt::Assign { id, .. }
            | Stmt::Expr { id, .. }
            | Stmt::FunctionDef { id, .. }
            | Stmt::Return { id, .. }
            | Stmt::If { id, .. }
            | Stmt::While { id, .. }
            | Stmt::For { id, .. }
            | Stmt::With { id, .. }
            | Stmt::Pass { id, .. } => *id,
        }
    }
}

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expr {
    IntLit {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        value: i64,
    },
    FloatLit {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        value: f64,
    },
    StrLit {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        value: String,
    },
    BoolLit {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        value: bool,
    },
    NoneLit {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
    },
    Name {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        name: String,
    },
    Attribute {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        value: Box<Expr>,
        attr: String,
    },
    Call {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    Subscript {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Binary {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        op: UnaryOp,
        expr: Box<Expr>,
    },
    ListLit {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        items: Vec<Expr>,
    },
    DictLit {
        #[serde(skip, default)]
        id: NodeId,
        span: Span,
        entries: Vec<(Expr, Expr)>,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::IntLit { span, .. }
            | Expr::FloatLit { span, .. }
            | Expr::StrLit { span, .. }
            | Expr::BoolLit { span, .. }
            | Expr::NoneLit { span, .. }
            | Expr::Name { span, .. }
            | Expr::Attribute { span, .. }
            | Expr::Call { span, .. }
            | Expr::Subscript { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::ListLit { span, .. }
            | Expr::DictLit { span, .. } => span,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Expr::IntLit { id, .. }
            | Expr::FloatLit { id, .. }
            | Expr::StrLit { id, .. }
            | Expr::BoolLit { id, .. }
            | Expr::NoneLit { id, .. }
            | Expr::Name { id, .. }
            | Expr::Attribute { id, .. }
            | Expr::Call { id, .. }
            | Expr::Subscript { id, .. }
            | Expr::Binary { id, .. }
            | Expr::Unary { id, .. }
            | Expr::ListLit { id, .. }
            | Expr::DictLit { id, .. } => *id,
        }
    }

    /// Render a dotted name for name and attribute chains
    /// (`a`, `a.b`, `a.b.c`); `None` for anything else.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Expr::Name { name, .. } => Some(name.clone()),
            Expr::Attribute { value, attr, .. } => {
                value.dotted_name().map(|base| format!("{}.{}", base, attr))
            }
            _ => None,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Compare two programs structurally, ignoring node identity.
pub fn structural_eq(a: &Program, b: &Program) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
