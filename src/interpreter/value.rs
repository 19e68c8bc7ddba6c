//! Runtime value types for the exercise language.
//!
//! Values are serde-serializable so they can cross the worker process
//! boundary; closures serialize their body AST and managers their
//! payload, but both are treated as opaque when a transportable byte
//! representation is requested.

use serde::{Deserialize, Serialize};

use crate::parser::ast::Stmt;

use super::builtins::Builtin;

/// Runtime value. Adjacently tagged: internally tagged enums cannot
/// carry primitive newtype variants like `Int` and `Str`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// The none value
    None,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Text string
    Str(String),
    /// List of values
    List(Vec<Value>),
    /// Ordered key-value pairs
    Dict(Vec<(Value, Value)>),
    /// Table-like value with named columns
    Frame { columns: Vec<(String, Vec<Value>)> },
    /// User-defined function; the body reads the globals live at call
    /// time, so no captured environment is carried
    Closure {
        name: Option<String>,
        params: Vec<ParamSpec>,
        body: Vec<Stmt>,
    },
    /// Built-in function
    Builtin(Builtin),
    /// Scope-manager handle (`with ... as ...`)
    Manager {
        payload: Box<Value>,
        fail_on_exit: bool,
    },
}

/// A closure parameter with its default value, if any (evaluated at
/// definition time)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<Value>,
}

impl Value {
    /// Qualified runtime type name, used to select a result converter
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "core.none",
            Value::Bool(_) => "core.bool",
            Value::Int(_) => "core.int",
            Value::Float(_) => "core.float",
            Value::Str(_) => "core.str",
            Value::List(_) => "core.list",
            Value::Dict(_) => "core.dict",
            Value::Frame { .. } => "core.frame",
            Value::Closure { .. } => "core.function",
            Value::Builtin(_) => "core.builtin",
            Value::Manager { .. } => "core.manager",
        }
    }

    /// Unqualified type name (`int`, `str`, ...), used for generic
    /// method-signature lookups
    pub fn short_type_name(&self) -> &'static str {
        self.type_name()
            .rsplit('.')
            .next()
            .expect("type name always has a final segment")
    }

    /// Truthiness, following the conventions of dynamic teaching
    /// languages: empty collections, zero, and none are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            Value::Frame { columns } => !columns.is_empty(),
            _ => true,
        }
    }

    /// Values that have no transportable representation
    pub fn is_opaque(&self) -> bool {
        matches!(
            self,
            Value::Closure { .. } | Value::Builtin(_) | Value::Manager { .. }
        )
    }
}

/// Compare two values for equality
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Value::Dict(a), Value::Dict(b)) => {
            a.len() == b.len()
                && a.iter().all(|(k, v)| {
                    b.iter()
                        .any(|(k2, v2)| values_equal(k, k2) && values_equal(v, v2))
                })
        }
        (Value::Frame { columns: a }, Value::Frame { columns: b }) => {
            a.len() == b.len()
                && a.iter().zip(b.iter()).all(|((n1, c1), (n2, c2))| {
                    n1 == n2
                        && c1.len() == c2.len()
                        && c1.iter().zip(c2.iter()).all(|(x, y)| values_equal(x, y))
                })
        }
        // Functions and managers are never equal
        _ => false,
    }
}

/// Format a value the way the exercise language prints it
pub fn format_value(value: &Value) -> String {
    match value {
        Value::None => "none".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.1}", f)
            } else {
                f.to_string()
            }
        }
        Value::Str(s) => s.clone(),
        Value::List(items) => {
            let strs: Vec<String> = items.iter().map(repr_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Dict(entries) => {
            let strs: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", repr_value(k), repr_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
        Value::Frame { columns } => {
            let strs: Vec<String> = columns
                .iter()
                .map(|(name, cells)| format!("{}: {}", name, format_value(&Value::List(cells.clone()))))
                .collect();
            format!("frame({})", strs.join(", "))
        }
        Value::Closure { name, .. } => match name {
            Some(name) => format!("<function {}>", name),
            None => "<function>".to_string(),
        },
        Value::Builtin(b) => format!("<builtin {}>", b.name()),
        Value::Manager { .. } => "<manager>".to_string(),
    }
}

/// Format a value as it appears nested inside a collection (strings
/// keep their quotes)
pub fn repr_value(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{:?}", s),
        other => format_value(other),
    }
}
