//! Runtime error types for the exercise-language interpreter.

use std::fmt;

use super::value::Value;

/// Runtime error with error code and message
#[derive(Debug, Clone)]
pub struct RuntimeError {
    /// Error code (E4xxx series for runtime errors)
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
    /// Function return signal carrying the returned value
    pub return_value: Option<Box<Value>>,
}

impl RuntimeError {
    /// Create a new runtime error
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            return_value: None,
        }
    }

    /// Create a function return signal
    pub fn function_return(value: Value) -> Self {
        Self {
            code: "RETURN",
            message: String::new(),
            return_value: Some(Box::new(value)),
        }
    }

    /// Check if this is a return signal rather than a real error
    pub fn is_return(&self) -> bool {
        self.return_value.is_some()
    }

    /// Get the returned value out of a return signal
    pub fn into_return_value(self) -> Option<Value> {
        self.return_value.map(|v| *v)
    }

    /// Undefined variable error
    pub fn undefined_variable(name: &str) -> Self {
        Self::new("E4001", format!("undefined variable: {}", name))
    }

    /// Type mismatch error
    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        Self::new(
            "E4002",
            format!("type mismatch: expected {}, got {}", expected, got),
        )
    }

    /// Division by zero error
    pub fn division_by_zero() -> Self {
        Self::new("E4003", "division by zero")
    }

    /// Not callable error
    pub fn not_callable(type_name: &str) -> Self {
        Self::new("E4004", format!("{} is not callable", type_name))
    }

    /// Arity mismatch error
    pub fn arity_mismatch(expected: usize, got: usize) -> Self {
        Self::new(
            "E4005",
            format!("expected {} arguments, got {}", expected, got),
        )
    }

    /// Unknown attribute error
    pub fn unknown_attribute(type_name: &str, attr: &str) -> Self {
        Self::new(
            "E4006",
            format!("{} has no attribute {}", type_name, attr),
        )
    }

    /// Unknown method error
    pub fn unknown_method(type_name: &str, method: &str) -> Self {
        Self::new(
            "E4007",
            format!("unknown method: {}.{}", type_name, method),
        )
    }

    /// Value cannot be iterated
    pub fn not_iterable(type_name: &str) -> Self {
        Self::new("E4008", format!("{} is not iterable", type_name))
    }

    /// Bad subscript (missing key, out-of-range index, wrong type)
    pub fn bad_subscript(detail: impl Into<String>) -> Self {
        Self::new("E4009", format!("bad subscript: {}", detail.into()))
    }

    /// Unexpected keyword argument
    pub fn unexpected_keyword(name: &str) -> Self {
        Self::new("E4010", format!("unexpected keyword argument: {}", name))
    }

    /// A value used with `with` that is not a scope manager
    pub fn not_a_manager(type_name: &str) -> Self {
        Self::new("E4011", format!("{} is not a scope manager", type_name))
    }

    /// Scope-manager exit failure
    pub fn manager_exit_failed(detail: impl Into<String>) -> Self {
        Self::new("E4012", format!("scope manager exit failed: {}", detail.into()))
    }

    /// Integer arithmetic overflowed the machine range
    pub fn integer_overflow() -> Self {
        Self::new("E4019", "integer overflow")
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for RuntimeError {}
