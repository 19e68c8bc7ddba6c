//! Stable error codes for examiner diagnostics.

/// Syntax and lexing errors (E1xxx). Runtime failures inside an
/// execution host carry their own E4xxx codes as error data rather
/// than diagnostics; see the interpreter's error constructors.
pub mod syntax {
    /// General syntax error
    pub const SYNTAX_ERROR: &str = "E1001";
    /// Indentation error (bad dedent, mixed tabs/spaces)
    pub const INDENTATION_ERROR: &str = "E1002";
    /// Unexpected character in input
    pub const UNEXPECTED_TOKEN: &str = "E1003";
}
