//! Per-type result converters and the generic representation fallback.
//!
//! A converter is a pre-parsed expression of the exercise language
//! with a single free parameter; the worker binds the staged value to
//! that parameter and evaluates the body, yielding a canonical value
//! to represent. The table is keyed by qualified runtime type name.
//! Values with no converter fall back to a generic serialization;
//! opaque values (closures, managers) have no representation at all.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diagnostics::error_codes;
use crate::interpreter::Value;
use crate::parser::ast::Expr;
use crate::parser::{self, ParseError};

/// A transportable transform applied to a value inside the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Converter {
    /// The free parameter name the staged value is bound to
    pub param: String,
    /// The pre-parsed expression body
    pub body: Expr,
}

impl Converter {
    /// Parse a converter from a single-expression source snippet
    pub fn from_source(param: &str, source: &str) -> Result<Self, ParseError> {
        let parsed = parser::parse(&format!("{}\n", source), "converter")?;
        match parsed.program.body.first() {
            Some(crate::parser::ast::Stmt::Expr { expr, .. }) => Ok(Self {
                param: param.to_string(),
                body: expr.clone(),
            }),
            _ => {
                // a non-expression snippet is an authoring mistake
                let diagnostic =
                    crate::diagnostics::Diagnostic::error(error_codes::syntax::SYNTAX_ERROR)
                        .message("converter body must be a single expression")
                        .build();
                Err(ParseError {
                    kind: crate::parser::ParseErrorKind::Syntax,
                    diagnostic,
                })
            }
        }
    }
}

/// Converter registry keyed by qualified type name (`core.frame`)
#[derive(Debug, Default)]
pub struct ConverterTable {
    converters: HashMap<String, Converter>,
}

impl ConverterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: &str, converter: Converter) {
        self.converters.insert(type_name.to_string(), converter);
    }

    pub fn get(&self, type_name: &str) -> Option<&Converter> {
        self.converters.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

/// The built-in converter table. Floats are canonicalized through
/// `str` so `2.0` and `2.00` compare equal by representation; frames
/// are reduced to their column listing.
pub fn manual_converters() -> ConverterTable {
    let mut table = ConverterTable::new();
    // these snippets always parse
    if let Ok(converter) = Converter::from_source("v", "str(v)") {
        table.register("core.float", converter);
    }
    if let Ok(converter) = Converter::from_source("v", "columns(v)") {
        table.register("core.frame", converter);
    }
    table
}

/// Generic fallback serialization of a value. `None` means the value
/// has no transportable representation, which callers must keep
/// distinct from a falsy value.
pub fn generic_representation(value: &Value) -> Option<Vec<u8>> {
    if value.is_opaque() {
        return None;
    }
    serde_json::to_vec(value).ok()
}

#[cfg(test)]
#[path = "converters_tests.rs"]
mod tests;
