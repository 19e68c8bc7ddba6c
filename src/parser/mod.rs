//! Parser for the exercise language
//!
//! This module provides:
//! - Lexer (tokenization with indentation structure)
//! - Parser (AST construction)
//! - AST definitions
//! - Span tracking
//!
//! The entry point `parse` classifies failures as indentation vs.
//! general syntax errors; the caller decides whether a failure is
//! learner feedback or an instructor error.

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod span;

pub use ast::*;
pub use lexer::{Lexer, LexError, LexErrorKind};
pub use parser::Parser;
pub use span::SourceFile;

use crate::diagnostics::{error_codes, Diagnostic};
use std::path::PathBuf;
use std::rc::Rc;

/// Classification of a parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Bad indentation (reported to learners as its own failure class)
    Indentation,
    /// Any other syntax error
    Syntax,
}

/// A classified parse failure
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub diagnostic: Diagnostic,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.diagnostic.message)
    }
}

impl std::error::Error for ParseError {}

/// A parse result: the tree plus the token-position map it was built
/// from, shared read-only by everything derived from it.
#[derive(Debug, Clone)]
pub struct ParsedProgram {
    pub source: Rc<SourceFile>,
    pub program: Rc<Program>,
}

/// Parse source text into a program
pub fn parse(text: &str, origin: &str) -> Result<ParsedProgram, ParseError> {
    let source = Rc::new(SourceFile::new(PathBuf::from(origin), text.to_string()));

    let tokens = Lexer::new(&source).tokenize().map_err(|e| {
        let (kind, code) = match e.kind {
            LexErrorKind::Indentation => (
                ParseErrorKind::Indentation,
                error_codes::syntax::INDENTATION_ERROR,
            ),
            LexErrorKind::UnexpectedCharacter => (
                ParseErrorKind::Syntax,
                error_codes::syntax::UNEXPECTED_TOKEN,
            ),
        };
        ParseError {
            kind,
            diagnostic: Diagnostic::error(code).message(e.message).span(e.span).build(),
        }
    })?;

    let program = Parser::new(tokens).parse_program().map_err(|diagnostic| ParseError {
        kind: ParseErrorKind::Syntax,
        diagnostic,
    })?;

    Ok(ParsedProgram {
        source,
        program: Rc::new(program),
    })
}
