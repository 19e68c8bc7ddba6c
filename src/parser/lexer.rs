//! Lexer for the exercise language
//!
//! Tokenization happens line by line: an indentation pre-pass turns
//! leading whitespace into `Indent`/`Dedent` tokens and flags bad
//! indentation distinctly from general syntax errors, then logos
//! tokenizes the line content.

use crate::diagnostics::Span;
use crate::parser::span::SourceFile;
use logos::Logos;

/// Token types for the exercise language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t]+")]
#[logos(skip r"#[^\n]*")]
pub enum TokenKind {
    // Keywords
    #[token("and")]
    And,
    #[token("as")]
    As,
    #[token("def")]
    Def,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("false")]
    False,
    #[token("for")]
    For,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("none")]
    None,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("pass")]
    Pass,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("while")]
    While,
    #[token("with")]
    With,

    // Literals
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    FloatLit(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLit(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        Some(unescape(&s[1..s.len()-1]))
    })]
    StrLit(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token(".")]
    Dot,

    // Structure tokens produced by the indentation pre-pass
    Newline,
    Indent,
    Dedent,
    Eof,
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// A token with its span
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Kind of lexing failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Bad indentation: mixed tabs, or a dedent that matches no open level
    Indentation,
    /// A character the language does not recognize
    UnexpectedCharacter,
}

/// A lexing failure with location
#[derive(Debug, Clone)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub message: String,
    pub span: Span,
}

/// Lexer for exercise-language source code
pub struct Lexer<'a> {
    source: &'a SourceFile,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source file
    pub fn new(source: &'a SourceFile) -> Self {
        Self { source }
    }

    /// Tokenize the whole file, producing structure tokens for
    /// indentation and a trailing `Eof`.
    pub fn tokenize(&self) -> Result<Vec<Token>, LexError> {
        let content = self.source.content();
        let mut tokens = Vec::new();
        let mut indent_stack: Vec<usize> = vec![0];

        let mut offset = 0;
        for line in content.split_inclusive('\n') {
            let line_start = offset;
            offset += line.len();
            let line = line.strip_suffix('\n').unwrap_or(line);
            let line = line.strip_suffix('\r').unwrap_or(line);

            let trimmed = line.trim_start_matches([' ', '\t']);
            if trimmed.is_empty() || trimmed.starts_with('#') {
                // blank and comment-only lines carry no indentation meaning
                continue;
            }

            let ws_len = line.len() - trimmed.len();
            let ws = &line[..ws_len];
            if ws.contains('\t') {
                return Err(LexError {
                    kind: LexErrorKind::Indentation,
                    message: "tab character in indentation".to_string(),
                    span: self.source.span(line_start, line_start + ws_len),
                });
            }

            self.handle_indent(ws_len, line_start, &mut indent_stack, &mut tokens)?;
            self.lex_line(trimmed, line_start + ws_len, &mut tokens)?;

            let line_end = line_start + line.len();
            tokens.push(Token::new(
                TokenKind::Newline,
                self.source.span(line_end, line_end),
            ));
        }

        let end = content.len();
        while indent_stack.len() > 1 {
            indent_stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, self.source.span(end, end)));
        }
        tokens.push(Token::new(TokenKind::Eof, self.source.span(end, end)));

        Ok(tokens)
    }

    fn handle_indent(
        &self,
        indent: usize,
        line_start: usize,
        stack: &mut Vec<usize>,
        tokens: &mut Vec<Token>,
    ) -> Result<(), LexError> {
        let current = *stack.last().unwrap_or(&0);
        let span = self.source.span(line_start, line_start + indent);

        if indent > current {
            stack.push(indent);
            tokens.push(Token::new(TokenKind::Indent, span));
            return Ok(());
        }

        while indent < *stack.last().unwrap_or(&0) {
            stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, span.clone()));
        }

        if indent != *stack.last().unwrap_or(&0) {
            return Err(LexError {
                kind: LexErrorKind::Indentation,
                message: "unindent does not match any outer indentation level".to_string(),
                span,
            });
        }

        Ok(())
    }

    fn lex_line(
        &self,
        line: &str,
        base_offset: usize,
        tokens: &mut Vec<Token>,
    ) -> Result<(), LexError> {
        let mut lexer = TokenKind::lexer(line);
        while let Some(result) = lexer.next() {
            let range = lexer.span();
            let span = self
                .source
                .span(base_offset + range.start, base_offset + range.end);
            match result {
                Ok(kind) => tokens.push(Token::new(kind, span)),
                Err(()) => {
                    return Err(LexError {
                        kind: LexErrorKind::UnexpectedCharacter,
                        message: format!("unexpected character: {:?}", lexer.slice()),
                        span,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
