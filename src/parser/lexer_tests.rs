use super::*;
use std::path::PathBuf;

fn lex(source: &str) -> Vec<TokenKind> {
    let source_file = SourceFile::new(PathBuf::from("student"), source.to_string());
    let lexer = Lexer::new(&source_file);
    lexer
        .tokenize()
        .expect("tokenize failed")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

fn lex_err(source: &str) -> LexError {
    let source_file = SourceFile::new(PathBuf::from("student"), source.to_string());
    Lexer::new(&source_file)
        .tokenize()
        .expect_err("expected lex error")
}

#[test]
fn keywords_and_names() {
    assert_eq!(
        lex("def f if else"),
        vec![
            TokenKind::Def,
            TokenKind::Ident("f".to_string()),
            TokenKind::If,
            TokenKind::Else,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn literals() {
    assert_eq!(
        lex("42 1.5 \"hi\" true none"),
        vec![
            TokenKind::IntLit(42),
            TokenKind::FloatLit(1.5),
            TokenKind::StrLit("hi".to_string()),
            TokenKind::True,
            TokenKind::None,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn string_escapes() {
    assert_eq!(
        lex(r#""a\nb""#),
        vec![
            TokenKind::StrLit("a\nb".to_string()),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn indent_dedent_pairs() {
    let kinds = lex("if x:\n    y = 1\nz = 2\n");
    assert_eq!(
        kinds,
        vec![
            TokenKind::If,
            TokenKind::Ident("x".to_string()),
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Ident("y".to_string()),
            TokenKind::Eq,
            TokenKind::IntLit(1),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Ident("z".to_string()),
            TokenKind::Eq,
            TokenKind::IntLit(2),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn trailing_dedents_are_closed_at_eof() {
    let kinds = lex("if x:\n    y = 1\n");
    assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    assert!(kinds.contains(&TokenKind::Dedent));
}

#[test]
fn blank_and_comment_lines_are_ignored() {
    let kinds = lex("a = 1\n\n# comment\nb = 2\n");
    assert!(!kinds.contains(&TokenKind::Indent));
    assert_eq!(
        kinds.iter().filter(|k| **k == TokenKind::Newline).count(),
        2
    );
}

#[test]
fn tab_indentation_is_an_indentation_error() {
    let err = lex_err("if x:\n\ty = 1\n");
    assert_eq!(err.kind, LexErrorKind::Indentation);
}

#[test]
fn bad_dedent_is_an_indentation_error() {
    let err = lex_err("if x:\n    y = 1\n  z = 2\n");
    assert_eq!(err.kind, LexErrorKind::Indentation);
    assert!(err.message.contains("unindent"));
}

#[test]
fn unknown_character_is_not_an_indentation_error() {
    let err = lex_err("a = 1 ?\n");
    assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter);
}
