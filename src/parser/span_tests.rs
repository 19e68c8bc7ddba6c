use super::*;
use std::path::PathBuf;

fn file(content: &str) -> SourceFile {
    SourceFile::new(PathBuf::from("student"), content.to_string())
}

#[test]
fn line_col_is_one_indexed() {
    let f = file("a = 1\nb = 2\n");
    let span = f.span(6, 11);
    assert_eq!(span.start_line, 2);
    assert_eq!(span.start_col, 1);
    assert_eq!(span.end_col, 6);
}

#[test]
fn slice_returns_span_text() {
    let f = file("a = 1\nb = a + 1\n");
    let span = f.span(6, 15);
    assert_eq!(f.slice(&span), "b = a + 1");
}

#[test]
fn slice_clamps_out_of_range() {
    let f = file("x");
    let span = f.span(0, 100);
    assert_eq!(f.slice(&span), "x");
}
