use super::*;

fn sample_span() -> Span {
    Span {
        file: "student".into(),
        start: 4,
        end: 9,
        start_line: 1,
        start_col: 5,
        end_line: 1,
        end_col: 10,
    }
}

#[test]
fn builder_sets_fields() {
    let diag = Diagnostic::error(syntax::SYNTAX_ERROR)
        .message("unexpected token")
        .span(sample_span())
        .note(Note::new("while parsing an assignment"))
        .build();

    assert_eq!(diag.code, "E1001");
    assert!(diag.is_error());
    assert_eq!(diag.notes.len(), 1);
}

#[test]
fn human_readable_underlines_the_span() {
    let source = "x = 1 +";
    let diag = Diagnostic::error(syntax::SYNTAX_ERROR)
        .message("expected expression")
        .span(sample_span())
        .build();

    let rendered = diag.to_human_readable(source);
    assert!(rendered.contains("error[E1001]"));
    assert!(rendered.contains("x = 1 +"));
    assert!(rendered.contains("^"));
}

#[test]
fn span_merge_covers_both() {
    let a = sample_span();
    let mut b = sample_span();
    b.start = 0;
    b.start_col = 1;
    b.end = 20;
    b.end_col = 21;

    let merged = a.merge(&b);
    assert_eq!(merged.start, 0);
    assert_eq!(merged.end, 20);
}

#[test]
fn bag_counts_errors() {
    let mut bag = DiagnosticBag::new();
    assert!(!bag.has_errors());
    bag.push(
        Diagnostic::warning(syntax::UNEXPECTED_TOKEN)
            .message("odd character")
            .span(sample_span())
            .build(),
    );
    assert!(!bag.has_errors());
    bag.push(
        Diagnostic::error(syntax::SYNTAX_ERROR)
            .message("bad")
            .span(sample_span())
            .build(),
    );
    assert!(bag.has_errors());
    assert_eq!(bag.error_count(), 1);
}
