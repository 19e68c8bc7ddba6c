use super::*;
use pretty_assertions::assert_eq;

#[test]
fn own_parameters_expand() {
    let trail = vec![MessageEntry::new("Check {{part}}.").with("part", "the function call")];
    assert_eq!(render_trail(&trail), "Check the function call.");
}

#[test]
fn parent_and_child_parameters_expand() {
    let trail = vec![
        MessageEntry::new("In {{part}}, ").with("part", "the if statement"),
        MessageEntry::new("inside {{parent.part}} check {{child.part}}.").with("part", "the body"),
        MessageEntry::new("").with("part", "the first argument"),
    ];
    assert_eq!(
        render_trail(&trail),
        "In the if statement, inside the if statement check the first argument."
    );
}

#[test]
fn unresolved_placeholders_expand_to_nothing() {
    let trail = vec![MessageEntry::new("got {{missing}} here")];
    assert_eq!(render_trail(&trail), "got  here");
}

#[test]
fn entries_render_in_order() {
    let trail = vec![
        MessageEntry::new("first "),
        MessageEntry::new("second "),
        MessageEntry::new("third"),
    ];
    assert_eq!(render_trail(&trail), "first second third");
}

#[test]
fn no_separator_is_inserted_between_entries() {
    let trail = vec![
        MessageEntry::new("Did you define {{name}}? ").with("name", "x"),
        MessageEntry::new("Expected an int."),
    ];
    assert_eq!(render_trail(&trail), "Did you define x? Expected an int.");
}

#[test]
fn empty_expansions_contribute_nothing() {
    let trail = vec![
        MessageEntry::new("start "),
        MessageEntry::new("{{missing}}"),
        MessageEntry::new("end"),
    ];
    assert_eq!(render_trail(&trail), "start end");
}

#[test]
fn unterminated_placeholder_is_kept_verbatim() {
    let trail = vec![MessageEntry::new("broken {{tail")];
    assert_eq!(render_trail(&trail), "broken {{tail");
}
