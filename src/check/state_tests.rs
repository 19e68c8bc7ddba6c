use super::*;
use crate::check::feedback::MessageEntry;
use crate::parser;
use crate::worker::{DirectHost, ExecutionHost};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn root_pair(student: &str, solution: &str) -> Rc<State> {
    let student = parser::parse(student, "student").unwrap();
    let solution = parser::parse(solution, "solution").unwrap();
    State::root(&student, &solution, None, None, None, None)
}

fn direct_host() -> crate::worker::ProcessHandle {
    Rc::new(RefCell::new(ExecutionHost::Direct(DirectHost::new())))
}

#[test]
fn descent_into_both_subtrees_creates_a_child() {
    let root = root_pair("a = 1\nb = 2\n", "a = 1\nb = 2\n");
    let (stu_stmt, sol_stmt) = match (&root.student_tree, &root.solution_tree) {
        (SyntaxNode::Program(s), SyntaxNode::Program(o)) => (
            Rc::new(s.body[1].clone()),
            Rc::new(o.body[1].clone()),
        ),
        _ => unreachable!(),
    };

    let child = root.to_child(
        Descent::new(
            Subtree::Node(SyntaxNode::Stmt(stu_stmt)),
            Subtree::Node(SyntaxNode::Stmt(sol_stmt)),
        )
        .kind(NodeKind::Statements),
    );

    assert_eq!(child.student_code, "b = 2");
    assert_eq!(child.solution_code, "b = 2");
    assert_eq!(child.node_kind, NodeKind::Statements);
    assert!(child.highlight.is_some());
    assert!(Rc::ptr_eq(child.parent.as_ref().unwrap(), &root));
}

#[test]
fn bare_statement_lists_are_wrapped() {
    let root = root_pair("a = 1\nb = 2\nc = 3\n", "a = 1\nb = 2\nc = 3\n");
    let (stu, sol) = match (&root.student_tree, &root.solution_tree) {
        (SyntaxNode::Program(s), SyntaxNode::Program(o)) => {
            (s.body[1..].to_vec(), o.body[1..].to_vec())
        }
        _ => unreachable!(),
    };

    let child = root.to_child(Descent::new(Subtree::Stmts(stu), Subtree::Stmts(sol)));
    assert_eq!(child.student_code, "b = 2\nc = 3");
    assert!(matches!(child.student_tree, SyntaxNode::Program(_)));
}

#[test]
fn missing_subtree_updates_in_place_without_descending() {
    let root = root_pair("a = 1\n", "a = 1\n");
    let derived = root.to_child(
        Descent::stay().message(MessageEntry::new("Check {{part}}.").with("part", "something")),
    );

    // same position, no new parent level
    assert_eq!(derived.student_code, root.student_code);
    assert!(derived.parent.is_none());
    assert_eq!(derived.messages.len(), 1);
    assert!(root.messages.is_empty());
}

#[test]
fn contexts_are_shared_when_no_bindings_are_supplied() {
    let root = root_pair("a = 1\n", "a = 1\n");
    let derived = root.to_child(Descent::stay());
    assert!(derived.student_context.shares_storage(&root.student_context));
}

#[test]
fn message_trail_is_appended_in_order() {
    let root = root_pair("a = 1\n", "a = 1\n");
    let first = root.to_child(Descent::stay().message(MessageEntry::new("one ")));
    let second = first.to_child(Descent::stay().message(MessageEntry::new("two")));
    assert_eq!(second.build_message().message, "one two");
}

#[test]
fn external_parse_failure_is_classified_feedback() {
    let feedback = State::parse_external("if x:\n   y = 1\n  z = 2\n", "student").unwrap_err();
    assert!(feedback.message.contains("indentation problem"));
    assert!(feedback.highlight.is_some());

    let feedback = State::parse_external("x = = 1\n", "student").unwrap_err();
    assert!(feedback.message.contains("syntax problem"));
}

#[test]
fn internal_parse_failure_is_an_instructor_error() {
    let err = State::parse_internal("x = = 1\n", "solution").unwrap_err();
    assert!(matches!(err, crate::check::CheckError::Instructor(_)));
}

#[test]
fn distinct_hosts_report_different_processes() {
    let student = parser::parse("a = 1\n", "student").unwrap();
    let solution = parser::parse("a = 1\n", "solution").unwrap();
    let root = State::root(
        &student,
        &solution,
        Some(direct_host()),
        Some(direct_host()),
        None,
        None,
    );
    assert!(root.has_different_processes());
}

#[test]
fn shared_host_reports_same_process() {
    let student = parser::parse("a = 1\n", "student").unwrap();
    let solution = parser::parse("a = 1\n", "solution").unwrap();
    let shared = direct_host();
    let root = State::root(
        &student,
        &solution,
        Some(Rc::clone(&shared)),
        Some(shared),
        None,
        None,
    );
    assert!(!root.has_different_processes());
}

#[test]
fn missing_host_defaults_to_different() {
    let root = root_pair("a = 1\n", "a = 1\n");
    assert!(root.has_different_processes());
}

#[test]
fn assert_root_rejects_non_root_states() {
    let root = root_pair("a = 1\nb = 2\n", "a = 1\nb = 2\n");
    assert!(root.assert_root("run_exercise").is_ok());

    let (stu, sol) = match (&root.student_tree, &root.solution_tree) {
        (SyntaxNode::Program(s), SyntaxNode::Program(o)) => (
            Rc::new(s.body[0].clone()),
            Rc::new(o.body[0].clone()),
        ),
        _ => unreachable!(),
    };
    let child = root.to_child(Descent::new(
        Subtree::Node(SyntaxNode::Stmt(stu)),
        Subtree::Node(SyntaxNode::Stmt(sol)),
    ));
    assert!(child.assert_root("run_exercise").is_err());
}

#[test]
fn part_descriptions_name_the_construct() {
    assert_eq!(NodeKind::FunctionCall.part_description(), "the function call");
    assert_eq!(NodeKind::With.part_description(), "the with statement");
}
