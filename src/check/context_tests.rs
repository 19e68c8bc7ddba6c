use super::*;
use crate::parser;
use crate::parser::ast::Expr;
use pretty_assertions::assert_eq;

fn expr(source: &str) -> Expr {
    let parsed = parser::parse(&format!("{}\n", source), "ctx").unwrap();
    match &parsed.program.body[0] {
        crate::parser::ast::Stmt::Expr { expr, .. } => expr.clone(),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn update_produces_union_of_keys() {
    let base = Context::new().update_ctx(&[("a".to_string(), expr("1"))]);
    let child = base.update_ctx(&[("b".to_string(), expr("2"))]);
    assert_eq!(child.names(), vec!["a".to_string(), "b".to_string()]);
    assert!(child.contains("a"));
    assert!(child.contains("b"));
}

#[test]
fn new_bindings_win_on_collision() {
    let base = Context::new().update_ctx(&[("a".to_string(), expr("1"))]);
    let child = base.update_ctx(&[("a".to_string(), expr("2"))]);
    match child.get("a").unwrap() {
        Expr::IntLit { value, .. } => assert_eq!(*value, 2),
        other => panic!("expected int literal, got {:?}", other),
    }
}

#[test]
fn parent_is_not_mutated_by_update() {
    let base = Context::new().update_ctx(&[("a".to_string(), expr("1"))]);
    let _child = base.update_ctx(&[("a".to_string(), expr("2")), ("b".to_string(), expr("3"))]);
    assert_eq!(base.len(), 1);
    match base.get("a").unwrap() {
        Expr::IntLit { value, .. } => assert_eq!(*value, 1),
        other => panic!("expected int literal, got {:?}", other),
    }
    assert!(!base.contains("b"));
}

#[test]
fn empty_update_shares_storage() {
    let base = Context::new().update_ctx(&[("a".to_string(), expr("1"))]);
    let child = base.update_ctx(&[]);
    assert!(child.shares_storage(&base));
}

#[test]
fn nonempty_update_does_not_share_storage() {
    let base = Context::new();
    let child = base.update_ctx(&[("a".to_string(), expr("1"))]);
    assert!(!child.shares_storage(&base));
}
