use crate::parser::{self, ast::*};

fn parse_body(source: &str) -> Vec<Stmt> {
    let parsed = parser::parse(source, "test").expect("parse failed");
    parsed.program.body.clone()
}

#[test]
fn parses_assignment_and_expression() {
    let body = parse_body("x = 1\nprint(x)\n");
    assert_eq!(body.len(), 2);
    assert!(matches!(&body[0], Stmt::Assign { .. }));
    assert!(matches!(&body[1], Stmt::Expr { .. }));
}

#[test]
fn parses_function_def_with_default() {
    let body = parse_body("def add(a, b=1):\n    return a + b\n");
    match &body[0] {
        Stmt::FunctionDef { name, params, body, .. } => {
            assert_eq!(name, "add");
            assert_eq!(params.len(), 2);
            assert!(params[0].default.is_none());
            assert!(params[1].default.is_some());
            assert!(matches!(&body[0], Stmt::Return { .. }));
        }
        other => panic!("expected function def, got {:?}", other),
    }
}

#[test]
fn elif_desugars_to_nested_if() {
    let body = parse_body("if a:\n    pass\nelif b:\n    pass\nelse:\n    pass\n");
    match &body[0] {
        Stmt::If { orelse, .. } => match &orelse[0] {
            Stmt::If { orelse, .. } => assert_eq!(orelse.len(), 1),
            other => panic!("expected nested if, got {:?}", other),
        },
        other => panic!("expected if, got {:?}", other),
    }
}

#[test]
fn parses_with_items_and_bound_names() {
    let body = parse_body("with guard(1) as g, open(\"f\") as (a, b):\n    pass\n");
    match &body[0] {
        Stmt::With { items, .. } => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].optional_vars, vec!["g".to_string()]);
            assert_eq!(items[1].optional_vars, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected with, got {:?}", other),
    }
}

#[test]
fn keyword_arguments_follow_positional() {
    let body = parse_body("f(1, 2, sep=\" \")\n");
    match &body[0] {
        Stmt::Expr {
            expr: Expr::Call { args, kwargs, .. },
            ..
        } => {
            assert_eq!(args.len(), 2);
            assert_eq!(kwargs.len(), 1);
            assert_eq!(kwargs[0].0, "sep");
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn positional_after_keyword_is_rejected() {
    assert!(parser::parse("f(a=1, 2)\n", "test").is_err());
}

#[test]
fn dotted_name_of_attribute_chain() {
    let body = parse_body("a.b.c(1)\n");
    match &body[0] {
        Stmt::Expr {
            expr: Expr::Call { func, .. },
            ..
        } => assert_eq!(func.dotted_name(), Some("a.b.c".to_string())),
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn assignment_targets() {
    let body = parse_body("a.b = 1\nd[0] = 2\n");
    assert!(matches!(
        &body[0],
        Stmt::Assign {
            target: AssignTarget::Attribute { .. },
            ..
        }
    ));
    assert!(matches!(
        &body[1],
        Stmt::Assign {
            target: AssignTarget::Subscript { .. },
            ..
        }
    ));
}

#[test]
fn operator_precedence() {
    let body = parse_body("x = 1 + 2 * 3\n");
    match &body[0] {
        Stmt::Assign {
            value: Expr::Binary { op, right, .. },
            ..
        } => {
            assert_eq!(*op, BinaryOp::Add);
            assert!(matches!(
                right.as_ref(),
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            ));
        }
        other => panic!("expected binary, got {:?}", other),
    }
}
