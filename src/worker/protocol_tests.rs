use super::*;
use crate::interpreter::{Runtime, Value};
use crate::parser;
use pretty_assertions::assert_eq;

fn runtime_with(source: &str) -> Runtime {
    let parsed = parser::parse(source, "test").unwrap();
    let mut runtime = Runtime::new();
    runtime.run_program(&parsed.program).unwrap();
    runtime.take_output();
    runtime
}

fn program(source: &str) -> crate::parser::ast::Program {
    (*parser::parse(source, "snippet").unwrap().program).clone()
}

fn expr(source: &str) -> crate::parser::ast::Expr {
    match &parser::parse(&format!("{}\n", source), "snippet").unwrap().program.body[0] {
        crate::parser::ast::Stmt::Expr { expr, .. } => expr.clone(),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn is_defined_answers_true_and_false() {
    let mut rt = runtime_with("a = 1\n");
    assert!(matches!(
        Task::IsDefined { name: "a".to_string() }.execute(&mut rt),
        TaskOutcome::Bool(true)
    ));
    assert!(matches!(
        Task::IsDefined { name: "b".to_string() }.execute(&mut rt),
        TaskOutcome::Bool(false)
    ));
}

#[test]
fn is_instance_accepts_qualified_and_short_names() {
    let mut rt = runtime_with("a = 1\n");
    let qualified = Task::IsInstance {
        name: "a".to_string(),
        type_name: "core.int".to_string(),
    };
    let short = Task::IsInstance {
        name: "a".to_string(),
        type_name: "int".to_string(),
    };
    let wrong = Task::IsInstance {
        name: "a".to_string(),
        type_name: "str".to_string(),
    };
    assert!(matches!(qualified.execute(&mut rt), TaskOutcome::Bool(true)));
    assert!(matches!(short.execute(&mut rt), TaskOutcome::Bool(true)));
    assert!(matches!(wrong.execute(&mut rt), TaskOutcome::Bool(false)));
}

#[test]
fn keys_columns_and_membership() {
    let mut rt = runtime_with("d = {\"a\": 1}\ndf = frame(x=[1], y=[2])\n");
    match (Task::GetKeys { name: "d".to_string() }).execute(&mut rt) {
        TaskOutcome::Value(Value::List(keys)) => assert_eq!(keys.len(), 1),
        other => panic!("unexpected outcome {:?}", other),
    }
    match (Task::GetColumns { name: "df".to_string() }).execute(&mut rt) {
        TaskOutcome::Value(Value::List(cols)) => assert_eq!(cols.len(), 2),
        other => panic!("unexpected outcome {:?}", other),
    }
    let has = Task::HasKey {
        name: "d".to_string(),
        key: Value::Str("a".to_string()),
    };
    assert!(matches!(has.execute(&mut rt), TaskOutcome::Bool(true)));
    let missing = Task::HasKey {
        name: "d".to_string(),
        key: Value::Str("z".to_string()),
    };
    assert!(matches!(missing.execute(&mut rt), TaskOutcome::Bool(false)));
}

#[test]
fn get_keys_on_non_mapping_is_none() {
    let mut rt = runtime_with("a = 1\n");
    assert!(matches!(
        Task::GetKeys { name: "a".to_string() }.execute(&mut rt),
        TaskOutcome::None
    ));
}

#[test]
fn get_value_stages_under_temp_name() {
    let mut rt = runtime_with("d = {\"a\": 41}\n");
    let task = Task::GetValue {
        name: "d".to_string(),
        key: Value::Str("a".to_string()),
        temp_name: "staged".to_string(),
    };
    assert!(matches!(task.execute(&mut rt), TaskOutcome::Value(Value::Int(41))));
    assert!(matches!(rt.get("staged"), Some(Value::Int(41))));
}

#[test]
fn class_stream_and_convert() {
    let mut rt = runtime_with("x = 2.0\n");
    match (Task::GetClass { name: "x".to_string() }).execute(&mut rt) {
        TaskOutcome::Str(name) => assert_eq!(name, "core.float"),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(matches!(
        Task::GetStream { name: "x".to_string() }.execute(&mut rt),
        TaskOutcome::Stream(_)
    ));

    let converter = crate::check::Converter::from_source("v", "str(v)").unwrap();
    match (Task::Convert {
        name: "x".to_string(),
        converter,
    })
    .execute(&mut rt)
    {
        TaskOutcome::Stream(bytes) => {
            let value: Value = serde_json::from_slice(&bytes).unwrap();
            assert!(matches!(value, Value::Str(s) if s == "2.0"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn stream_of_function_is_none() {
    let mut rt = runtime_with("def f():\n    pass\n");
    assert!(matches!(
        Task::GetStream { name: "f".to_string() }.execute(&mut rt),
        TaskOutcome::None
    ));
}

#[test]
fn eval_expr_binds_temp_name_and_swallows_errors() {
    let mut rt = runtime_with("a = 1\n");
    let ok = Task::EvalExpr {
        expr: expr("a + 1"),
        temp_name: "tmp".to_string(),
    };
    assert!(matches!(ok.execute(&mut rt), TaskOutcome::Value(Value::Int(2))));
    assert!(matches!(rt.get("tmp"), Some(Value::Int(2))));

    let bad = Task::EvalExpr {
        expr: expr("missing + 1"),
        temp_name: "tmp2".to_string(),
    };
    assert!(matches!(bad.execute(&mut rt), TaskOutcome::None));
    assert!(rt.get("tmp2").is_none());
}

#[test]
fn eval_error_reports_error_as_data() {
    let mut rt = runtime_with("a = 1\n");
    match (Task::EvalError { expr: expr("1 / 0") }).execute(&mut rt) {
        TaskOutcome::Error(message) => assert!(message.contains("division by zero")),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(matches!(
        (Task::EvalError { expr: expr("a") }).execute(&mut rt),
        TaskOutcome::None
    ));
}

#[test]
fn get_signature_introspects_closures_and_builtins() {
    let mut rt = runtime_with("def f(a, b=2):\n    return a\n");
    match (Task::GetSignature { name: "f".to_string() }).execute(&mut rt) {
        TaskOutcome::Signature(sig) => {
            assert_eq!(sig.param_names(), vec!["a", "b"]);
            assert_eq!(sig.params[1].default.as_deref(), Some("2"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    rt.set("p", Value::Builtin(crate::interpreter::Builtin::Print));
    match (Task::GetSignature { name: "p".to_string() }).execute(&mut rt) {
        TaskOutcome::Signature(sig) => assert_eq!(sig.name, "print"),
        other => panic!("unexpected outcome {:?}", other),
    }

    assert!(matches!(
        Task::GetSignature { name: "nope".to_string() }.execute(&mut rt),
        TaskOutcome::None
    ));
}

#[test]
fn get_output_runs_in_an_isolated_copy() {
    let mut rt = runtime_with("a = 1\n");
    let task = Task::GetOutput {
        program: program("a = a + 1\nprint(a)\n"),
        setup: None,
        extra: Vec::new(),
    };
    match task.execute(&mut rt) {
        TaskOutcome::Str(output) => assert_eq!(output, "2"),
        other => panic!("unexpected outcome {:?}", other),
    }
    // the live environment is untouched
    assert!(matches!(rt.get("a"), Some(Value::Int(1))));
}

#[test]
fn get_output_with_setup_and_extra_bindings() {
    let mut rt = Runtime::new();
    let task = Task::GetOutput {
        program: program("print(base + extra)\n"),
        setup: Some(program("base = 10\n")),
        extra: vec![("extra".to_string(), Value::Int(5))],
    };
    match task.execute(&mut rt) {
        TaskOutcome::Str(output) => assert_eq!(output, "15"),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn run_store_result_is_tri_state() {
    let mut rt = Runtime::new();
    let bound = Task::RunStoreResult {
        program: program("x = 5\n"),
        name: "x".to_string(),
    };
    match bound.execute(&mut rt) {
        TaskOutcome::Str(s) => assert_eq!(s, "5"),
        other => panic!("unexpected outcome {:?}", other),
    }

    let unbound = Task::RunStoreResult {
        program: program("y = 1\n"),
        name: "x".to_string(),
    };
    assert!(matches!(unbound.execute(&mut rt), TaskOutcome::Undefined));

    let raising = Task::RunStoreResult {
        program: program("x = 1 / 0\n"),
        name: "x".to_string(),
    };
    assert!(matches!(raising.execute(&mut rt), TaskOutcome::None));
}

#[test]
fn call_variants_capture_result_output_and_error() {
    let mut rt = runtime_with(concat!(
        "def shout(word):\n",
        "    print(word)\n",
        "    return word.upper()\n",
        "def boom():\n",
        "    return 1 / 0\n",
    ));

    let result = Task::CallResult {
        name: "shout".to_string(),
        args: vec![Value::Str("hi".to_string())],
        kwargs: Vec::new(),
    };
    match result.execute(&mut rt) {
        TaskOutcome::Str(s) => assert_eq!(s, "HI"),
        other => panic!("unexpected outcome {:?}", other),
    }

    let output = Task::CallOutput {
        name: "shout".to_string(),
        args: vec![Value::Str("hi".to_string())],
        kwargs: Vec::new(),
    };
    match output.execute(&mut rt) {
        TaskOutcome::Str(s) => assert_eq!(s, "hi"),
        other => panic!("unexpected outcome {:?}", other),
    }

    let error = Task::CallError {
        name: "boom".to_string(),
        args: Vec::new(),
        kwargs: Vec::new(),
    };
    match error.execute(&mut rt) {
        TaskOutcome::Error(message) => assert!(message.contains("division by zero")),
        other => panic!("unexpected outcome {:?}", other),
    }

    // no error occurred: the error variant answers None
    let no_error = Task::CallError {
        name: "shout".to_string(),
        args: vec![Value::Str("ok".to_string())],
        kwargs: Vec::new(),
    };
    assert!(matches!(no_error.execute(&mut rt), TaskOutcome::None));

    let failing_result = Task::CallResult {
        name: "boom".to_string(),
        args: Vec::new(),
        kwargs: Vec::new(),
    };
    assert!(matches!(failing_result.execute(&mut rt), TaskOutcome::None));
}

#[test]
fn scoped_env_set_up_and_torn_down_through_tasks() {
    let mut rt = runtime_with("x = 1\n");
    let items = match &parser::parse("with guard(10) as x:\n    pass\n", "ctx")
        .unwrap()
        .program
        .body[0]
    {
        crate::parser::ast::Stmt::With { items, .. } => items.clone(),
        other => panic!("expected a with statement, got {:?}", other),
    };

    assert!(matches!(
        (Task::SetUpEnv { items }).execute(&mut rt),
        TaskOutcome::Bool(true)
    ));
    // subsequent tasks see the nested layer
    match (Task::GetOption { name: "x".to_string() }).execute(&mut rt) {
        TaskOutcome::Value(Value::Int(n)) => assert_eq!(n, 10),
        other => panic!("unexpected outcome {:?}", other),
    }

    assert!(matches!(Task::TearDownEnv.execute(&mut rt), TaskOutcome::None));
    match (Task::GetOption { name: "x".to_string() }).execute(&mut rt) {
        TaskOutcome::Value(Value::Int(n)) => assert_eq!(n, 1),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn tear_down_aggregates_exit_failures_as_data() {
    let mut rt = Runtime::new();
    let items = match &parser::parse("with guard(1, fail=true) as x:\n    pass\n", "ctx")
        .unwrap()
        .program
        .body[0]
    {
        crate::parser::ast::Stmt::With { items, .. } => items.clone(),
        other => panic!("expected a with statement, got {:?}", other),
    };
    (Task::SetUpEnv { items }).execute(&mut rt);
    match Task::TearDownEnv.execute(&mut rt) {
        TaskOutcome::Error(message) => assert!(message.contains("exit failed")),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn run_code_reports_output_and_error_as_data() {
    let mut rt = Runtime::new();
    match (Task::RunCode {
        program: program("print(1)\n"),
    })
    .execute(&mut rt)
    {
        TaskOutcome::RunReport { output, error } => {
            assert_eq!(output, "1\n");
            assert!(error.is_none());
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    match (Task::RunCode {
        program: program("x = 1 / 0\n"),
    })
    .execute(&mut rt)
    {
        TaskOutcome::RunReport { error, .. } => {
            assert!(error.unwrap().contains("division by zero"))
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn list_names_and_get_option() {
    let mut rt = runtime_with("b = 1\na = 2\n");
    match Task::ListNames.execute(&mut rt) {
        TaskOutcome::Names(names) => assert_eq!(names, vec!["a".to_string(), "b".to_string()]),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(matches!(
        Task::GetOption { name: "a".to_string() }.execute(&mut rt),
        TaskOutcome::Value(Value::Int(2))
    ));
    assert!(matches!(
        Task::GetOption { name: "z".to_string() }.execute(&mut rt),
        TaskOutcome::None
    ));
}

#[test]
fn value_outcomes_round_trip_through_json() {
    let values = [
        Value::None,
        Value::Bool(true),
        Value::Int(1),
        Value::Float(2.5),
        Value::Str("a".to_string()),
        Value::List(vec![Value::Int(1), Value::Str("b".to_string())]),
        Value::Dict(vec![(Value::Str("k".to_string()), Value::Int(3))]),
    ];
    for value in values {
        let encoded = serde_json::to_string(&TaskOutcome::Value(value.clone())).unwrap();
        match serde_json::from_str(&encoded).unwrap() {
            TaskOutcome::Value(back) => {
                assert!(crate::interpreter::values_equal(&value, &back))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}

#[test]
fn tasks_round_trip_through_json() {
    let task = Task::EvalExpr {
        expr: expr("a + 1"),
        temp_name: "tmp".to_string(),
    };
    let encoded = serde_json::to_string(&task).unwrap();
    let decoded: Task = serde_json::from_str(&encoded).unwrap();
    assert!(matches!(decoded, Task::EvalExpr { temp_name, .. } if temp_name == "tmp"));

    let outcome = TaskOutcome::RunReport {
        output: "1\n".to_string(),
        error: None,
    };
    let encoded = serde_json::to_string(&outcome).unwrap();
    let decoded: TaskOutcome = serde_json::from_str(&encoded).unwrap();
    assert!(matches!(decoded, TaskOutcome::RunReport { output, .. } if output == "1\n"));
}
