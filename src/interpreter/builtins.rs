//! Built-in functions and methods of the exercise language.

use serde::{Deserialize, Serialize};

use super::error::RuntimeError;
use super::value::{format_value, ParamSpec, Value};

/// Built-in functions, addressable by name from any environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
    Print,
    Len,
    Str,
    Sum,
    Range,
    Columns,
    Frame,
    Open,
    Guard,
}

impl Builtin {
    /// Look up a builtin by name
    pub fn lookup(name: &str) -> Option<Builtin> {
        match name {
            "print" => Some(Builtin::Print),
            "len" => Some(Builtin::Len),
            "str" => Some(Builtin::Str),
            "sum" => Some(Builtin::Sum),
            "range" => Some(Builtin::Range),
            "columns" => Some(Builtin::Columns),
            "frame" => Some(Builtin::Frame),
            "open" => Some(Builtin::Open),
            "guard" => Some(Builtin::Guard),
            _ => None,
        }
    }

    /// The builtin's source-level name
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Sum => "sum",
            Builtin::Range => "range",
            Builtin::Columns => "columns",
            Builtin::Frame => "frame",
            Builtin::Open => "open",
            Builtin::Guard => "guard",
        }
    }

    /// Formal parameters, for runtime signature introspection
    pub fn params(&self) -> Vec<ParamSpec> {
        let spec = |name: &str| ParamSpec {
            name: name.to_string(),
            default: None,
        };
        let opt = |name: &str, default: Value| ParamSpec {
            name: name.to_string(),
            default: Some(default),
        };
        match self {
            Builtin::Print => vec![spec("value"), opt("sep", Value::Str(" ".to_string()))],
            Builtin::Len => vec![spec("value")],
            Builtin::Str => vec![spec("value")],
            Builtin::Sum => vec![spec("values")],
            Builtin::Range => vec![spec("start"), opt("stop", Value::None)],
            Builtin::Columns => vec![spec("frame")],
            Builtin::Frame => Vec::new(),
            Builtin::Open => vec![spec("path")],
            Builtin::Guard => vec![spec("value"), opt("fail", Value::Bool(false))],
        }
    }
}

/// Invoke a builtin. `output` is the interpreter's captured stdout.
pub fn call_builtin(
    builtin: Builtin,
    args: &[Value],
    kwargs: &[(String, Value)],
    output: &mut String,
) -> Result<Value, RuntimeError> {
    match builtin {
        Builtin::Print => {
            let sep = match kwarg(kwargs, "sep") {
                Some(Value::Str(s)) => s.clone(),
                Some(other) => {
                    return Err(RuntimeError::type_mismatch("str", other.type_name()))
                }
                None => " ".to_string(),
            };
            let line: Vec<String> = args.iter().map(format_value).collect();
            output.push_str(&line.join(&sep));
            output.push('\n');
            Ok(Value::None)
        }
        Builtin::Len => {
            check_arity(args, 1)?;
            let len = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Dict(entries) => entries.len(),
                Value::Frame { columns } => {
                    columns.first().map(|(_, cells)| cells.len()).unwrap_or(0)
                }
                other => return Err(RuntimeError::type_mismatch("collection", other.type_name())),
            };
            Ok(Value::Int(len as i64))
        }
        Builtin::Str => {
            check_arity(args, 1)?;
            Ok(Value::Str(format_value(&args[0])))
        }
        Builtin::Sum => {
            check_arity(args, 1)?;
            match &args[0] {
                Value::List(items) => {
                    let mut int_total = 0i64;
                    let mut float_total = 0f64;
                    let mut is_float = false;
                    for item in items {
                        match item {
                            Value::Int(n) => {
                                int_total = int_total
                                    .checked_add(*n)
                                    .ok_or_else(RuntimeError::integer_overflow)?;
                                float_total += *n as f64;
                            }
                            Value::Float(f) => {
                                is_float = true;
                                float_total += f;
                            }
                            other => {
                                return Err(RuntimeError::type_mismatch(
                                    "number",
                                    other.type_name(),
                                ))
                            }
                        }
                    }
                    if is_float {
                        Ok(Value::Float(float_total))
                    } else {
                        Ok(Value::Int(int_total))
                    }
                }
                other => Err(RuntimeError::type_mismatch("list", other.type_name())),
            }
        }
        Builtin::Range => {
            let (start, stop) = match args {
                [Value::Int(stop)] => (0, *stop),
                [Value::Int(start), Value::Int(stop)] => (*start, *stop),
                _ => return Err(RuntimeError::type_mismatch("int", "arguments")),
            };
            Ok(Value::List((start..stop).map(Value::Int).collect()))
        }
        Builtin::Columns => {
            check_arity(args, 1)?;
            match &args[0] {
                Value::Frame { columns } => Ok(Value::List(
                    columns
                        .iter()
                        .map(|(name, _)| Value::Str(name.clone()))
                        .collect(),
                )),
                other => Err(RuntimeError::type_mismatch("frame", other.type_name())),
            }
        }
        Builtin::Frame => {
            // columns come in as keyword arguments: frame(a=[1], b=[2])
            let mut columns = Vec::new();
            for (name, value) in kwargs {
                match value {
                    Value::List(cells) => columns.push((name.clone(), cells.clone())),
                    other => {
                        return Err(RuntimeError::type_mismatch("list", other.type_name()))
                    }
                }
            }
            Ok(Value::Frame { columns })
        }
        Builtin::Open => {
            check_arity(args, 1)?;
            let path = match &args[0] {
                Value::Str(s) => s,
                other => return Err(RuntimeError::type_mismatch("str", other.type_name())),
            };
            let content = std::fs::read_to_string(path).map_err(|e| {
                RuntimeError::new("E4013", format!("cannot open {}: {}", path, e))
            })?;
            Ok(Value::Manager {
                payload: Box::new(Value::Str(content)),
                fail_on_exit: false,
            })
        }
        Builtin::Guard => {
            check_arity(args, 1)?;
            let fail_on_exit = match kwarg(kwargs, "fail") {
                Some(Value::Bool(b)) => *b,
                Some(other) => {
                    return Err(RuntimeError::type_mismatch("bool", other.type_name()))
                }
                None => false,
            };
            Ok(Value::Manager {
                payload: Box::new(args[0].clone()),
                fail_on_exit,
            })
        }
    }
}

/// Invoke a method on a receiver value.
pub fn call_method(
    receiver: &Value,
    method: &str,
    args: &[Value],
    _kwargs: &[(String, Value)],
) -> Result<Value, RuntimeError> {
    match (receiver, method) {
        (Value::Dict(entries), "keys") => {
            check_arity(args, 0)?;
            Ok(Value::List(entries.iter().map(|(k, _)| k.clone()).collect()))
        }
        (Value::Str(s), "upper") => {
            check_arity(args, 0)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        (Value::Str(s), "lower") => {
            check_arity(args, 0)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        (Value::Frame { columns }, "head") => {
            let n = match args {
                [] => 5,
                [Value::Int(n)] => *n.max(&0) as usize,
                _ => return Err(RuntimeError::type_mismatch("int", "arguments")),
            };
            Ok(Value::Frame {
                columns: columns
                    .iter()
                    .map(|(name, cells)| (name.clone(), cells.iter().take(n).cloned().collect()))
                    .collect(),
            })
        }
        _ => Err(RuntimeError::unknown_method(
            receiver.short_type_name(),
            method,
        )),
    }
}

fn kwarg<'a>(kwargs: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    kwargs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

fn check_arity(args: &[Value], expected: usize) -> Result<(), RuntimeError> {
    if args.len() != expected {
        Err(RuntimeError::arity_mismatch(expected, args.len()))
    } else {
        Ok(())
    }
}
