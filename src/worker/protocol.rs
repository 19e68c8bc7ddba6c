//! The task protocol: serializable requests executed inside a worker
//! against its live runtime environment.
//!
//! Every task answers with a `TaskOutcome`, never a raised error.
//! Failures caused by the code under inspection collapse to the
//! variant's failure sentinel (`None`, `Bool(false)`); failures of the
//! checking machinery itself surface as `InternalError` so they stay
//! diagnosable instead of masquerading as learner results.

use serde::{Deserialize, Serialize};

use crate::check::converters::{generic_representation, Converter};
use crate::check::signature::Signature;
use crate::interpreter::value::{format_value, values_equal, Value};
use crate::interpreter::Runtime;
use crate::parser::ast::{Expr, Program, WithItem};

/// A request executed inside a worker process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    /// Existence check for a binding
    IsDefined { name: String },
    /// Type check against a qualified or unqualified type name
    IsInstance { name: String, type_name: String },
    /// Enumerate the keys of a mapping-like value
    GetKeys { name: String },
    /// Enumerate the column names of a table-like value
    GetColumns { name: String },
    /// Key membership check
    HasKey { name: String, key: Value },
    /// Project the value at a key and stage it under a temp name for
    /// later representation extraction
    GetValue {
        name: String,
        key: Value,
        temp_name: String,
    },
    /// Generic byte serialization of a staged value
    GetStream { name: String },
    /// Qualified runtime type name of a value
    GetClass { name: String },
    /// Apply a pre-parsed converter to a staged value and serialize
    /// the converted result
    Convert { name: String, converter: Converter },
    /// Evaluate a parsed expression against the live environment,
    /// binding the result to a temp name
    EvalExpr { expr: Expr, temp_name: String },
    /// Evaluate an expression, reporting the error it raises (if any)
    /// as data
    EvalError { expr: Expr },
    /// Runtime introspection of a callable's formal parameters
    GetSignature { name: String },
    /// Run a code unit against an isolated copy of the environment
    /// and capture its trimmed stdout
    GetOutput {
        program: Program,
        #[serde(default)]
        setup: Option<Program>,
        #[serde(default)]
        extra: Vec<(String, Value)>,
    },
    /// Evaluate an expression against an isolated copy of the
    /// environment and return its string form
    GetResult { expr: Expr },
    /// Run a code unit against an isolated copy of the environment,
    /// then report the string form of a target name's value
    RunStoreResult { program: Program, name: String },
    /// Invoke a named callable; return its result's string form
    CallResult {
        name: String,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    },
    /// Invoke a named callable; return its captured stdout
    CallOutput {
        name: String,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    },
    /// Invoke a named callable; return the error it raised, as data
    CallError {
        name: String,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    },
    /// Enter a list of scope managers, activating a nested environment
    /// layer for all subsequent tasks
    SetUpEnv { items: Vec<WithItem> },
    /// Exit the active layer's managers in recorded order, aggregating
    /// exit failures
    TearDownEnv,
    /// Run the main program against the live environment, capturing
    /// output and top-level failure
    RunCode { program: Program },
    /// All names bound in the active environment
    ListNames,
    /// A single binding by name
    GetOption { name: String },
    /// Answer, then stop the event loop
    Shutdown,
}

/// The result of one task. `None` is the generic failure sentinel;
/// `Undefined` means a target name was never bound, kept distinct from
/// both `None` and any real string result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum TaskOutcome {
    None,
    Bool(bool),
    Str(String),
    Names(Vec<String>),
    Value(Value),
    Stream(Vec<u8>),
    Signature(Signature),
    Undefined,
    /// An error raised by inspected code, carried as data
    Error(String),
    /// Output and top-level failure of a full program run
    RunReport {
        output: String,
        error: Option<String>,
    },
    /// A defect in the checking machinery itself
    InternalError(String),
    /// Acknowledgement of a shutdown request
    Terminating,
}

impl TaskOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::None | TaskOutcome::InternalError(_))
    }
}

impl Task {
    /// Execute against the worker's runtime. Learner-induced failures
    /// become sentinels here; this function does not panic for them.
    pub fn execute(self, runtime: &mut Runtime) -> TaskOutcome {
        match self {
            Task::IsDefined { name } => TaskOutcome::Bool(runtime.get(&name).is_some()),

            Task::IsInstance { name, type_name } => match runtime.get(&name) {
                Some(value) => TaskOutcome::Bool(
                    value.type_name() == type_name || value.short_type_name() == type_name,
                ),
                None => TaskOutcome::Bool(false),
            },

            Task::GetKeys { name } => match runtime.get(&name) {
                Some(Value::Dict(entries)) => TaskOutcome::Value(Value::List(
                    entries.iter().map(|(k, _)| k.clone()).collect(),
                )),
                _ => TaskOutcome::None,
            },

            Task::GetColumns { name } => match runtime.get(&name) {
                Some(Value::Frame { columns }) => TaskOutcome::Value(Value::List(
                    columns
                        .iter()
                        .map(|(name, _)| Value::Str(name.clone()))
                        .collect(),
                )),
                _ => TaskOutcome::None,
            },

            Task::HasKey { name, key } => match runtime.get(&name) {
                Some(Value::Dict(entries)) => {
                    TaskOutcome::Bool(entries.iter().any(|(k, _)| values_equal(k, &key)))
                }
                Some(Value::Frame { columns }) => match &key {
                    Value::Str(column) => {
                        TaskOutcome::Bool(columns.iter().any(|(n, _)| n == column))
                    }
                    _ => TaskOutcome::Bool(false),
                },
                _ => TaskOutcome::Bool(false),
            },

            Task::GetValue {
                name,
                key,
                temp_name,
            } => {
                let projected = match runtime.get(&name) {
                    Some(Value::Dict(entries)) => entries
                        .iter()
                        .find(|(k, _)| values_equal(k, &key))
                        .map(|(_, v)| v.clone()),
                    Some(Value::Frame { columns }) => match &key {
                        Value::Str(column) => columns
                            .iter()
                            .find(|(n, _)| n == column)
                            .map(|(_, cells)| Value::List(cells.clone())),
                        _ => None,
                    },
                    _ => None,
                };
                match projected {
                    Some(value) => {
                        runtime.set(temp_name, value.clone());
                        TaskOutcome::Value(value)
                    }
                    None => TaskOutcome::None,
                }
            }

            Task::GetStream { name } => match runtime.get(&name) {
                Some(value) => match generic_representation(value) {
                    Some(bytes) => TaskOutcome::Stream(bytes),
                    None => TaskOutcome::None,
                },
                None => TaskOutcome::None,
            },

            Task::GetClass { name } => match runtime.get(&name) {
                Some(value) => TaskOutcome::Str(value.type_name().to_string()),
                None => TaskOutcome::None,
            },

            Task::Convert { name, converter } => {
                let value = match runtime.get(&name) {
                    Some(value) => value.clone(),
                    None => return TaskOutcome::None,
                };
                let mut scratch = Runtime::with_globals(runtime.env().clone());
                scratch.set(converter.param.clone(), value);
                match scratch.eval_expr(&converter.body) {
                    Ok(converted) => match generic_representation(&converted) {
                        Some(bytes) => TaskOutcome::Stream(bytes),
                        None => TaskOutcome::None,
                    },
                    Err(_) => TaskOutcome::None,
                }
            }

            Task::EvalExpr { expr, temp_name } => match runtime.eval_expr(&expr) {
                Ok(value) => {
                    runtime.set(temp_name, value.clone());
                    TaskOutcome::Value(value)
                }
                Err(_) => TaskOutcome::None,
            },

            Task::EvalError { expr } => {
                let mut scratch = Runtime::with_globals(runtime.env().clone());
                match scratch.eval_expr(&expr) {
                    Ok(_) => TaskOutcome::None,
                    Err(e) => TaskOutcome::Error(e.to_string()),
                }
            }

            Task::GetSignature { name } => match runtime.get(&name) {
                Some(Value::Closure {
                    name: fn_name,
                    params,
                    ..
                }) => {
                    let display = fn_name.clone().unwrap_or_else(|| name.clone());
                    TaskOutcome::Signature(Signature::from_params(&display, params))
                }
                Some(Value::Builtin(builtin)) => TaskOutcome::Signature(Signature::from_params(
                    builtin.name(),
                    &builtin.params(),
                )),
                _ => TaskOutcome::None,
            },

            Task::GetOutput {
                program,
                setup,
                extra,
            } => {
                let mut scratch = Runtime::with_globals(runtime.env().clone());
                for (name, value) in extra {
                    scratch.set(name, value);
                }
                if let Some(setup) = setup {
                    if scratch.run_program(&setup).is_err() {
                        return TaskOutcome::None;
                    }
                    scratch.take_output();
                }
                match scratch.run_program(&program) {
                    Ok(()) => TaskOutcome::Str(scratch.take_output().trim().to_string()),
                    Err(_) => TaskOutcome::None,
                }
            }

            Task::GetResult { expr } => {
                let mut scratch = Runtime::with_globals(runtime.env().clone());
                match scratch.eval_expr(&expr) {
                    Ok(value) => TaskOutcome::Str(format_value(&value)),
                    Err(_) => TaskOutcome::None,
                }
            }

            Task::RunStoreResult { program, name } => {
                let mut scratch = Runtime::with_globals(runtime.env().clone());
                match scratch.run_program(&program) {
                    Ok(()) => match scratch.get(&name) {
                        Some(value) => TaskOutcome::Str(format_value(value)),
                        None => TaskOutcome::Undefined,
                    },
                    Err(_) => TaskOutcome::None,
                }
            }

            Task::CallResult { name, args, kwargs } => {
                match call_named(runtime, &name, args, kwargs) {
                    Ok((value, _)) => TaskOutcome::Str(format_value(&value)),
                    Err(_) => TaskOutcome::None,
                }
            }

            Task::CallOutput { name, args, kwargs } => {
                match call_named(runtime, &name, args, kwargs) {
                    Ok((_, output)) => TaskOutcome::Str(output.trim().to_string()),
                    Err(_) => TaskOutcome::None,
                }
            }

            Task::CallError { name, args, kwargs } => {
                match call_named(runtime, &name, args, kwargs) {
                    Ok(_) => TaskOutcome::None,
                    Err(e) => TaskOutcome::Error(e.to_string()),
                }
            }

            Task::SetUpEnv { items } => match runtime.set_up_scoped(&items) {
                Ok(()) => TaskOutcome::Bool(true),
                Err(e) => TaskOutcome::Error(e.to_string()),
            },

            Task::TearDownEnv => match runtime.tear_down_scoped() {
                Ok(()) => TaskOutcome::None,
                Err(e) => TaskOutcome::Error(e.to_string()),
            },

            Task::RunCode { program } => {
                let error = runtime.run_program(&program).err().map(|e| e.to_string());
                TaskOutcome::RunReport {
                    output: runtime.take_output(),
                    error,
                }
            }

            Task::ListNames => TaskOutcome::Names(runtime.names()),

            Task::GetOption { name } => match runtime.get(&name) {
                Some(value) => TaskOutcome::Value(value.clone()),
                None => TaskOutcome::None,
            },

            Task::Shutdown => TaskOutcome::Terminating,
        }
    }
}

/// Invoke a callable bound under `name` in an isolated copy of the
/// environment, returning the result and the output it produced.
fn call_named(
    runtime: &Runtime,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<(Value, String), crate::interpreter::RuntimeError> {
    let callee = runtime
        .get(name)
        .cloned()
        .ok_or_else(|| crate::interpreter::RuntimeError::undefined_variable(name))?;
    let mut scratch = Runtime::with_globals(runtime.env().clone());
    let value = scratch.call(callee, args, kwargs)?;
    Ok((value, scratch.take_output()))
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
