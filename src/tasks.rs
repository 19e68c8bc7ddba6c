//! Caller-side task wrappers.
//!
//! Each function submits one task (or a short fixed sequence) to an
//! execution host and decodes the outcome. Failure sentinels coming
//! back from the worker stay data (`None`, `false`); only broken
//! channels and machinery defects become errors.

use std::collections::HashMap;

use crate::check::converters::ConverterTable;
use crate::check::signature::{generic_method_key, Signature};
use crate::check::CheckError;
use crate::interpreter::Value;
use crate::parser::ast::{Expr, Program, WithItem};
use crate::worker::{ProcessHandle, Task, TaskOutcome};

/// Tri-state outcome of capturing a name after a snippet run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    /// The name was bound; its value's string form
    Value(String),
    /// The snippet ran but never bound the name
    Undefined,
    /// The snippet failed to run
    Failed,
}

/// Submit one task, surfacing machinery defects as errors
pub fn execute(host: &ProcessHandle, task: Task) -> Result<TaskOutcome, CheckError> {
    let outcome = host
        .try_borrow_mut()
        .map_err(|_| CheckError::Internal("execution host is already in use".to_string()))?
        .execute_task(&task)?;
    match outcome {
        TaskOutcome::InternalError(message) => Err(CheckError::Internal(message)),
        outcome => Ok(outcome),
    }
}

pub fn is_defined(host: &ProcessHandle, name: &str) -> Result<bool, CheckError> {
    expect_bool(execute(
        host,
        Task::IsDefined {
            name: name.to_string(),
        },
    )?)
}

pub fn is_instance(
    host: &ProcessHandle,
    name: &str,
    type_name: &str,
) -> Result<bool, CheckError> {
    expect_bool(execute(
        host,
        Task::IsInstance {
            name: name.to_string(),
            type_name: type_name.to_string(),
        },
    )?)
}

pub fn get_keys(host: &ProcessHandle, name: &str) -> Result<Option<Value>, CheckError> {
    expect_value(execute(
        host,
        Task::GetKeys {
            name: name.to_string(),
        },
    )?)
}

pub fn get_columns(host: &ProcessHandle, name: &str) -> Result<Option<Value>, CheckError> {
    expect_value(execute(
        host,
        Task::GetColumns {
            name: name.to_string(),
        },
    )?)
}

pub fn has_key(host: &ProcessHandle, name: &str, key: Value) -> Result<bool, CheckError> {
    expect_bool(execute(
        host,
        Task::HasKey {
            name: name.to_string(),
            key,
        },
    )?)
}

/// Project the value at a key and stage it under `temp_name` so its
/// representation can be extracted afterwards
pub fn get_value(
    host: &ProcessHandle,
    name: &str,
    key: Value,
    temp_name: &str,
) -> Result<Option<Value>, CheckError> {
    expect_value(execute(
        host,
        Task::GetValue {
            name: name.to_string(),
            key,
            temp_name: temp_name.to_string(),
        },
    )?)
}

pub fn get_stream(host: &ProcessHandle, name: &str) -> Result<Option<Vec<u8>>, CheckError> {
    match execute(
        host,
        Task::GetStream {
            name: name.to_string(),
        },
    )? {
        TaskOutcome::Stream(bytes) => Ok(Some(bytes)),
        TaskOutcome::None => Ok(None),
        other => Err(unexpected(other)),
    }
}

/// The two-step representation protocol: ask for the staged value's
/// qualified type name, apply the matching converter if the table has
/// one, otherwise fall back to the generic serialization. `None` means
/// no representation is available, distinct from a falsy value.
pub fn get_representation(
    host: &ProcessHandle,
    name: &str,
    converters: &ConverterTable,
) -> Result<Option<Vec<u8>>, CheckError> {
    let class = match execute(
        host,
        Task::GetClass {
            name: name.to_string(),
        },
    )? {
        TaskOutcome::Str(class) => Some(class),
        TaskOutcome::None => None,
        other => return Err(unexpected(other)),
    };

    if let Some(converter) = class.as_deref().and_then(|c| converters.get(c)) {
        match execute(
            host,
            Task::Convert {
                name: name.to_string(),
                converter: converter.clone(),
            },
        )? {
            TaskOutcome::Stream(bytes) => return Ok(Some(bytes)),
            TaskOutcome::None => {}
            other => return Err(unexpected(other)),
        }
    }

    get_stream(host, name)
}

/// Evaluate an expression in the host, staging the result under
/// `temp_name`
pub fn eval_in_host(
    host: &ProcessHandle,
    expr: Expr,
    temp_name: &str,
) -> Result<Option<Value>, CheckError> {
    expect_value(execute(
        host,
        Task::EvalExpr {
            expr,
            temp_name: temp_name.to_string(),
        },
    )?)
}

/// The error an expression raises, as data; `None` when it evaluates
/// cleanly
pub fn eval_error(host: &ProcessHandle, expr: Expr) -> Result<Option<String>, CheckError> {
    expect_error(execute(host, Task::EvalError { expr })?)
}

/// Resolve a callable's signature. Precedence: the manual table entry
/// for the mapped name, then a generic `type.method` manual entry when
/// the call target is an attribute access, then runtime introspection
/// inside the host.
pub fn get_signature(
    host: &ProcessHandle,
    bound_name: &str,
    mapped_name: &str,
    receiver_type: Option<&str>,
    manual: &HashMap<String, Signature>,
) -> Result<Option<Signature>, CheckError> {
    if let Some(signature) = manual.get(mapped_name) {
        return Ok(Some(signature.clone()));
    }

    if let Some(receiver_type) = receiver_type {
        if let Some(key) = generic_method_key(mapped_name, receiver_type) {
            if let Some(signature) = manual.get(&key) {
                return Ok(Some(signature.clone()));
            }
        }
    }

    match execute(
        host,
        Task::GetSignature {
            name: bound_name.to_string(),
        },
    )? {
        TaskOutcome::Signature(signature) => Ok(Some(signature)),
        TaskOutcome::None => Ok(None),
        other => Err(unexpected(other)),
    }
}

/// Run a code unit against an isolated copy of the environment and
/// capture its trimmed stdout
pub fn get_output(
    host: &ProcessHandle,
    program: Program,
    setup: Option<Program>,
    extra: Vec<(String, Value)>,
) -> Result<Option<String>, CheckError> {
    expect_str(execute(
        host,
        Task::GetOutput {
            program,
            setup,
            extra,
        },
    )?)
}

/// Evaluate an expression against an isolated copy of the environment
/// and return its string form
pub fn get_result(host: &ProcessHandle, expr: Expr) -> Result<Option<String>, CheckError> {
    expect_str(execute(host, Task::GetResult { expr })?)
}

/// Run a snippet in an isolated copy, then capture the target name
pub fn run_store_result(
    host: &ProcessHandle,
    program: Program,
    name: &str,
) -> Result<CaptureResult, CheckError> {
    match execute(
        host,
        Task::RunStoreResult {
            program,
            name: name.to_string(),
        },
    )? {
        TaskOutcome::Str(value) => Ok(CaptureResult::Value(value)),
        TaskOutcome::Undefined => Ok(CaptureResult::Undefined),
        TaskOutcome::None => Ok(CaptureResult::Failed),
        other => Err(unexpected(other)),
    }
}

pub fn call_result(
    host: &ProcessHandle,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Option<String>, CheckError> {
    expect_str(execute(
        host,
        Task::CallResult {
            name: name.to_string(),
            args,
            kwargs,
        },
    )?)
}

pub fn call_output(
    host: &ProcessHandle,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Option<String>, CheckError> {
    expect_str(execute(
        host,
        Task::CallOutput {
            name: name.to_string(),
            args,
            kwargs,
        },
    )?)
}

/// The error a call raises, as data; `None` when no error occurred
pub fn call_error(
    host: &ProcessHandle,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Option<String>, CheckError> {
    expect_error(execute(
        host,
        Task::CallError {
            name: name.to_string(),
            args,
            kwargs,
        },
    )?)
}

/// Activate a nested environment layer by entering scope managers.
/// A failure while entering is reported as data.
pub fn set_up_env(
    host: &ProcessHandle,
    items: Vec<WithItem>,
) -> Result<Option<String>, CheckError> {
    match execute(host, Task::SetUpEnv { items })? {
        TaskOutcome::Bool(true) => Ok(None),
        TaskOutcome::Error(message) => Ok(Some(message)),
        other => Err(unexpected(other)),
    }
}

/// Exit the active layer's managers; the aggregated exit failure, if
/// any, is reported as data
pub fn tear_down_env(host: &ProcessHandle) -> Result<Option<String>, CheckError> {
    match execute(host, Task::TearDownEnv)? {
        TaskOutcome::None => Ok(None),
        TaskOutcome::Error(message) => Ok(Some(message)),
        other => Err(unexpected(other)),
    }
}

/// Run the main program, capturing stdout and top-level failure
pub fn run_code(
    host: &ProcessHandle,
    program: Program,
) -> Result<(String, Option<String>), CheckError> {
    match execute(host, Task::RunCode { program })? {
        TaskOutcome::RunReport { output, error } => Ok((output, error)),
        other => Err(unexpected(other)),
    }
}

pub fn list_names(host: &ProcessHandle) -> Result<Vec<String>, CheckError> {
    match execute(host, Task::ListNames)? {
        TaskOutcome::Names(names) => Ok(names),
        other => Err(unexpected(other)),
    }
}

pub fn get_option(host: &ProcessHandle, name: &str) -> Result<Option<Value>, CheckError> {
    expect_value(execute(
        host,
        Task::GetOption {
            name: name.to_string(),
        },
    )?)
}

fn expect_bool(outcome: TaskOutcome) -> Result<bool, CheckError> {
    match outcome {
        TaskOutcome::Bool(b) => Ok(b),
        other => Err(unexpected(other)),
    }
}

fn expect_value(outcome: TaskOutcome) -> Result<Option<Value>, CheckError> {
    match outcome {
        TaskOutcome::Value(value) => Ok(Some(value)),
        TaskOutcome::None => Ok(None),
        other => Err(unexpected(other)),
    }
}

fn expect_str(outcome: TaskOutcome) -> Result<Option<String>, CheckError> {
    match outcome {
        TaskOutcome::Str(s) => Ok(Some(s)),
        TaskOutcome::None => Ok(None),
        other => Err(unexpected(other)),
    }
}

fn expect_error(outcome: TaskOutcome) -> Result<Option<String>, CheckError> {
    match outcome {
        TaskOutcome::Error(message) => Ok(Some(message)),
        TaskOutcome::None => Ok(None),
        other => Err(unexpected(other)),
    }
}

fn unexpected(outcome: TaskOutcome) -> CheckError {
    CheckError::Internal(format!("unexpected task outcome: {:?}", outcome))
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
