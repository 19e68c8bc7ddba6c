//! Execution shell around the interpreter.
//!
//! A `Runtime` owns the global environment a sequence of task requests
//! operates on. It can additionally stack one scoped layer on top of
//! the globals: a copied environment with scope managers entered, used
//! to run code "inside" a `with` block without mutating the globals.
//! While the layer is active, all evaluation targets it.

use std::collections::HashMap;

use crate::parser::ast::{Expr, Program, WithItem};

use super::value::Value;
use super::{enter_manager, exit_manager, Interpreter, RuntimeError};

/// A scoped layer: a derived environment plus the managers that were
/// entered to build it, kept in entry order for teardown.
struct ScopedLayer {
    env: HashMap<String, Value>,
    managers: Vec<Value>,
}

/// The environment and output state behind a task-serving loop.
pub struct Runtime {
    globals: HashMap<String, Value>,
    scoped: Option<ScopedLayer>,
    output: String,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_globals(HashMap::new())
    }

    /// A runtime starting from an existing environment, used for
    /// isolated-copy task execution
    pub fn with_globals(globals: HashMap<String, Value>) -> Self {
        Self {
            globals,
            scoped: None,
            output: String::new(),
        }
    }

    /// The environment tasks currently see (the scoped layer when one
    /// is active, the globals otherwise)
    pub fn env(&self) -> &HashMap<String, Value> {
        match &self.scoped {
            Some(layer) => &layer.env,
            None => &self.globals,
        }
    }

    fn env_mut(&mut self) -> &mut HashMap<String, Value> {
        match &mut self.scoped {
            Some(layer) => &mut layer.env,
            None => &mut self.globals,
        }
    }

    /// Look up a name in the active environment
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.env().get(name)
    }

    /// Bind a name in the active environment
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.env_mut().insert(name.into(), value);
    }

    /// Remove a name from the active environment
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.env_mut().remove(name)
    }

    /// All names bound in the active environment, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.env().keys().cloned().collect();
        names.sort();
        names
    }

    /// Run a whole program against the active environment, capturing
    /// anything it prints
    pub fn run_program(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let base = std::mem::take(self.env_mut());
        let mut interp = Interpreter::with_base(base);
        let result = interp.exec_program(program);
        let (base, output) = interp.finish();
        *self.env_mut() = base;
        self.output.push_str(&output);
        result
    }

    /// Evaluate a single expression against the active environment
    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let base = std::mem::take(self.env_mut());
        let mut interp = Interpreter::with_base(base);
        let result = interp.eval_expr(expr);
        let (base, output) = interp.finish();
        *self.env_mut() = base;
        self.output.push_str(&output);
        result
    }

    /// Call a callable value with already-evaluated arguments
    pub fn call(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let base = std::mem::take(self.env_mut());
        let mut interp = Interpreter::with_base(base);
        let result = interp.call_value(callee, args, kwargs);
        let (base, output) = interp.finish();
        *self.env_mut() = base;
        self.output.push_str(&output);
        result
    }

    /// Take the output captured since the last call
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Whether a scoped layer is currently active
    pub fn has_scoped_layer(&self) -> bool {
        self.scoped.is_some()
    }

    /// Build and activate a scoped layer: copy the globals, evaluate
    /// each item's manager expression in the copy, enter the managers
    /// and bind their payloads. On failure nothing is activated and
    /// the managers entered so far are exited again.
    pub fn set_up_scoped(&mut self, items: &[WithItem]) -> Result<(), RuntimeError> {
        if self.scoped.is_some() {
            return Err(RuntimeError::new(
                "E4017",
                "a scoped layer is already active",
            ));
        }

        let mut interp = Interpreter::with_base(self.globals.clone());
        let mut managers = Vec::new();
        let mut failure = None;
        for item in items {
            match set_up_item(&mut interp, item) {
                Ok(manager) => managers.push(manager),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let (env, output) = interp.finish();
        self.output.push_str(&output);

        if let Some(e) = failure {
            for manager in &managers {
                let _ = exit_manager(manager);
            }
            return Err(e);
        }

        self.scoped = Some(ScopedLayer { env, managers });
        Ok(())
    }

    /// Exit the active scoped layer. Managers are exited in the order
    /// they were entered; if any exit fails the last failure is
    /// reported, but the layer is dropped either way.
    pub fn tear_down_scoped(&mut self) -> Result<(), RuntimeError> {
        let layer = match self.scoped.take() {
            Some(layer) => layer,
            None => {
                return Err(RuntimeError::new("E4018", "no scoped layer is active"));
            }
        };

        let mut last_error = None;
        for manager in &layer.managers {
            if let Err(e) = exit_manager(manager) {
                last_error = Some(e);
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn set_up_item(interp: &mut Interpreter, item: &WithItem) -> Result<Value, RuntimeError> {
    let manager = interp.eval_expr(&item.context_expr)?;
    let payload = enter_manager(&manager)?;
    bind_payload(interp, &item.optional_vars, payload)?;
    Ok(manager)
}

fn bind_payload(
    interp: &mut Interpreter,
    names: &[String],
    payload: Value,
) -> Result<(), RuntimeError> {
    match names {
        [] => Ok(()),
        [single] => {
            interp.bind_in_base(single.clone(), payload);
            Ok(())
        }
        many => match payload {
            Value::List(items) if items.len() == many.len() => {
                for (name, item) in many.iter().zip(items) {
                    interp.bind_in_base(name.clone(), item);
                }
                Ok(())
            }
            other => Err(RuntimeError::type_mismatch(
                "list of matching length",
                other.type_name(),
            )),
        },
    }
}
