//! Interpreter for the exercise language
//!
//! Executes programs against a flat name->value environment, the same
//! shape the worker process exposes to tasks. Printing goes to an
//! internal buffer so callers can capture a run's standard output.

use std::collections::HashMap;

pub mod builtins;
pub mod error;
pub mod runtime;
pub mod value;

pub use builtins::Builtin;
pub use error::RuntimeError;
pub use runtime::Runtime;
pub use value::{format_value, values_equal, ParamSpec, Value};

use crate::parser::ast::*;

/// Tree-walking evaluator with a scope stack. The bottom scope is the
/// caller's environment and is handed back when evaluation finishes.
pub struct Interpreter {
    scopes: Vec<HashMap<String, Value>>,
    /// Captured standard output
    pub output: String,
}

impl Interpreter {
    /// Create an interpreter whose base scope is the given environment
    pub fn with_base(base: HashMap<String, Value>) -> Self {
        Self {
            scopes: vec![base],
            output: String::new(),
        }
    }

    /// Tear down, returning the (possibly modified) base environment
    /// and the captured output
    pub fn finish(mut self) -> (HashMap<String, Value>, String) {
        let base = self.scopes.drain(..1).next().unwrap_or_default();
        (base, self.output)
    }

    /// Execute a whole program
    pub fn exec_program(&mut self, program: &Program) -> Result<(), RuntimeError> {
        match self.exec_stmts(&program.body) {
            Err(e) if e.is_return() => Err(RuntimeError::new(
                "E4014",
                "return outside of a function",
            )),
            other => other,
        }
    }

    /// Execute a statement list in the current scope
    pub fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                let value = self.eval_expr(value)?;
                self.assign(target, value)
            }
            Stmt::Expr { expr, .. } => {
                self.eval_expr(expr)?;
                Ok(())
            }
            Stmt::FunctionDef {
                name, params, body, ..
            } => {
                let mut specs = Vec::with_capacity(params.len());
                for param in params {
                    let default = match &param.default {
                        Some(expr) => Some(self.eval_expr(expr)?),
                        None => None,
                    };
                    specs.push(ParamSpec {
                        name: param.name.clone(),
                        default,
                    });
                }
                self.define(
                    name.clone(),
                    Value::Closure {
                        name: Some(name.clone()),
                        params: specs,
                        body: body.clone(),
                    },
                );
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                Err(RuntimeError::function_return(value))
            }
            Stmt::If {
                test, body, orelse, ..
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.exec_stmts(body)
                } else {
                    self.exec_stmts(orelse)
                }
            }
            Stmt::While { test, body, .. } => {
                while self.eval_expr(test)?.is_truthy() {
                    self.exec_stmts(body)?;
                }
                Ok(())
            }
            Stmt::For {
                target, iter, body, ..
            } => {
                let iterable = self.eval_expr(iter)?;
                for item in iterate(&iterable)? {
                    self.define(target.clone(), item);
                    self.exec_stmts(body)?;
                }
                Ok(())
            }
            Stmt::With { items, body, .. } => self.exec_with(items, body),
            Stmt::Pass { .. } => Ok(()),
        }
    }

    fn exec_with(&mut self, items: &[WithItem], body: &[Stmt]) -> Result<(), RuntimeError> {
        let mut entered = Vec::new();
        for item in items {
            let manager = self.eval_expr(&item.context_expr)?;
            let payload = enter_manager(&manager)?;
            bind_manager_vars(self, &item.optional_vars, payload)?;
            entered.push(manager);
        }

        let body_result = self.exec_stmts(body);

        // exits always run, in the order the managers were entered
        let mut exit_error = None;
        for manager in &entered {
            if let Err(e) = exit_manager(manager) {
                exit_error = Some(e);
            }
        }

        body_result?;
        match exit_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn assign(&mut self, target: &AssignTarget, value: Value) -> Result<(), RuntimeError> {
        match target {
            AssignTarget::Name { name, .. } => {
                self.define(name.clone(), value);
                Ok(())
            }
            AssignTarget::Subscript {
                value: base, index, ..
            } => {
                let name = match base.as_ref() {
                    Expr::Name { name, .. } => name.clone(),
                    other => {
                        return Err(RuntimeError::new(
                            "E4015",
                            format!(
                                "can only subscript-assign through a name, not {:?}",
                                other.span().start
                            ),
                        ))
                    }
                };
                let index = self.eval_expr(index)?;
                let mut container = self
                    .lookup(&name)
                    .ok_or_else(|| RuntimeError::undefined_variable(&name))?;
                subscript_set(&mut container, &index, value)?;
                self.rebind(&name, container);
                Ok(())
            }
            AssignTarget::Attribute { .. } => Err(RuntimeError::new(
                "E4016",
                "attribute assignment is not supported",
            )),
        }
    }

    /// Evaluate an expression
    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::IntLit { value, .. } => Ok(Value::Int(*value)),
            Expr::FloatLit { value, .. } => Ok(Value::Float(*value)),
            Expr::StrLit { value, .. } => Ok(Value::Str(value.clone())),
            Expr::BoolLit { value, .. } => Ok(Value::Bool(*value)),
            Expr::NoneLit { .. } => Ok(Value::None),
            Expr::Name { name, .. } => self
                .lookup(name)
                .or_else(|| Builtin::lookup(name).map(Value::Builtin))
                .ok_or_else(|| RuntimeError::undefined_variable(name)),
            Expr::Attribute { value, attr, .. } => {
                let receiver = self.eval_expr(value)?;
                attribute(&receiver, attr)
            }
            Expr::Call {
                func, args, kwargs, ..
            } => {
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval_expr(arg)?);
                }
                let mut kwarg_values = Vec::with_capacity(kwargs.len());
                for (name, arg) in kwargs {
                    kwarg_values.push((name.clone(), self.eval_expr(arg)?));
                }

                // method calls dispatch on the receiver's type
                if let Expr::Attribute { value, attr, .. } = func.as_ref() {
                    let receiver = self.eval_expr(value)?;
                    if !matches!(receiver, Value::Closure { .. } | Value::Builtin(_)) {
                        return builtins::call_method(
                            &receiver,
                            attr,
                            &arg_values,
                            &kwarg_values,
                        );
                    }
                }

                let callee = self.eval_expr(func)?;
                self.call_value(callee, arg_values, kwarg_values)
            }
            Expr::Subscript { value, index, .. } => {
                let container = self.eval_expr(value)?;
                let index = self.eval_expr(index)?;
                subscript_get(&container, &index)
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                // short-circuit logic before evaluating the right side
                match op {
                    BinaryOp::And => {
                        let left = self.eval_expr(left)?;
                        if !left.is_truthy() {
                            return Ok(left);
                        }
                        return self.eval_expr(right);
                    }
                    BinaryOp::Or => {
                        let left = self.eval_expr(left)?;
                        if left.is_truthy() {
                            return Ok(left);
                        }
                        return self.eval_expr(right);
                    }
                    _ => {}
                }
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                binary_op(*op, &left, &right)
            }
            Expr::Unary { op, expr, .. } => {
                let value = self.eval_expr(expr)?;
                match op {
                    UnaryOp::Neg => match value {
                        Value::Int(n) => int_result(n.checked_neg()),
                        Value::Float(f) => Ok(Value::Float(-f)),
                        other => Err(RuntimeError::type_mismatch("number", other.type_name())),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
            Expr::ListLit { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item)?);
                }
                Ok(Value::List(values))
            }
            Expr::DictLit { entries, .. } => {
                let mut values = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    values.push((self.eval_expr(key)?, self.eval_expr(value)?));
                }
                Ok(Value::Dict(values))
            }
        }
    }

    /// Call a callable value with evaluated arguments
    pub fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Builtin(builtin) => {
                builtins::call_builtin(builtin, &args, &kwargs, &mut self.output)
            }
            Value::Closure { params, body, .. } => {
                let frame = bind_params(&params, args, kwargs)?;
                self.scopes.push(frame);
                let result = self.exec_stmts(&body);
                self.scopes.pop();
                match result {
                    Ok(()) => Ok(Value::None),
                    Err(e) if e.is_return() => {
                        Ok(e.into_return_value().unwrap_or(Value::None))
                    }
                    Err(e) => Err(e),
                }
            }
            other => Err(RuntimeError::not_callable(other.short_type_name())),
        }
    }

    /// Bind a name in the base scope, bypassing any call frames
    pub(crate) fn bind_in_base(&mut self, name: String, value: Value) {
        if let Some(base) = self.scopes.first_mut() {
            base.insert(name, value);
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Some(value.clone());
            }
        }
        None
    }

    fn define(&mut self, name: String, value: Value) {
        if let Some(top) = self.scopes.last_mut() {
            top.insert(name, value);
        }
    }

    /// Rebind an existing name in the innermost scope that holds it
    fn rebind(&mut self, name: &str, value: Value) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.contains_key(name) {
                scope.insert(name.to_string(), value);
                return;
            }
        }
        self.define(name.to_string(), value);
    }
}

fn bind_params(
    params: &[ParamSpec],
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<HashMap<String, Value>, RuntimeError> {
    if args.len() > params.len() {
        return Err(RuntimeError::arity_mismatch(params.len(), args.len()));
    }

    let mut frame = HashMap::new();
    let mut args = args.into_iter();
    for param in params {
        if let Some(value) = args.next() {
            frame.insert(param.name.clone(), value);
            continue;
        }
        if let Some((_, value)) = kwargs.iter().find(|(name, _)| *name == param.name) {
            frame.insert(param.name.clone(), value.clone());
            continue;
        }
        match &param.default {
            Some(default) => {
                frame.insert(param.name.clone(), default.clone());
            }
            None => return Err(RuntimeError::arity_mismatch(params.len(), frame.len())),
        }
    }

    for (name, _) in &kwargs {
        if !params.iter().any(|p| p.name == *name) {
            return Err(RuntimeError::unexpected_keyword(name));
        }
    }

    Ok(frame)
}

fn bind_manager_vars(
    interp: &mut Interpreter,
    names: &[String],
    payload: Value,
) -> Result<(), RuntimeError> {
    match names {
        [] => Ok(()),
        [single] => {
            interp.define(single.clone(), payload);
            Ok(())
        }
        many => match payload {
            Value::List(items) if items.len() == many.len() => {
                for (name, item) in many.iter().zip(items) {
                    interp.define(name.clone(), item);
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

/// Enter a scope manager, yielding its payload
pub fn enter_manager(value: &Value) -> Result<Value, RuntimeError> {
    match value {
        Value::Manager { payload, .. } => Ok(payload.as_ref().clone()),
        other => Err(RuntimeError::not_a_manager(other.short_type_name())),
    }
}

/// Exit a scope manager
pub fn exit_manager(value: &Value) -> Result<(), RuntimeError> {
    match value {
        Value::Manager { fail_on_exit, .. } => {
            if *fail_on_exit {
                Err(RuntimeError::manager_exit_failed("guard marked to fail"))
            } else {
                Ok(())
            }
        }
        other => Err(RuntimeError::not_a_manager(other.short_type_name())),
    }
}

fn iterate(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::List(items) => Ok(items.clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Dict(entries) => Ok(entries.iter().map(|(k, _)| k.clone()).collect()),
        other => Err(RuntimeError::not_iterable(other.short_type_name())),
    }
}

fn attribute(receiver: &Value, attr: &str) -> Result<Value, RuntimeError> {
    match (receiver, attr) {
        (Value::Frame { columns }, "columns") => Ok(Value::List(
            columns
                .iter()
                .map(|(name, _)| Value::Str(name.clone()))
                .collect(),
        )),
        _ => Err(RuntimeError::unknown_attribute(
            receiver.short_type_name(),
            attr,
        )),
    }
}

fn subscript_get(container: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match (container, index) {
        (Value::List(items), Value::Int(i)) => {
            let idx = normalize_index(*i, items.len())?;
            Ok(items[idx].clone())
        }
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = normalize_index(*i, chars.len())?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        (Value::Dict(entries), key) => entries
            .iter()
            .find(|(k, _)| values_equal(k, key))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| RuntimeError::bad_subscript(format!("missing key {}", format_value(key)))),
        (Value::Frame { columns }, Value::Str(name)) => columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cells)| Value::List(cells.clone()))
            .ok_or_else(|| RuntimeError::bad_subscript(format!("no column {}", name))),
        (container, _) => Err(RuntimeError::bad_subscript(format!(
            "cannot index {}",
            container.short_type_name()
        ))),
    }
}

fn subscript_set(container: &mut Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match (&mut *container, index) {
        (Value::List(items), Value::Int(i)) => {
            let idx = normalize_index(*i, items.len())?;
            items[idx] = value;
            Ok(())
        }
        (Value::Dict(entries), key) => {
            if let Some(slot) = entries.iter_mut().find(|(k, _)| values_equal(k, key)) {
                slot.1 = value;
            } else {
                entries.push((key.clone(), value));
            }
            Ok(())
        }
        (Value::Frame { columns }, Value::Str(name)) => {
            let cells = match value {
                Value::List(cells) => cells,
                other => return Err(RuntimeError::type_mismatch("list", other.type_name())),
            };
            if let Some(slot) = columns.iter_mut().find(|(n, _)| n == name) {
                slot.1 = cells;
            } else {
                columns.push((name.clone(), cells));
            }
            Ok(())
        }
        (container, _) => Err(RuntimeError::bad_subscript(format!(
            "cannot index {}",
            container.short_type_name()
        ))),
    }
}

fn normalize_index(i: i64, len: usize) -> Result<usize, RuntimeError> {
    let idx = if i < 0 { i + len as i64 } else { i };
    if idx < 0 || idx as usize >= len {
        Err(RuntimeError::bad_subscript(format!(
            "index {} out of range for length {}",
            i, len
        )))
    } else {
        Ok(idx as usize)
    }
}

fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    use BinaryOp::*;
    match op {
        Add => match (left, right) {
            (Value::Int(a), Value::Int(b)) => int_result(a.checked_add(*b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            (Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Ok(Value::List(out))
            }
            _ => numeric_op(left, right, |a, b| a + b),
        },
        Sub => match (left, right) {
            (Value::Int(a), Value::Int(b)) => int_result(a.checked_sub(*b)),
            _ => numeric_op(left, right, |a, b| a - b),
        },
        Mul => match (left, right) {
            (Value::Int(a), Value::Int(b)) => int_result(a.checked_mul(*b)),
            _ => numeric_op(left, right, |a, b| a * b),
        },
        Div => match (left, right) {
            (_, Value::Int(0)) => Err(RuntimeError::division_by_zero()),
            (Value::Int(a), Value::Int(b)) => int_result(a.checked_div(*b)),
            _ => {
                let b = as_float(right)?;
                if b == 0.0 {
                    return Err(RuntimeError::division_by_zero());
                }
                Ok(Value::Float(as_float(left)? / b))
            }
        },
        Mod => match (left, right) {
            (_, Value::Int(0)) => Err(RuntimeError::division_by_zero()),
            (Value::Int(a), Value::Int(b)) => int_result(a.checked_rem_euclid(*b)),
            _ => Err(RuntimeError::type_mismatch("int", left.type_name())),
        },
        Eq => Ok(Value::Bool(values_equal(left, right))),
        Ne => Ok(Value::Bool(!values_equal(left, right))),
        Lt | Le | Gt | Ge => {
            let ordering = compare(left, right)?;
            let result = match op {
                Lt => ordering == std::cmp::Ordering::Less,
                Le => ordering != std::cmp::Ordering::Greater,
                Gt => ordering == std::cmp::Ordering::Greater,
                Ge => ordering != std::cmp::Ordering::Less,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        And | Or => unreachable!("logical operators are short-circuited by the caller"),
    }
}

/// Learner operands can overflow i64; that is a runtime error like
/// division by zero, never a wrap or a panic
fn int_result(result: Option<i64>) -> Result<Value, RuntimeError> {
    result
        .map(Value::Int)
        .ok_or_else(RuntimeError::integer_overflow)
}

fn numeric_op(
    left: &Value,
    right: &Value,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    Ok(Value::Float(f(as_float(left)?, as_float(right)?)))
}

fn as_float(value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        other => Err(RuntimeError::type_mismatch("number", other.type_name())),
    }
}

fn compare(left: &Value, right: &Value) -> Result<std::cmp::Ordering, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => {
            let (a, b) = (as_float(left)?, as_float(right)?);
            a.partial_cmp(&b)
                .ok_or_else(|| RuntimeError::type_mismatch("comparable values", "nan"))
        }
    }
}
