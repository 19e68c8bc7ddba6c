//! Memoized structural analyses over parsed trees.
//!
//! A `Dispatcher` runs read-only visitors on demand and caches each
//! result by (visitor kind, tree identity), so asking twice for the
//! same derived fact never recomputes it. Visitors resolve names
//! through alias mappings established by pre-exercise code, seeded in
//! before the first run.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::Span;
use crate::parser::ast::{Expr, NodeId, Program, Stmt, WithItem};

/// The analyses a dispatcher can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitorKind {
    /// Every call site, with the callee name resolved through aliases
    FunctionCalls,
    /// Every attribute access rendered as a dotted name
    AttributeAccesses,
    /// Every function definition
    FunctionDefs,
}

/// One recorded occurrence of the fact a visitor collects
#[derive(Debug, Clone)]
pub struct FactRecord {
    /// The name after alias resolution ("print" for a call through
    /// `p = print`)
    pub mapped_name: String,
    /// The name as written in the source
    pub source_name: String,
    pub node: NodeId,
    pub span: Span,
}

/// The output of one visitor run over one tree
#[derive(Debug, Default)]
pub struct FactSet {
    pub records: Vec<FactRecord>,
}

impl FactSet {
    /// Records whose resolved name matches
    pub fn named(&self, mapped_name: &str) -> Vec<&FactRecord> {
        self.records
            .iter()
            .filter(|r| r.mapped_name == mapped_name)
            .collect()
    }
}

/// Runs visitors over trees, memoized per (kind, tree identity)
pub struct Dispatcher {
    /// Alias mappings from pre-exercise code, e.g. `p = print`
    seed_mappings: HashMap<String, String>,
    cache: RefCell<HashMap<(VisitorKind, NodeId), Rc<FactSet>>>,
    computations: Cell<usize>,
}

impl Dispatcher {
    pub fn new(seed_mappings: HashMap<String, String>) -> Self {
        Self {
            seed_mappings,
            cache: RefCell::new(HashMap::new()),
            computations: Cell::new(0),
        }
    }

    /// Seed the alias table from a parsed pre-exercise program: every
    /// `alias = name` or `alias = obj.attr` assignment becomes a
    /// mapping from the alias to the dotted target.
    pub fn seed_from_program(program: &Program) -> HashMap<String, String> {
        let mut mappings = HashMap::new();
        for stmt in &program.body {
            if let Stmt::Assign {
                target: crate::parser::ast::AssignTarget::Name { name, .. },
                value,
                ..
            } = stmt
            {
                if let Some(dotted) = value.dotted_name() {
                    mappings.insert(name.clone(), dotted);
                }
            }
        }
        mappings
    }

    /// Derived facts for a tree, computed on first request
    pub fn facts(&self, kind: VisitorKind, program: &Program) -> Rc<FactSet> {
        let key = (kind, program.id);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Rc::clone(cached);
        }

        self.computations.set(self.computations.get() + 1);
        let facts = Rc::new(self.run_visitor(kind, program));
        self.cache.borrow_mut().insert(key, Rc::clone(&facts));
        facts
    }

    /// How many visitor runs have actually happened
    pub fn computations(&self) -> usize {
        self.computations.get()
    }

    fn run_visitor(&self, kind: VisitorKind, program: &Program) -> FactSet {
        let mut facts = FactSet::default();
        for stmt in &program.body {
            self.visit_stmt(kind, stmt, &mut facts);
        }
        facts
    }

    /// Resolve a dotted name's head through the seeded aliases
    fn resolve(&self, dotted: &str) -> String {
        match dotted.split_once('.') {
            Some((head, rest)) => match self.seed_mappings.get(head) {
                Some(target) => format!("{}.{}", target, rest),
                None => dotted.to_string(),
            },
            None => self
                .seed_mappings
                .get(dotted)
                .cloned()
                .unwrap_or_else(|| dotted.to_string()),
        }
    }

    fn visit_stmt(&self, kind: VisitorKind, stmt: &Stmt, facts: &mut FactSet) {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                if let crate::parser::ast::AssignTarget::Attribute { value, .. }
                | crate::parser::ast::AssignTarget::Subscript { value, .. } = target
                {
                    self.visit_expr(kind, value, facts);
                }
                self.visit_expr(kind, value, facts);
            }
            Stmt::Expr { expr, .. } => self.visit_expr(kind, expr, facts),
            Stmt::FunctionDef {
                name, params, body, span, id, ..
            } => {
                if kind == VisitorKind::FunctionDefs {
                    facts.records.push(FactRecord {
                        mapped_name: name.clone(),
                        source_name: name.clone(),
                        node: *id,
                        span: span.clone(),
                    });
                }
                for param in params {
                    if let Some(default) = &param.default {
                        self.visit_expr(kind, default, facts);
                    }
                }
                self.visit_stmts(kind, body, facts);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.visit_expr(kind, value, facts);
                }
            }
            Stmt::If {
                test, body, orelse, ..
            } => {
                self.visit_expr(kind, test, facts);
                self.visit_stmts(kind, body, facts);
                self.visit_stmts(kind, orelse, facts);
            }
            Stmt::While { test, body, .. } => {
                self.visit_expr(kind, test, facts);
                self.visit_stmts(kind, body, facts);
            }
            Stmt::For { iter, body, .. } => {
                self.visit_expr(kind, iter, facts);
                self.visit_stmts(kind, body, facts);
            }
            Stmt::With { items, body, .. } => {
                for WithItem { context_expr, .. } in items {
                    self.visit_expr(kind, context_expr, facts);
                }
                self.visit_stmts(kind, body, facts);
            }
            Stmt::Pass { .. } => {}
        }
    }

    fn visit_stmts(&self, kind: VisitorKind, stmts: &[Stmt], facts: &mut FactSet) {
        for stmt in stmts {
            self.visit_stmt(kind, stmt, facts);
        }
    }

    fn visit_expr(&self, kind: VisitorKind, expr: &Expr, facts: &mut FactSet) {
        match expr {
            Expr::Call {
                func,
                args,
                kwargs,
                span,
                id,
                ..
            } => {
                if kind == VisitorKind::FunctionCalls {
                    if let Some(dotted) = func.dotted_name() {
                        facts.records.push(FactRecord {
                            mapped_name: self.resolve(&dotted),
                            source_name: dotted,
                            node: *id,
                            span: span.clone(),
                        });
                    }
                }
                self.visit_expr(kind, func, facts);
                for arg in args {
                    self.visit_expr(kind, arg, facts);
                }
                for (_, arg) in kwargs {
                    self.visit_expr(kind, arg, facts);
                }
            }
            Expr::Attribute { value, span, id, .. } => {
                if kind == VisitorKind::AttributeAccesses {
                    if let Some(dotted) = expr.dotted_name() {
                        facts.records.push(FactRecord {
                            mapped_name: self.resolve(&dotted),
                            source_name: dotted,
                            node: *id,
                            span: span.clone(),
                        });
                    }
                }
                self.visit_expr(kind, value, facts);
            }
            Expr::Subscript { value, index, .. } => {
                self.visit_expr(kind, value, facts);
                self.visit_expr(kind, index, facts);
            }
            Expr::Binary { left, right, .. } => {
                self.visit_expr(kind, left, facts);
                self.visit_expr(kind, right, facts);
            }
            Expr::Unary { expr, .. } => self.visit_expr(kind, expr, facts),
            Expr::ListLit { items, .. } => {
                for item in items {
                    self.visit_expr(kind, item, facts);
                }
            }
            Expr::DictLit { entries, .. } => {
                for (key, value) in entries {
                    self.visit_expr(kind, key, facts);
                    self.visit_expr(kind, value, facts);
                }
            }
            Expr::IntLit { .. }
            | Expr::FloatLit { .. }
            | Expr::StrLit { .. }
            | Expr::BoolLit { .. }
            | Expr::NoneLit { .. }
            | Expr::Name { .. } => {}
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
