//! Layered, immutable lexical-scope mappings.
//!
//! A `Context` records which names are in scope at a tree position and
//! the expression that supplies each name's value. Deriving a child
//! context overlays new bindings without touching the parent, so every
//! state along a descent can keep its own view cheaply.

use std::collections::HashMap;
use std::rc::Rc;

use crate::parser::ast::Expr;

/// An immutable name-to-expression scope mapping. Cloning shares the
/// underlying storage.
#[derive(Debug, Clone, Default)]
pub struct Context {
    bindings: Rc<HashMap<String, Expr>>,
}

impl Context {
    /// An empty scope, used at program start
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a child scope: the union of the receiver's accumulated
    /// bindings and `new_bindings`, with `new_bindings` winning on
    /// collision. The receiver is left untouched.
    pub fn update_ctx(&self, new_bindings: &[(String, Expr)]) -> Context {
        if new_bindings.is_empty() {
            return self.clone();
        }
        let mut merged = (*self.bindings).clone();
        for (name, expr) in new_bindings {
            merged.insert(name.clone(), expr.clone());
        }
        Context {
            bindings: Rc::new(merged),
        }
    }

    /// Look up a name; child bindings shadow ancestor bindings because
    /// the child map was built by overlaying them
    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// All names in scope, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Whether two contexts share the same underlying storage, which
    /// holds when a descent supplied no new bindings
    pub fn shares_storage(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.bindings, &other.bindings)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
