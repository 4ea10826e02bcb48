//! Variable scopes
//!
//! A sketch sees exactly two scope levels: the single global table, and while a
//! user function runs, the local table of the innermost call.
//!
//! # Call scoping
//!
//! A call does not get a clean lexical scope. Its local table starts as a copy
//! of the caller's local table with the parameter bindings laid over it, so a
//! callee can read (but not write back) the caller's locals unless a parameter
//! shadows them. Sketches that rely on this capture keep working.
//!
//! Assignment writes to the innermost local table only when the name already
//! exists there; every other write lands in the global table. At the top level
//! of `setup` and `loop` there is no local table, so declarations there are
//! globals.

use super::value::Value;
use rustc_hash::FxHashMap;

/// A variable-name-to-value table
pub type Scope = FxHashMap<String, Value>;

/// Global table plus the stack of active call-local tables.
#[derive(Debug, Clone, Default)]
pub struct Scopes {
    globals: Scope,
    calls: Vec<Scope>,
}

impl Scopes {
    pub fn new(globals: Scope) -> Self {
        Scopes {
            globals,
            calls: Vec::new(),
        }
    }

    /// Look a name up in the innermost local table, then in the globals.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.calls
            .last()
            .and_then(|locals| locals.get(name))
            .or_else(|| self.globals.get(name))
    }

    pub fn assign(&mut self, name: &str, value: Value) {
        if let Some(slot) = self
            .calls
            .last_mut()
            .and_then(|locals| locals.get_mut(name))
        {
            *slot = value;
            return;
        }
        self.globals.insert(name.to_string(), value);
    }

    /// Open a call scope seeded from the caller's locals plus `bindings`.
    pub fn enter_call(&mut self, bindings: Vec<(String, Value)>) {
        let mut locals = self.calls.last().cloned().unwrap_or_default();
        locals.extend(bindings);
        self.calls.push(locals);
    }

    pub fn exit_call(&mut self) {
        self.calls.pop();
    }

    /// Drop every call scope, keeping the globals.
    pub fn exit_all_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of active call scopes
    pub fn depth(&self) -> usize {
        self.calls.len()
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    pub fn locals(&self) -> Option<&Scope> {
        self.calls.last()
    }

    pub fn clear(&mut self) {
        self.globals.clear();
        self.calls.clear();
    }
}
