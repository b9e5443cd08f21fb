use crate::runtime::Value;
use std::collections::HashMap;

type Frame = HashMap<String, Value>;

/// The executor's scope model: one global map for the lifetime of the
/// executor, plus at most one active local frame (the innermost function
/// call). Blocks do not introduce scopes.
#[derive(Debug, Default)]
pub struct Scopes {
    globals: Frame,
    local: Option<Frame>,
}

impl Scopes {
    pub fn new() -> Self {
        Scopes::default()
    }

    /// Resolve a name: the local frame (when present) shadows the globals.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        if let Some(local) = &self.local {
            if let Some(value) = local.get(name) {
                return Some(value);
            }
        }
        self.globals.get(name)
    }

    pub fn lookup_global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Bind a name in the currently active scope (local if present, else
    /// global). This is what `var` and function declarations do; rebinding
    /// an existing name is an overwrite, not an error.
    pub fn define(&mut self, name: String, value: Value) {
        self.active_mut().insert(name, value);
    }

    /// Assignment policy: write to the local frame if the name is already
    /// bound there, else to the globals if bound there, else create the
    /// binding in the active scope.
    pub fn assign(&mut self, name: &str, value: Value) {
        if let Some(local) = &mut self.local {
            if local.contains_key(name) {
                local.insert(name.to_string(), value);
                return;
            }
        }
        if self.globals.contains_key(name) {
            self.globals.insert(name.to_string(), value);
            return;
        }
        self.active_mut().insert(name.to_string(), value);
    }

    /// Swap in a new local frame (or none), returning the previous one.
    /// Call sites must restore the returned frame on every exit path; the
    /// save/restore pairs have to nest LIFO for recursion to work.
    pub fn swap_local(&mut self, frame: Option<Frame>) -> Option<Frame> {
        std::mem::replace(&mut self.local, frame)
    }

    pub fn has_local(&self) -> bool {
        self.local.is_some()
    }

    fn active_mut(&mut self) -> &mut Frame {
        self.local.as_mut().unwrap_or(&mut self.globals)
    }
}
