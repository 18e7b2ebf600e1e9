//! Callable registry: native functions the evaluator dispatches to by name.
//!
//! Hosts may register their own functions next to the builtins. Natives
//! always receive fully evaluated arguments; laziness belongs to closures.

use std::collections::HashMap;

use tidal_ast::Value;

use crate::builtins;
use crate::error::NativeError;

/// An evaluated call argument, keeping the name it was supplied under.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgValue {
    pub name: Option<String>,
    pub value: Value,
}

impl ArgValue {
    pub fn positional(value: Value) -> Self {
        Self { name: None, value }
    }
}

/// Type alias for native function signatures.
pub type NativeFn = fn(&[ArgValue]) -> Result<Value, NativeError>;

/// Registry mapping function names to Rust implementations.
pub struct Registry {
    functions: HashMap<String, NativeFn>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("functions", &names).finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry holding all builtin functions.
    pub fn new() -> Self {
        let mut reg = Self::empty();
        builtins::install(&mut reg);
        reg
    }

    /// Create a registry with nothing in it.
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Add or replace a function.
    pub fn register(&mut self, name: &str, f: NativeFn) {
        self.functions.insert(name.to_string(), f);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.functions.get(name).copied()
    }
}
