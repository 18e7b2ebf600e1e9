//! Environment & binding store.
//!
//! Frames live in the runtime arena; an [`EnvId`] is an index into it, so a
//! closure may be stored in the very environment it closes over.

use indexmap::IndexMap;
use tidal_ast::{EnvId, Value};
use tracing::trace;

use crate::error::{EvalError, Result};
use crate::promise::PromiseId;
use crate::runtime::Runtime;

/// What a name is bound to in a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    Promise(PromiseId),
}

/// One entry of a variadic pack.
#[derive(Debug, Clone, PartialEq)]
pub struct DotsEntry {
    pub name: Option<String>,
    pub promise: PromiseId,
}

#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) bindings: IndexMap<String, Binding>,
    pub(crate) parent: Option<EnvId>,
    pub(crate) dots: Option<Vec<DotsEntry>>,
}

impl Frame {
    pub(crate) fn new(parent: Option<EnvId>) -> Self {
        Self {
            bindings: IndexMap::new(),
            parent,
            dots: None,
        }
    }
}

impl Runtime {
    fn frame(&self, env: EnvId) -> &Frame {
        &self.frames[env.0 as usize]
    }

    fn frame_mut(&mut self, env: EnvId) -> &mut Frame {
        &mut self.frames[env.0 as usize]
    }

    /// Allocate a new frame whose lexical parent is `parent`.
    pub fn child(&mut self, parent: EnvId) -> EnvId {
        let id = EnvId(self.frames.len() as u32);
        self.frames.push(Frame::new(Some(parent)));
        id
    }

    pub fn parent(&self, env: EnvId) -> Option<EnvId> {
        self.frame(env).parent
    }

    /// Insert or overwrite a binding in `env` itself.
    pub fn define(&mut self, env: EnvId, name: impl Into<String>, binding: Binding) {
        self.frame_mut(env).bindings.insert(name.into(), binding);
    }

    /// Shorthand for defining a materialized value.
    pub fn assign(&mut self, env: EnvId, name: impl Into<String>, value: Value) {
        self.define(env, name, Binding::Value(value));
    }

    /// The binding `env` itself holds for `name`; parents are not consulted.
    pub fn binding(&self, env: EnvId, name: &str) -> Option<&Binding> {
        self.frame(env).bindings.get(name)
    }

    /// Names bound directly in `env`, in definition order.
    pub fn names(&self, env: EnvId) -> impl Iterator<Item = &str> + '_ {
        self.frame(env).bindings.keys().map(String::as_str)
    }

    /// Walk the lexical chain from `env` for the frame that binds `name`.
    pub fn find(&self, env: EnvId, name: &str) -> Option<(EnvId, Binding)> {
        let mut cur = Some(env);
        while let Some(id) = cur {
            let frame = self.frame(id);
            if let Some(b) = frame.bindings.get(name) {
                return Some((id, b.clone()));
            }
            cur = frame.parent;
        }
        None
    }

    /// Resolve `name` along the lexical chain of `env`, forcing a promise if
    /// that is what the name is bound to.
    pub fn lookup(&mut self, env: EnvId, name: &str) -> Result<Value> {
        match self.find(env, name) {
            Some((found, binding)) => {
                trace!(name, %env, %found, "resolved symbol");
                self.resolve(binding)
            }
            None => Err(EvalError::UnboundSymbol(name.to_string())),
        }
    }

    pub(crate) fn resolve(&mut self, binding: Binding) -> Result<Value> {
        match binding {
            Binding::Value(v) => Ok(v),
            Binding::Promise(id) => self.force(id),
        }
    }

    /// Function-position lookup: bindings that do not hold a callable are
    /// skipped, so a variable named `c` does not hide the builtin `c`.
    pub fn lookup_function(&mut self, env: EnvId, name: &str) -> Result<Option<Value>> {
        let mut cur = Some(env);
        while let Some(id) = cur {
            if let Some(b) = self.binding(id, name).cloned() {
                let value = self.resolve(b)?;
                if value.is_callable() {
                    return Ok(Some(value));
                }
            }
            cur = self.parent(id);
        }
        Ok(None)
    }

    /// The variadic pack carried by `env` itself.
    pub fn dots(&self, env: EnvId) -> Option<&[DotsEntry]> {
        self.frame(env).dots.as_deref()
    }

    pub(crate) fn set_dots(&mut self, env: EnvId, dots: Vec<DotsEntry>) {
        self.frame_mut(env).dots = Some(dots);
    }

    /// The nearest variadic pack along the lexical chain.
    pub fn lookup_dots(&self, env: EnvId) -> Option<Vec<DotsEntry>> {
        let mut cur = Some(env);
        while let Some(id) = cur {
            let frame = self.frame(id);
            if let Some(dots) = &frame.dots {
                return Some(dots.clone());
            }
            cur = frame.parent;
        }
        None
    }
}
