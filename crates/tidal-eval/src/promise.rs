//! Promise engine: deferred evaluation with memoization.

use std::fmt;

use tidal_ast::{EnvId, Expr, Value};
use tracing::debug;

use crate::error::{EvalError, Result};
use crate::eval::Context;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(pub u32);

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<promise:{}>", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PromiseState {
    Unforced,
    Forcing,
    Forced(Value),
}

#[derive(Debug)]
pub(crate) struct Promise {
    pub(crate) expr: Expr,
    pub(crate) env: EnvId,
    pub(crate) state: PromiseState,
}

impl Runtime {
    fn promise(&self, id: PromiseId) -> &Promise {
        &self.promises[id.0 as usize]
    }

    /// Capture `expr` for later evaluation in `env`.
    pub fn make_promise(&mut self, expr: Expr, env: EnvId) -> PromiseId {
        let id = PromiseId(self.promises.len() as u32);
        self.promises.push(Promise {
            expr,
            env,
            state: PromiseState::Unforced,
        });
        id
    }

    /// A promise whose value is already known. The expression is kept so
    /// that substitution still sees what was written.
    pub(crate) fn forced_promise(&mut self, expr: Expr, env: EnvId, value: Value) -> PromiseId {
        let id = self.make_promise(expr, env);
        self.promises[id.0 as usize].state = PromiseState::Forced(value);
        id
    }

    /// Evaluate the promise on first demand and memoize its value.
    ///
    /// Demanding a promise while it is being computed is a
    /// [`EvalError::CyclicForce`]. A failed evaluation leaves the promise
    /// unforced, so the next demand tries again.
    pub fn force(&mut self, id: PromiseId) -> Result<Value> {
        let (expr, env) = {
            let p = self.promise(id);
            match &p.state {
                PromiseState::Forced(v) => return Ok(v.clone()),
                PromiseState::Forcing => return Err(EvalError::CyclicForce(id)),
                PromiseState::Unforced => (p.expr.clone(), p.env),
            }
        };
        debug!(promise = %id, expr = %expr, %env, "forcing promise");
        self.promises[id.0 as usize].state = PromiseState::Forcing;
        let result = self.eval(&expr, Context::Env(env), env);
        self.promises[id.0 as usize].state = match &result {
            Ok(v) => PromiseState::Forced(v.clone()),
            Err(_) => PromiseState::Unforced,
        };
        result
    }

    /// The expression captured by the promise, never forced.
    pub fn promise_expr(&self, id: PromiseId) -> &Expr {
        &self.promise(id).expr
    }

    pub fn promise_env(&self, id: PromiseId) -> EnvId {
        self.promise(id).env
    }

    pub fn is_forced(&self, id: PromiseId) -> bool {
        matches!(self.promise(id).state, PromiseState::Forced(_))
    }
}
