//! The evaluator.
//!
//! Every evaluation takes a *primary* context (an environment or a data
//! mask) and an explicit *enclosing* environment that free names fall back
//! to. There is no call-stack introspection: whoever evaluates decides both.

use std::sync::Arc;

use tidal_ast::{Arg, Call, Closure, EnvId, Expr, Formal, Value};
use tracing::{debug, trace};

use crate::env::DotsEntry;
use crate::error::{EvalError, Result};
use crate::mask::DataMask;
use crate::quote::quote;
use crate::registry::ArgValue;
use crate::runtime::Runtime;
use crate::subst::Bindings;

/// Where names are looked up first.
#[derive(Debug, Clone, Copy)]
pub enum Context<'m> {
    Env(EnvId),
    Mask(&'m DataMask),
}

impl Context<'_> {
    /// The environment that assignment, closures and `...` refer to: the
    /// primary environment, or the enclosing one under a mask.
    fn scope(self, enclosing: EnvId) -> EnvId {
        match self {
            Context::Env(env) => env,
            Context::Mask(_) => enclosing,
        }
    }
}

/// Forms whose arguments are handed over unevaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Special {
    Quote,
    Substitute,
    Eval,
    Function,
    Block,
    Assign,
    If,
    AndAnd,
    OrOr,
    Dollar,
    Paren,
}

impl Special {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "quote" => Special::Quote,
            "substitute" => Special::Substitute,
            "eval" => Special::Eval,
            "function" => Special::Function,
            "{" => Special::Block,
            "<-" => Special::Assign,
            "if" => Special::If,
            "&&" => Special::AndAnd,
            "||" => Special::OrOr,
            "$" => Special::Dollar,
            "(" => Special::Paren,
            _ => return None,
        })
    }
}

fn single_arg<'a>(call: &'a Call, form: &str) -> Result<&'a Expr> {
    match call.args.as_slice() {
        [arg] if arg.name.is_none() => Ok(&arg.value),
        _ => Err(EvalError::argument(format!(
            "{}() takes exactly one unnamed argument, got {}",
            form,
            call.args.len()
        ))),
    }
}

/// Length-one logical (or numeric) condition; `None` is `NA`.
fn scalar_condition(value: &Value, what: &str) -> Result<Option<bool>> {
    if value.len() != 1 {
        return Err(EvalError::argument(format!(
            "{} has length {}, expected 1",
            what,
            value.len()
        )));
    }
    match value {
        Value::Logical(v) => Ok(v[0]),
        Value::Int(v) => Ok(v[0].map(|i| i != 0)),
        Value::Double(v) => Ok(v[0].filter(|d| !d.is_nan()).map(|d| d != 0.0)),
        other => Err(EvalError::argument(format!(
            "{} of type {} is not interpretable as logical",
            what,
            other.type_name()
        ))),
    }
}

fn pronoun_field(expr: &Expr) -> Result<&str> {
    match expr {
        Expr::Symbol(name) => Ok(name),
        Expr::Literal(Value::Str(v)) if v.len() == 1 => match &v[0] {
            Some(s) => Ok(s),
            None => Err(EvalError::argument("pronoun field name is NA")),
        },
        other => Err(EvalError::argument(format!(
            "invalid pronoun field: {}",
            other
        ))),
    }
}

/// Build formals from the arguments of a `function` call (all but the body).
fn formals_of(args: &[Arg]) -> Result<Vec<Formal>> {
    args.iter()
        .map(|arg| match (&arg.name, &arg.value) {
            (None, Expr::Symbol(name)) => Ok(Formal::Param {
                name: name.clone(),
                default: None,
            }),
            (None, Expr::Ellipsis) => Ok(Formal::Dots),
            (Some(name), default) => Ok(Formal::Param {
                name: name.clone(),
                default: Some(default.clone()),
            }),
            (None, other) => Err(EvalError::argument(format!(
                "invalid formal argument: {}",
                other
            ))),
        })
        .collect()
}

impl Runtime {
    /// Evaluate `expr` with names resolved in `primary` first and then
    /// along the lexical chain of `enclosing`.
    ///
    /// Builtins are found by name only in call position; a bare `sum` that
    /// nothing binds is an unbound symbol.
    pub fn eval(&mut self, expr: &Expr, primary: Context<'_>, enclosing: EnvId) -> Result<Value> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Symbol(name) => self.eval_symbol(name, primary, enclosing),
            Expr::Ellipsis => Err(EvalError::argument("'...' used in an incorrect context")),
            Expr::Call(call) => self.eval_call(call, primary, enclosing),
        }
    }

    /// Evaluate in an environment that is also its own fallback.
    pub fn eval_in(&mut self, expr: &Expr, env: EnvId) -> Result<Value> {
        self.eval(expr, Context::Env(env), env)
    }

    /// Evaluate against a data mask, falling back to the mask's enclosing
    /// environment.
    pub fn eval_masked(&mut self, expr: &Expr, mask: &DataMask) -> Result<Value> {
        self.eval(expr, Context::Mask(mask), mask.enclosing())
    }

    fn eval_symbol(&mut self, name: &str, primary: Context<'_>, enclosing: EnvId) -> Result<Value> {
        match primary {
            Context::Mask(mask) => {
                if let Some(col) = mask.column(name) {
                    trace!(name, "resolved symbol in data mask");
                    return Ok(col.clone());
                }
            }
            Context::Env(env) => {
                if let Some((_, binding)) = self.find(env, name) {
                    return self.resolve(binding);
                }
            }
        }
        if let Some((found, binding)) = self.find(enclosing, name) {
            trace!(name, %found, "resolved symbol in enclosing scope");
            return self.resolve(binding);
        }
        // registry entries are only reachable in call position
        Err(EvalError::UnboundSymbol(name.to_string()))
    }

    fn eval_call(&mut self, call: &Call, primary: Context<'_>, enclosing: EnvId) -> Result<Value> {
        if let Some(form) = call.op_name().and_then(Special::from_name) {
            return self.eval_special(form, call, primary, enclosing);
        }
        match self.resolve_callee(&call.op, primary, enclosing)? {
            Value::Builtin(name) => {
                let args = self.eval_args(&call.args, primary, enclosing)?;
                self.call_builtin(&name, &args)
            }
            Value::Closure(closure) => self.call_closure(&closure, &call.args, primary, enclosing),
            _ => Err(EvalError::NotAFunction(call.op.clone())),
        }
    }

    fn resolve_callee(&mut self, op: &Expr, primary: Context<'_>, enclosing: EnvId) -> Result<Value> {
        if let Expr::Symbol(name) = op {
            // mask columns are data, never functions
            if let Context::Env(env) = primary {
                if let Some(f) = self.lookup_function(env, name)? {
                    return Ok(f);
                }
            }
            if let Some(f) = self.lookup_function(enclosing, name)? {
                return Ok(f);
            }
            if self.registry.contains(name) {
                return Ok(Value::Builtin(name.clone()));
            }
            return Err(EvalError::NotAFunction(op.clone()));
        }
        let value = self.eval(op, primary, enclosing)?;
        if value.is_callable() {
            Ok(value)
        } else {
            Err(EvalError::NotAFunction(op.clone()))
        }
    }

    fn eval_args(&mut self, args: &[Arg], primary: Context<'_>, enclosing: EnvId) -> Result<Vec<ArgValue>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            if arg.value == Expr::Ellipsis {
                for entry in self.forwarded_dots(primary.scope(enclosing))? {
                    let value = self.force(entry.promise)?;
                    out.push(ArgValue {
                        name: entry.name,
                        value,
                    });
                }
                continue;
            }
            let value = self.eval(&arg.value, primary, enclosing)?;
            out.push(ArgValue {
                name: arg.name.clone(),
                value,
            });
        }
        Ok(out)
    }

    /// Invoke a registry function on already evaluated arguments.
    pub fn call_builtin(&self, name: &str, args: &[ArgValue]) -> Result<Value> {
        let f = self
            .registry
            .get(name)
            .ok_or_else(|| EvalError::NotAFunction(Expr::sym(name)))?;
        f(args).map_err(|source| EvalError::Native {
            name: name.to_string(),
            source,
        })
    }

    fn call_closure(
        &mut self,
        closure: &Arc<Closure>,
        args: &[Arg],
        primary: Context<'_>,
        enclosing: EnvId,
    ) -> Result<Value> {
        let caller = primary.scope(enclosing);
        // Arguments stay lazy only when a single environment answers every
        // name; otherwise the pair (primary, enclosing) cannot be captured
        // in one promise and the argument is evaluated now.
        let lazy = matches!(primary, Context::Env(env) if env == enclosing);
        let supplied = if lazy {
            self.promise_args(args, caller)?
        } else {
            let mut out = Vec::with_capacity(args.len());
            for arg in args {
                if arg.value == Expr::Ellipsis {
                    out.extend(self.forwarded_dots(caller)?);
                    continue;
                }
                let value = self.eval(&arg.value, primary, enclosing)?;
                let promise = self.forced_promise(arg.value.clone(), caller, value);
                out.push(DotsEntry {
                    name: arg.name.clone(),
                    promise,
                });
            }
            out
        };
        let frame = self.bind_supplied(&closure.formals, supplied, closure.env)?;
        self.apply_closure(closure, frame)
    }

    /// Run a closure body in a frame prepared by argument binding.
    pub fn apply_closure(&mut self, closure: &Closure, frame: EnvId) -> Result<Value> {
        if self.depth >= self.limits.max_call_depth {
            return Err(EvalError::CallDepthExceeded(self.limits.max_call_depth));
        }
        self.depth += 1;
        debug!(%frame, depth = self.depth, "calling closure");
        let result = self.eval(&closure.body, Context::Env(frame), frame);
        self.depth -= 1;
        result
    }

    fn eval_special(
        &mut self,
        form: Special,
        call: &Call,
        primary: Context<'_>,
        enclosing: EnvId,
    ) -> Result<Value> {
        match form {
            Special::Quote => Ok(match quote(single_arg(call, "quote")?) {
                Expr::Literal(v) => v,
                e => Value::lang(e),
            }),
            Special::Substitute => {
                let arg = single_arg(call, "substitute")?;
                let env = primary.scope(enclosing);
                Ok(match self.substitute(arg, Bindings::Env(env)) {
                    Expr::Literal(v) => v,
                    e => Value::lang(e),
                })
            }
            Special::Eval => {
                let arg = single_arg(call, "eval")?;
                match self.eval(arg, primary, enclosing)? {
                    Value::Lang(e) => self.eval(&e, primary, enclosing),
                    other => Ok(other),
                }
            }
            Special::Function => {
                let Some((body, params)) = call.args.split_last() else {
                    return Err(EvalError::argument("function literal without a body"));
                };
                Ok(Value::Closure(Arc::new(Closure {
                    formals: formals_of(params)?,
                    body: body.value.clone(),
                    env: primary.scope(enclosing),
                })))
            }
            Special::Block => {
                let mut last = Value::Null;
                for arg in &call.args {
                    last = self.eval(&arg.value, primary, enclosing)?;
                }
                Ok(last)
            }
            Special::Assign => {
                let Context::Env(env) = primary else {
                    return Err(EvalError::argument(
                        "cannot assign inside a data mask; the mask is read-only",
                    ));
                };
                let (Some(Expr::Symbol(name)), Some(rhs)) = (call.positional(0), call.positional(1))
                else {
                    return Err(EvalError::argument("invalid assignment target"));
                };
                let value = self.eval(rhs, primary, enclosing)?;
                self.assign(env, name.clone(), value.clone());
                Ok(value)
            }
            Special::If => {
                let cond = call
                    .positional(0)
                    .ok_or_else(|| EvalError::argument("if without a condition"))?;
                let test = self.eval(cond, primary, enclosing)?;
                match scalar_condition(&test, "the condition")? {
                    Some(true) => match call.positional(1) {
                        Some(then) => self.eval(then, primary, enclosing),
                        None => Ok(Value::Null),
                    },
                    Some(false) => match call.positional(2) {
                        Some(other) => self.eval(other, primary, enclosing),
                        None => Ok(Value::Null),
                    },
                    None => Err(EvalError::argument("missing value where TRUE/FALSE needed")),
                }
            }
            Special::AndAnd | Special::OrOr => {
                let (Some(lhs), Some(rhs)) = (call.positional(0), call.positional(1)) else {
                    return Err(EvalError::argument("logical operator needs two operands"));
                };
                let dominant = form == Special::OrOr;
                let left = self.eval(lhs, primary, enclosing)?;
                let left = scalar_condition(&left, "the left operand")?;
                if left == Some(dominant) {
                    return Ok(Value::lgl(dominant));
                }
                let right = self.eval(rhs, primary, enclosing)?;
                let right = scalar_condition(&right, "the right operand")?;
                Ok(Value::Logical(vec![match (left, right) {
                    (_, Some(r)) if r == dominant => Some(dominant),
                    (Some(_), Some(_)) => Some(!dominant),
                    _ => None,
                }]))
            }
            Special::Dollar => {
                let (Some(lhs), Some(rhs)) = (call.positional(0), call.positional(1)) else {
                    return Err(EvalError::argument("'$' needs two operands"));
                };
                let field = pronoun_field(rhs)?;
                match lhs.as_symbol() {
                    Some(".data") => match primary {
                        Context::Mask(mask) => mask.column(field).cloned().ok_or_else(|| {
                            EvalError::UnboundSymbol(format!(".data${}", field))
                        }),
                        Context::Env(_) => Err(EvalError::argument(
                            "the .data pronoun is only available inside a data mask",
                        )),
                    },
                    Some(".env") => self.lookup(enclosing, field),
                    _ => Err(EvalError::argument(format!(
                        "'$' is only supported on the .data and .env pronouns, not {}",
                        lhs
                    ))),
                }
            }
            Special::Paren => {
                let inner = single_arg(call, "(")?;
                self.eval(inner, primary, enclosing)
            }
        }
    }
}
