//! Quoting, argument capture and closure argument binding.

use tidal_ast::{Arg, Closure, EnvId, Expr, Formal};

use crate::env::{Binding, DotsEntry};
use crate::error::{EvalError, Result};
use crate::runtime::Runtime;

/// Return `expr` exactly as written.
pub fn quote(expr: &Expr) -> Expr {
    expr.clone()
}

impl Runtime {
    /// The expression supplied at the call site for `param` of the call
    /// frame `frame`, without forcing it.
    pub fn capture_argument(&self, frame: EnvId, param: &str) -> Result<Expr> {
        match self.binding(frame, param) {
            Some(Binding::Promise(p)) => Ok(self.promise_expr(*p).clone()),
            Some(Binding::Value(v)) => Ok(Expr::Literal(v.clone())),
            None => Err(EvalError::UnboundSymbol(param.to_string())),
        }
    }

    /// Wrap each call-site argument as a promise in `caller` and bind them to
    /// the closure's formals in a fresh child of the closure environment.
    pub fn bind_arguments(&mut self, closure: &Closure, args: &[Arg], caller: EnvId) -> Result<EnvId> {
        let supplied = self.promise_args(args, caller)?;
        self.bind_supplied(&closure.formals, supplied, closure.env)
    }

    /// Turn call arguments into pack entries, forwarding `...` from the
    /// caller's scope as the existing promises.
    pub(crate) fn promise_args(&mut self, args: &[Arg], caller: EnvId) -> Result<Vec<DotsEntry>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            if arg.value == Expr::Ellipsis {
                out.extend(self.forwarded_dots(caller)?);
                continue;
            }
            let promise = self.make_promise(arg.value.clone(), caller);
            out.push(DotsEntry {
                name: arg.name.clone(),
                promise,
            });
        }
        Ok(out)
    }

    pub(crate) fn forwarded_dots(&self, env: EnvId) -> Result<Vec<DotsEntry>> {
        self.lookup_dots(env)
            .ok_or_else(|| EvalError::argument("'...' used in an incorrect context"))
    }

    /// Match supplied arguments to formals: exact names first, then
    /// positional fill up to `...`. Whatever is left goes into the pack when
    /// there is one.
    pub(crate) fn bind_supplied(
        &mut self,
        formals: &[Formal],
        supplied: Vec<DotsEntry>,
        parent: EnvId,
    ) -> Result<EnvId> {
        let mut seen: Vec<&str> = Vec::new();
        for name in supplied.iter().filter_map(|s| s.name.as_deref()) {
            if seen.contains(&name) {
                return Err(EvalError::argument(format!(
                    "formal argument '{}' matched by multiple actual arguments",
                    name
                )));
            }
            seen.push(name);
        }

        let mut matched: Vec<Option<DotsEntry>> = vec![None; formals.len()];
        let mut rest = Vec::new();
        for entry in supplied {
            let slot = entry.name.as_deref().and_then(|n| {
                formals
                    .iter()
                    .position(|f| matches!(f, Formal::Param { name, .. } if name == n))
            });
            match slot {
                Some(i) => matched[i] = Some(entry),
                None => rest.push(entry),
            }
        }

        let has_dots = formals.contains(&Formal::Dots);
        let mut dots = Vec::new();
        let mut next = 0;
        for entry in rest {
            if entry.name.is_some() {
                if has_dots {
                    dots.push(entry);
                    continue;
                }
                return Err(unused(&entry));
            }
            while next < formals.len()
                && formals[next] != Formal::Dots
                && matched[next].is_some()
            {
                next += 1;
            }
            match formals.get(next) {
                Some(Formal::Param { .. }) => {
                    matched[next] = Some(entry);
                    next += 1;
                }
                Some(Formal::Dots) => dots.push(entry),
                None => return Err(unused(&entry)),
            }
        }

        let frame = self.child(parent);
        for (formal, entry) in formals.iter().zip(matched) {
            let Formal::Param { name, default } = formal else {
                continue;
            };
            let promise = match (entry, default) {
                (Some(e), _) => e.promise,
                // defaults are evaluated in the callee frame
                (None, Some(d)) => self.make_promise(d.clone(), frame),
                (None, None) => {
                    return Err(EvalError::argument(format!(
                        "argument '{}' is missing, with no default",
                        name
                    )))
                }
            };
            self.define(frame, name.clone(), Binding::Promise(promise));
        }
        if has_dots {
            self.set_dots(frame, dots);
        }
        Ok(frame)
    }
}

fn unused(entry: &DotsEntry) -> EvalError {
    match &entry.name {
        Some(n) => EvalError::argument(format!("unused argument '{}'", n)),
        None => EvalError::argument("unused argument"),
    }
}
