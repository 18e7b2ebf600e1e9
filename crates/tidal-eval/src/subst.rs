//! Substitution: rewrite the symbols of an expression according to the
//! bindings of a single frame or an explicit mapping.
//!
//! Substitution is pure. It never forces a promise and never walks to a
//! parent frame; a name with no binding in the frame is left alone.

use std::convert::Infallible;

use indexmap::IndexMap;
use tidal_ast::{fold_expr, Arg, EnvId, Expr, Folder, Value};

use crate::env::Binding;
use crate::runtime::Runtime;

/// What a name is replaced by in an explicit mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    Value(Value),
    Expr(Expr),
}

/// An explicit name → replacement mapping, optionally with a variadic pack
/// to splice wherever `...` appears as an argument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubstMap {
    entries: IndexMap<String, Replacement>,
    dots: Option<Vec<Arg>>,
}

impl SubstMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.entries.insert(name.into(), Replacement::Value(value));
        self
    }

    pub fn expr(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.entries.insert(name.into(), Replacement::Expr(expr));
        self
    }

    pub fn with_dots(mut self, dots: Vec<Arg>) -> Self {
        self.dots = Some(dots);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Replacement> {
        self.entries.get(name)
    }
}

/// Where substitution takes its bindings from.
#[derive(Debug, Clone, Copy)]
pub enum Bindings<'a> {
    Env(EnvId),
    Map(&'a SubstMap),
}

struct Substituter<'a> {
    rt: &'a Runtime,
    bindings: Bindings<'a>,
}

impl Substituter<'_> {
    fn replacement(&self, name: &str) -> Option<Expr> {
        match self.bindings {
            Bindings::Env(env) => match self.rt.binding(env, name)? {
                Binding::Value(v) => Some(value_expr(v)),
                Binding::Promise(p) => Some(self.rt.promise_expr(*p).clone()),
            },
            Bindings::Map(map) => match map.get(name)? {
                Replacement::Value(v) => Some(value_expr(v)),
                Replacement::Expr(e) => Some(e.clone()),
            },
        }
    }

    fn pack(&self) -> Option<Vec<Arg>> {
        match self.bindings {
            Bindings::Env(env) => self.rt.dots(env).map(|entries| {
                entries
                    .iter()
                    .map(|d| Arg {
                        name: d.name.clone(),
                        value: self.rt.promise_expr(d.promise).clone(),
                    })
                    .collect()
            }),
            Bindings::Map(map) => map.dots.clone(),
        }
    }
}

// A bound language object is code, not a constant.
fn value_expr(v: &Value) -> Expr {
    match v {
        Value::Lang(e) => (**e).clone(),
        other => Expr::Literal(other.clone()),
    }
}

impl Folder for Substituter<'_> {
    type Error = Infallible;

    fn fold_symbol(&mut self, name: &str) -> Result<Expr, Infallible> {
        Ok(self
            .replacement(name)
            .unwrap_or_else(|| Expr::Symbol(name.to_string())))
    }

    fn fold_arg(&mut self, arg: &Arg, out: &mut Vec<Arg>) -> Result<(), Infallible> {
        if arg.value == Expr::Ellipsis {
            if let Some(pack) = self.pack() {
                out.extend(pack);
                return Ok(());
            }
        }
        out.push(Arg {
            name: arg.name.clone(),
            value: fold_expr(self, &arg.value)?,
        });
        Ok(())
    }
}

impl Runtime {
    /// Replace symbols in `expr` by what `bindings` binds them to: values
    /// become literals, promises become the expression they captured, and
    /// `...` in an argument list is spliced from the frame's pack.
    ///
    /// With the top environment as target this is a plain quote.
    pub fn substitute(&self, expr: &Expr, bindings: Bindings<'_>) -> Expr {
        if let Bindings::Env(env) = bindings {
            if self.is_top_level_target(env) {
                return expr.clone();
            }
        }
        let mut folder = Substituter { rt: self, bindings };
        match fold_expr(&mut folder, expr) {
            Ok(e) => e,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TOP_ENV;
    use pretty_assertions::assert_eq;

    #[test]
    fn mapping_replaces_values_and_exprs() {
        let rt = Runtime::new();
        let map = SubstMap::new()
            .value("a", Value::int(5))
            .expr("b", Expr::apply("+", [Expr::sym("p"), Expr::sym("q")]));
        let e = Expr::apply("*", [Expr::sym("a"), Expr::sym("b")]);
        assert_eq!(
            rt.substitute(&e, Bindings::Map(&map)),
            Expr::apply(
                "*",
                [
                    Expr::lit(Value::int(5)),
                    Expr::apply("+", [Expr::sym("p"), Expr::sym("q")])
                ]
            )
        );
    }

    #[test]
    fn unbound_names_are_untouched() {
        let rt = Runtime::new();
        let e = Expr::apply("f", [Expr::sym("zz")]);
        assert_eq!(rt.substitute(&e, Bindings::Map(&SubstMap::new())), e);
    }

    #[test]
    fn top_env_is_pure_quote() {
        let mut rt = Runtime::new();
        rt.assign(TOP_ENV, "a", Value::int(1));
        let e = Expr::sym("a");
        assert_eq!(rt.substitute(&e, Bindings::Env(TOP_ENV)), e);
    }

    #[test]
    fn only_the_frame_itself_is_consulted() {
        let mut rt = Runtime::new();
        let outer = rt.child(TOP_ENV);
        rt.assign(outer, "a", Value::int(1));
        let inner = rt.child(outer);
        let e = Expr::sym("a");
        assert_eq!(rt.substitute(&e, Bindings::Env(inner)), e);
    }

    #[test]
    fn promises_are_not_forced() {
        let mut rt = Runtime::new();
        let env = rt.child(TOP_ENV);
        let p = rt.make_promise(Expr::sym("never_bound"), TOP_ENV);
        rt.define(env, "a", Binding::Promise(p));
        assert_eq!(
            rt.substitute(&Expr::sym("a"), Bindings::Env(env)),
            Expr::sym("never_bound")
        );
        assert!(!rt.is_forced(p));
    }

    #[test]
    fn dots_splice_with_names() {
        let rt = Runtime::new();
        let map = SubstMap::new().with_dots(vec![
            Arg::positional(Expr::sym("x")),
            Arg::named("k", Expr::sym("y")),
        ]);
        let e = Expr::call(
            Expr::sym("g"),
            vec![Arg::positional(Expr::sym("a")), Arg::positional(Expr::Ellipsis)],
        );
        assert_eq!(
            rt.substitute(&e, Bindings::Map(&map)),
            Expr::call(
                Expr::sym("g"),
                vec![
                    Arg::positional(Expr::sym("a")),
                    Arg::positional(Expr::sym("x")),
                    Arg::named("k", Expr::sym("y")),
                ]
            )
        );
    }

    #[test]
    fn ellipsis_without_pack_stays() {
        let rt = Runtime::new();
        let e = Expr::apply("g", [Expr::Ellipsis]);
        assert_eq!(rt.substitute(&e, Bindings::Map(&SubstMap::new())), e);
    }

    #[test]
    fn bound_language_is_inserted_as_code() {
        let rt = Runtime::new();
        let code = Expr::apply("+", [Expr::sym("u"), Expr::sym("v")]);
        let map = SubstMap::new().value("x", Value::lang(code.clone()));
        assert_eq!(rt.substitute(&Expr::sym("x"), Bindings::Map(&map)), code);
    }
}
