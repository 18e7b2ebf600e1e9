use std::sync::Arc;

use serde::Serialize;

use crate::value::Value;

/// An unevaluated expression.
///
/// Call nodes are reference counted, so cloning an expression (which the
/// promise engine and substitution do constantly) never copies a subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Expr {
    Literal(Value),
    Symbol(String),
    Call(Arc<Call>),
    /// The variadic placeholder `...`
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Call {
    pub op: Expr,
    pub args: Vec<Arg>,
}

/// One call argument, optionally named (`f(x, na.rm = TRUE)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

impl Arg {
    pub fn positional(value: Expr) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Expr) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

impl Expr {
    pub const ELLIPSIS: Expr = Expr::Ellipsis;

    pub fn sym(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn lit(value: Value) -> Self {
        Expr::Literal(value)
    }

    pub fn call(op: Expr, args: Vec<Arg>) -> Self {
        Expr::Call(Arc::new(Call { op, args }))
    }

    /// Call a function by name with positional arguments: `apply("+", [a, b])`.
    pub fn apply(name: &str, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::call(
            Expr::sym(name),
            args.into_iter().map(Arg::positional).collect(),
        )
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Expr::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Returns the call node if this is a call whose operator is the symbol `name`.
    pub fn call_to(&self, name: &str) -> Option<&Call> {
        self.as_call().filter(|c| c.op_name() == Some(name))
    }
}

impl Call {
    /// Name of the operator when it is a plain symbol.
    pub fn op_name(&self) -> Option<&str> {
        self.op.as_symbol()
    }

    pub fn positional(&self, idx: usize) -> Option<&Expr> {
        self.args.get(idx).map(|a| &a.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_structural() {
        let a = Expr::apply("+", [Expr::sym("x"), Expr::lit(Value::double(1.0))]);
        let b = Expr::apply("+", [Expr::sym("x"), Expr::lit(Value::double(1.0))]);
        assert_eq!(a, b);
        let c = Expr::apply("+", [Expr::sym("x"), Expr::lit(Value::int(1))]);
        assert_ne!(a, c);
    }

    #[test]
    fn hash_agrees_with_equality() {
        let mut set = HashSet::new();
        set.insert(Expr::apply("f", [Expr::lit(Value::double(f64::NAN))]));
        assert!(set.contains(&Expr::apply("f", [Expr::lit(Value::double(f64::NAN))])));
        assert!(!set.contains(&Expr::apply("g", [Expr::lit(Value::double(f64::NAN))])));
    }

    #[test]
    fn argument_names_take_part_in_equality() {
        let a = Expr::call(Expr::sym("f"), vec![Arg::named("x", Expr::sym("y"))]);
        let b = Expr::call(Expr::sym("f"), vec![Arg::positional(Expr::sym("y"))]);
        assert_ne!(a, b);
    }

    #[test]
    fn call_to_matches_operator_symbol() {
        let e = Expr::apply("desc", [Expr::sym("x")]);
        assert!(e.call_to("desc").is_some());
        assert!(e.call_to("asc").is_none());
        assert!(Expr::sym("desc").call_to("desc").is_none());
    }

    #[test]
    fn serializes_with_variant_tags() {
        let e = Expr::call(Expr::sym("f"), vec![Arg::named("n", Expr::lit(Value::int(2)))]);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Call": {
                    "op": {"Symbol": "f"},
                    "args": [{"name": "n", "value": {"Literal": {"Int": [2]}}}]
                }
            })
        );
    }
}
