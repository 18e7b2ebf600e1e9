use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;

use crate::expr::Expr;

/// Stable index of an environment frame in the runtime's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EnvId(pub u32);

impl std::fmt::Display for EnvId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<env:{}>", self.0)
    }
}

/// Runtime values.
///
/// Atomic vectors carry per-element missingness (`None` is `NA`); a scalar is
/// simply a vector of length one.
#[derive(Debug, Clone, Serialize)]
pub enum Value {
    Null,
    Logical(Vec<Option<bool>>),
    Int(Vec<Option<i64>>),
    Double(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    /// A quoted expression
    Lang(Arc<Expr>),
    /// User function closing over the environment it was created in
    Closure(Arc<Closure>),
    /// Reference to a native function in the callable registry
    Builtin(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Closure {
    pub formals: Vec<Formal>,
    pub body: Expr,
    pub env: EnvId,
}

/// A formal parameter of a closure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Formal {
    Param { name: String, default: Option<Expr> },
    /// `...` collects unmatched arguments into the call frame's pack
    Dots,
}

impl Formal {
    pub fn name(&self) -> &str {
        match self {
            Formal::Param { name, .. } => name,
            Formal::Dots => "...",
        }
    }
}

impl Value {
    pub fn lgl(b: bool) -> Self {
        Value::Logical(vec![Some(b)])
    }

    pub fn int(i: i64) -> Self {
        Value::Int(vec![Some(i)])
    }

    pub fn double(d: f64) -> Self {
        Value::Double(vec![Some(d)])
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(vec![Some(s.into())])
    }

    pub fn ints(xs: impl IntoIterator<Item = i64>) -> Self {
        Value::Int(xs.into_iter().map(Some).collect())
    }

    pub fn doubles(xs: impl IntoIterator<Item = f64>) -> Self {
        Value::Double(xs.into_iter().map(Some).collect())
    }

    pub fn strs<S: Into<String>>(xs: impl IntoIterator<Item = S>) -> Self {
        Value::Str(xs.into_iter().map(|s| Some(s.into())).collect())
    }

    pub fn lang(expr: Expr) -> Self {
        Value::Lang(Arc::new(expr))
    }

    /// Number of elements. Non-vector values count as one.
    pub fn len(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Logical(v) => v.len(),
            Value::Int(v) => v.len(),
            Value::Double(v) => v.len(),
            Value::Str(v) => v.len(),
            Value::Lang(_) | Value::Closure(_) | Value::Builtin(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Logical(_) => "logical",
            Value::Int(_) => "integer",
            Value::Double(_) => "double",
            Value::Str(_) => "character",
            Value::Lang(_) => "language",
            Value::Closure(_) => "closure",
            Value::Builtin(_) => "builtin",
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Logical(_) | Value::Int(_) | Value::Double(_) | Value::Str(_)
        )
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Builtin(_))
    }

    /// Short shape description used in diagnostics, e.g. `logical[4]`.
    pub fn shape(&self) -> String {
        format!("{}[{}]", self.type_name(), self.len())
    }

    /// Select elements by position. Non-vector values are returned unchanged.
    pub fn take(&self, rows: &[usize]) -> Value {
        fn pick<T: Clone>(v: &[Option<T>], rows: &[usize]) -> Vec<Option<T>> {
            rows.iter().map(|&i| v.get(i).cloned().flatten()).collect()
        }
        match self {
            Value::Logical(v) => Value::Logical(pick(v, rows)),
            Value::Int(v) => Value::Int(pick(v, rows)),
            Value::Double(v) => Value::Double(pick(v, rows)),
            Value::Str(v) => Value::Str(pick(v, rows)),
            other => other.clone(),
        }
    }

    /// Repeat a length-one vector to `n` elements.
    pub fn recycle(&self, n: usize) -> Value {
        if self.len() != 1 || !self.is_atomic() {
            return self.clone();
        }
        self.take(&vec![0; n])
    }
}

// Doubles compare by bit pattern so that equality stays reflexive and agrees
// with `Hash`; expressions are compared structurally, not numerically.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Logical(a), Value::Logical(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| x.map(f64::to_bits) == y.map(f64::to_bits))
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Lang(a), Value::Lang(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Logical(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Double(v) => {
                for x in v {
                    x.map(f64::to_bits).hash(state);
                }
            }
            Value::Str(v) => v.hash(state),
            Value::Lang(e) => e.hash(state),
            Value::Closure(c) => c.hash(state),
            Value::Builtin(name) => name.hash(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_pads_out_of_range_with_missing() {
        let v = Value::ints([10, 20, 30]);
        assert_eq!(v.take(&[2, 0, 7]), Value::Int(vec![Some(30), Some(10), None]));
    }

    #[test]
    fn recycle_only_touches_length_one_vectors() {
        assert_eq!(Value::lgl(true).recycle(3), Value::Logical(vec![Some(true); 3]));
        let v = Value::ints([1, 2]);
        assert_eq!(v.recycle(3), v);
    }

    #[test]
    fn nan_equals_itself_structurally() {
        assert_eq!(Value::double(f64::NAN), Value::double(f64::NAN));
        assert_ne!(Value::double(0.0), Value::double(-0.0));
    }

    #[test]
    fn shape_reports_type_and_length() {
        assert_eq!(Value::strs(["a", "b"]).shape(), "character[2]");
        assert_eq!(Value::Null.shape(), "NULL[0]");
    }
}
