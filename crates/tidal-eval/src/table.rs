//! The table collaborator and an in-memory implementation.

use indexmap::IndexMap;
use tidal_ast::Value;

use crate::error::{EvalError, Result};

/// Anything the data-masking operators can read columns from and rebuild.
pub trait Table: Sized {
    fn column_names(&self) -> Vec<String>;

    fn column(&self, name: &str) -> Option<&Value>;

    fn nrows(&self) -> usize;

    /// A table holding the given rows, in the given order.
    fn take(&self, rows: &[usize]) -> Self;

    /// Build a table from named columns. All columns must be atomic vectors
    /// of one common length.
    fn from_columns(columns: IndexMap<String, Value>) -> Result<Self>;
}

/// Column-oriented table held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: IndexMap<String, Value>,
    nrows: usize,
}

impl DataFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor from `(name, column)` pairs.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, Value)>) -> Result<Self> {
        Self::from_columns(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn columns(&self) -> &IndexMap<String, Value> {
        &self.columns
    }

    pub fn into_columns(self) -> IndexMap<String, Value> {
        self.columns
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }
}

impl Table for DataFrame {
    fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    fn column(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    fn nrows(&self) -> usize {
        self.nrows
    }

    fn take(&self, rows: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), v.take(rows)))
                .collect(),
            nrows: rows.len(),
        }
    }

    fn from_columns(columns: IndexMap<String, Value>) -> Result<Self> {
        let mut nrows = None;
        for (name, col) in &columns {
            if !col.is_atomic() {
                return Err(EvalError::shape(
                    format!("atomic vector for column '{}'", name),
                    col.shape(),
                ));
            }
            match nrows {
                None => nrows = Some(col.len()),
                Some(n) if n != col.len() => {
                    return Err(EvalError::shape(
                        format!("{} rows in column '{}'", n, name),
                        col.shape(),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(Self {
            columns,
            nrows: nrows.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_columns_checks_lengths() {
        let err = DataFrame::from_pairs([("a", Value::ints([1, 2])), ("b", Value::ints([1]))]);
        assert_eq!(
            err,
            Err(EvalError::ShapeMismatch {
                expected: "2 rows in column 'b'".into(),
                actual: "integer[1]".into(),
            })
        );
    }

    #[test]
    fn take_reorders_every_column() {
        let df = DataFrame::from_pairs([
            ("a", Value::ints([1, 2, 3])),
            ("b", Value::strs(["x", "y", "z"])),
        ])
        .unwrap();
        let picked = df.take(&[2, 0]);
        assert_eq!(picked.nrows(), 2);
        assert_eq!(picked.column("b"), Some(&Value::strs(["z", "x"])));
        assert_eq!(picked.column_names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn language_columns_are_rejected() {
        let err = DataFrame::from_pairs([("q", Value::lang(tidal_ast::Expr::sym("a")))]);
        assert!(matches!(err, Err(EvalError::ShapeMismatch { .. })));
    }
}
