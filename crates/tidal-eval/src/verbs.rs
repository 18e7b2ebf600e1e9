//! Data-masking operators.
//!
//! Each operator captures its expressions as promises in the caller's
//! environment and evaluates the captured expression (never a forced value)
//! against a mask over the table, with the promise's environment as the
//! fallback scope.

use std::cmp::Ordering;

use indexmap::IndexMap;
use tidal_ast::{Arg, EnvId, Expr, Value};
use tracing::debug;

use crate::builtins::combine;
use crate::error::{EvalError, Result};
use crate::eval::Context;
use crate::mask::DataMask;
use crate::promise::PromiseId;
use crate::runtime::Runtime;
use crate::table::Table;

/// Output column name for an argument: its name, or the expression as text.
fn output_name(arg: &Arg) -> String {
    arg.name.clone().unwrap_or_else(|| arg.value.to_string())
}

/// Accept a column result of the mask's length, recycling length one.
fn fit_column(value: Value, nrows: usize, name: &str) -> Result<Value> {
    if !value.is_atomic() {
        return Err(EvalError::shape(
            format!("atomic vector for '{}'", name),
            value.shape(),
        ));
    }
    match value.len() {
        n if n == nrows => Ok(value),
        1 => Ok(value.recycle(nrows)),
        _ => Err(EvalError::shape(
            format!("length {} or 1 for '{}'", nrows, name),
            value.shape(),
        )),
    }
}

/// Missing sorts last whichever the direction.
fn cmp_missing_last<T: PartialOrd>(a: Option<&T>, b: Option<&T>, descending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let o = x.partial_cmp(y).unwrap_or(Ordering::Equal);
            if descending {
                o.reverse()
            } else {
                o
            }
        }
    }
}

fn cmp_rows(key: &Value, a: usize, b: usize, descending: bool) -> Ordering {
    match key {
        Value::Logical(v) => cmp_missing_last(v[a].as_ref(), v[b].as_ref(), descending),
        Value::Int(v) => cmp_missing_last(v[a].as_ref(), v[b].as_ref(), descending),
        Value::Double(v) => cmp_missing_last(
            v[a].as_ref().filter(|d| !d.is_nan()),
            v[b].as_ref().filter(|d| !d.is_nan()),
            descending,
        ),
        Value::Str(v) => cmp_missing_last(v[a].as_ref(), v[b].as_ref(), descending),
        _ => Ordering::Equal,
    }
}

impl Runtime {
    fn capture<'a>(&mut self, exprs: impl IntoIterator<Item = &'a Expr>, caller: EnvId) -> Vec<PromiseId> {
        exprs
            .into_iter()
            .map(|e| self.make_promise(e.clone(), caller))
            .collect()
    }

    /// Evaluate what the promise captured against `mask`, falling back to the
    /// promise's own environment.
    fn eval_captured(&mut self, promise: PromiseId, mask: &DataMask) -> Result<Value> {
        let expr = self.promise_expr(promise).clone();
        let env = self.promise_env(promise);
        self.eval(&expr, Context::Mask(mask), env)
    }

    /// Keep the rows for which every predicate is `TRUE`. `FALSE` and `NA`
    /// drop the row; row order is preserved.
    #[tracing::instrument(level = "debug", skip_all, fields(rows = table.nrows()))]
    pub fn filter<T: Table>(&mut self, table: &T, predicates: &[Expr], caller: EnvId) -> Result<T> {
        let nrows = table.nrows();
        let mask = DataMask::new(table, caller);
        let mut keep = vec![true; nrows];
        for promise in self.capture(predicates, caller) {
            let value = self.eval_captured(promise, &mask)?;
            let flags = match value {
                Value::Logical(v) if v.len() == nrows => v,
                other => {
                    return Err(EvalError::shape(format!("logical[{}]", nrows), other.shape()))
                }
            };
            for (k, flag) in keep.iter_mut().zip(flags) {
                *k &= flag == Some(true);
            }
        }
        let rows: Vec<usize> = (0..nrows).filter(|&i| keep[i]).collect();
        debug!(kept = rows.len(), "filter done");
        Ok(table.take(&rows))
    }

    /// Stable sort of the rows by one or more keys. `desc(key)` reverses a
    /// key; missing values sort last in either direction.
    #[tracing::instrument(level = "debug", skip_all, fields(rows = table.nrows()))]
    pub fn arrange<T: Table>(&mut self, table: &T, keys: &[Expr], caller: EnvId) -> Result<T> {
        let nrows = table.nrows();
        let mask = DataMask::new(table, caller);
        let mut sort_keys = Vec::with_capacity(keys.len());
        for key in keys {
            let (inner, descending) = match key.call_to("desc") {
                Some(call) if call.args.len() == 1 => (&call.args[0].value, true),
                _ => (key, false),
            };
            let promise = self.make_promise(inner.clone(), caller);
            let value = self.eval_captured(promise, &mask)?;
            sort_keys.push((fit_column(value, nrows, &inner.to_string())?, descending));
        }
        let mut order: Vec<usize> = (0..nrows).collect();
        order.sort_by(|&a, &b| {
            sort_keys
                .iter()
                .map(|(key, desc)| cmp_rows(key, a, b, *desc))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        Ok(table.take(&order))
    }

    /// Compute columns one after another; each result is visible to the
    /// expressions after it. A `NULL` result removes the column.
    #[tracing::instrument(level = "debug", skip_all, fields(rows = table.nrows()))]
    pub fn mutate<T: Table>(&mut self, table: &T, exprs: &[Arg], caller: EnvId) -> Result<T> {
        let nrows = table.nrows();
        let mut mask = DataMask::new(table, caller);
        let promises = self.capture(exprs.iter().map(|a| &a.value), caller);
        for (arg, promise) in exprs.iter().zip(promises) {
            let name = output_name(arg);
            match self.eval_captured(promise, &mask)? {
                Value::Null => mask.remove_column(&name),
                value => {
                    let col = fit_column(value, nrows, &name)?;
                    mask.set_column(name, col);
                }
            }
        }
        T::from_columns(mask.into_columns())
    }

    /// Like [`Runtime::mutate`], but every expression sees only the original
    /// columns and the results are merged at once.
    #[tracing::instrument(level = "debug", skip_all, fields(rows = table.nrows()))]
    pub fn transform<T: Table>(&mut self, table: &T, exprs: &[Arg], caller: EnvId) -> Result<T> {
        let nrows = table.nrows();
        let mask = DataMask::new(table, caller);
        let promises = self.capture(exprs.iter().map(|a| &a.value), caller);
        let mut results = Vec::with_capacity(exprs.len());
        for (arg, promise) in exprs.iter().zip(promises) {
            let name = output_name(arg);
            let value = match self.eval_captured(promise, &mask)? {
                Value::Null => None,
                value => Some(fit_column(value, nrows, &name)?),
            };
            results.push((name, value));
        }
        let mut out = mask;
        for (name, value) in results {
            match value {
                Some(col) => out.set_column(name, col),
                None => out.remove_column(&name),
            }
        }
        T::from_columns(out.into_columns())
    }

    /// Reduce the table to one row; every expression must yield length 1.
    #[tracing::instrument(level = "debug", skip_all, fields(rows = table.nrows()))]
    pub fn summarise<T: Table>(&mut self, table: &T, exprs: &[Arg], caller: EnvId) -> Result<T> {
        let promises = self.capture(exprs.iter().map(|a| &a.value), caller);
        let mask = DataMask::new(table, caller);
        let mut columns = IndexMap::new();
        for (arg, promise) in exprs.iter().zip(promises) {
            let name = output_name(arg);
            let value = self.eval_captured(promise, &mask)?;
            columns.insert(name.clone(), summary_value(value, &name)?);
        }
        T::from_columns(columns)
    }

    /// Summarise each group of rows sharing the values of `groups`. Groups
    /// appear in order of first appearance, key columns first.
    #[tracing::instrument(level = "debug", skip_all, fields(rows = table.nrows(), groups = ?groups))]
    pub fn summarise_by<T: Table>(
        &mut self,
        table: &T,
        groups: &[String],
        exprs: &[Arg],
        caller: EnvId,
    ) -> Result<T> {
        let mut keys = Vec::with_capacity(groups.len());
        for g in groups {
            let col = table
                .column(g)
                .ok_or_else(|| EvalError::UnboundSymbol(g.clone()))?;
            keys.push(col);
        }

        let mut partition: IndexMap<Vec<Value>, Vec<usize>> = IndexMap::new();
        for row in 0..table.nrows() {
            let key: Vec<Value> = keys.iter().map(|col| col.take(&[row])).collect();
            partition.entry(key).or_default().push(row);
        }
        debug!(groups = partition.len(), "partitioned rows");

        let promises = self.capture(exprs.iter().map(|a| &a.value), caller);
        let mut per_expr: Vec<Vec<Value>> = vec![Vec::with_capacity(partition.len()); exprs.len()];
        for rows in partition.values() {
            let group = table.take(rows);
            let mask = DataMask::new(&group, caller);
            for (i, (arg, promise)) in exprs.iter().zip(&promises).enumerate() {
                let value = self.eval_captured(*promise, &mask)?;
                per_expr[i].push(summary_value(value, &output_name(arg))?);
            }
        }

        let mut columns = IndexMap::new();
        for (i, (name, col)) in groups.iter().zip(&keys).enumerate() {
            let parts: Vec<&Value> = partition.keys().map(|k| &k[i]).collect();
            let combined = if parts.is_empty() {
                col.take(&[])
            } else {
                combine_column(&parts)?
            };
            columns.insert(name.clone(), combined);
        }
        for (arg, values) in exprs.iter().zip(&per_expr) {
            let parts: Vec<&Value> = values.iter().collect();
            let combined = if parts.is_empty() {
                Value::Logical(Vec::new())
            } else {
                combine_column(&parts)?
            };
            columns.insert(output_name(arg), combined);
        }
        T::from_columns(columns)
    }
}

fn summary_value(value: Value, name: &str) -> Result<Value> {
    if value.is_atomic() && value.len() == 1 {
        Ok(value)
    } else {
        Err(EvalError::shape(
            format!("a single value for '{}'", name),
            value.shape(),
        ))
    }
}

fn combine_column(parts: &[&Value]) -> Result<Value> {
    combine(parts).map_err(|source| EvalError::Native {
        name: "c".to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TOP_ENV;
    use crate::table::DataFrame;
    use pretty_assertions::assert_eq;
    use tidal_parse::{parse_arg, parse_expr};

    fn cars() -> DataFrame {
        DataFrame::from_pairs([
            ("cyl", Value::doubles([4.0, 6.0, 8.0, 4.0])),
            ("mpg", Value::doubles([30.0, 20.0, 15.0, 25.0])),
        ])
        .unwrap()
    }

    fn args(srcs: &[&str]) -> Vec<Arg> {
        srcs.iter().map(|s| parse_arg(s).unwrap()).collect()
    }

    #[test]
    fn unnamed_results_are_named_after_their_expression() {
        let mut rt = Runtime::new();
        let out = rt.mutate(&cars(), &args(&["mpg / 2"]), TOP_ENV).unwrap();
        assert_eq!(
            out.column_names(),
            vec!["cyl".to_string(), "mpg".to_string(), "mpg / 2".to_string()]
        );
    }

    #[test]
    fn filter_rejects_non_logical() {
        let mut rt = Runtime::new();
        let err = rt.filter(&cars(), &[parse_expr("mpg").unwrap()], TOP_ENV);
        assert_eq!(
            err,
            Err(EvalError::ShapeMismatch {
                expected: "logical[4]".into(),
                actual: "double[4]".into(),
            })
        );
    }

    #[test]
    fn filter_rejects_logical_of_the_wrong_length() {
        let mut rt = Runtime::new();
        for (src, actual) in [("TRUE", "logical[1]"), ("c(TRUE, FALSE)", "logical[2]")] {
            let err = rt.filter(&cars(), &[parse_expr(src).unwrap()], TOP_ENV);
            assert_eq!(
                err,
                Err(EvalError::ShapeMismatch {
                    expected: "logical[4]".into(),
                    actual: actual.into(),
                }),
                "predicate {}",
                src
            );
        }
    }

    #[test]
    fn single_row_filter_accepts_a_scalar() {
        let mut rt = Runtime::new();
        let one = cars().take(&[2]);
        let out = rt.filter(&one, &[parse_expr("TRUE").unwrap()], TOP_ENV).unwrap();
        assert_eq!(out.nrows(), 1);
    }

    #[test]
    fn multiple_predicates_are_combined() {
        let mut rt = Runtime::new();
        let preds = [parse_expr("cyl == 4").unwrap(), parse_expr("mpg > 26").unwrap()];
        let out = rt.filter(&cars(), &preds, TOP_ENV).unwrap();
        assert_eq!(out.column("mpg"), Some(&Value::doubles([30.0])));
    }

    #[test]
    fn scalar_results_recycle() {
        let mut rt = Runtime::new();
        let out = rt.mutate(&cars(), &args(&["one = 1L"]), TOP_ENV).unwrap();
        assert_eq!(out.column("one"), Some(&Value::ints([1, 1, 1, 1])));
    }

    #[test]
    fn wrong_length_is_shape_mismatch() {
        let mut rt = Runtime::new();
        let err = rt.mutate(&cars(), &args(&["bad = c(1, 2)"]), TOP_ENV);
        assert!(matches!(err, Err(EvalError::ShapeMismatch { .. })));
    }

    #[test]
    fn null_drops_a_column() {
        let mut rt = Runtime::new();
        let out = rt.mutate(&cars(), &args(&["cyl = NULL"]), TOP_ENV).unwrap();
        assert_eq!(out.column_names(), vec!["mpg".to_string()]);
    }

    #[test]
    fn assignment_inside_mask_is_refused() {
        let mut rt = Runtime::new();
        let err = rt.mutate(&cars(), &args(&["z = (q <- 1)"]), TOP_ENV);
        assert!(matches!(err, Err(EvalError::Argument(_))));
    }

    #[test]
    fn summarise_requires_single_values() {
        let mut rt = Runtime::new();
        let err = rt.summarise(&cars(), &args(&["m = mpg * 2"]), TOP_ENV);
        assert_eq!(
            err,
            Err(EvalError::ShapeMismatch {
                expected: "a single value for 'm'".into(),
                actual: "double[4]".into(),
            })
        );
    }
}
