//! Support code for the `tidal` binary: source loading, JSON tables and
//! logging setup.

use std::sync::Once;

use anyhow::{anyhow, bail, Context as _, Result};
use indexmap::IndexMap;
use serde_json::{Map, Number, Value as Json};
use tidal_ast::{EnvId, Value};
use tidal_eval::{DataFrame, Runtime, Table, TOP_ENV};
use tidal_parse::parse_expr;
use tracing::debug;

/// Maximum source file size in bytes (1MB)
pub const MAX_SOURCE_SIZE: usize = 1_000_000;

static TRACING_INIT: Once = Once::new();

/// Install a `fmt` subscriber, but only when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

/// Read a file (or stdin for `-`), refusing anything over [`MAX_SOURCE_SIZE`].
pub fn read_source(path: &str) -> Result<String> {
    let src = if path == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path))?
    };
    if src.len() > MAX_SOURCE_SIZE {
        bail!(
            "source file exceeds {}MB limit ({} bytes)",
            MAX_SOURCE_SIZE / 1_000_000,
            src.len()
        );
    }
    Ok(src)
}

/// Bind each `name=expr` in the top environment, evaluated in order, and
/// return it. Scripts and expressions run there too, so `substitute` at the
/// prompt quotes its argument.
pub fn session_env(rt: &mut Runtime, lets: &[String]) -> Result<EnvId> {
    let env = TOP_ENV;
    for binding in lets {
        let (name, src) = binding
            .split_once('=')
            .ok_or_else(|| anyhow!("expected name=expr, got '{}'", binding))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("empty name in binding '{}'", binding);
        }
        let expr = parse_expr(src).with_context(|| format!("in binding '{}'", name))?;
        let value = rt.eval_in(&expr, env)?;
        debug!(name, value = %value, "session binding");
        rt.assign(env, name, value);
    }
    Ok(env)
}

/// Parse a JSON object of equal-length column arrays.
///
/// Integers become integer columns, any fractional number makes the column
/// double, `null` is a missing element.
pub fn table_from_json(text: &str) -> Result<DataFrame> {
    let json: Json = serde_json::from_str(text).context("table is not valid JSON")?;
    let Json::Object(obj) = json else {
        bail!("table must be a JSON object of column arrays");
    };
    let mut columns = IndexMap::new();
    for (name, col) in obj {
        let Json::Array(items) = col else {
            bail!("column '{}' is not an array", name);
        };
        let value = column_from_json(&name, &items)?;
        columns.insert(name, value);
    }
    Ok(DataFrame::from_columns(columns)?)
}

fn column_from_json(name: &str, items: &[Json]) -> Result<Value> {
    let present = || items.iter().filter(|j| !j.is_null());
    if present().all(Json::is_boolean) {
        return Ok(Value::Logical(items.iter().map(Json::as_bool).collect()));
    }
    if present().all(|j| j.is_i64()) {
        return Ok(Value::Int(items.iter().map(Json::as_i64).collect()));
    }
    if present().all(Json::is_number) {
        return Ok(Value::Double(items.iter().map(Json::as_f64).collect()));
    }
    if present().all(Json::is_string) {
        return Ok(Value::Str(
            items.iter().map(|j| j.as_str().map(str::to_string)).collect(),
        ));
    }
    bail!("column '{}' mixes element types", name)
}

/// Render a table as a JSON object of column arrays. Missing elements and
/// non-finite doubles become `null`.
pub fn table_to_json<T: Table>(table: &T) -> Json {
    let mut obj = Map::new();
    for name in table.column_names() {
        let items = table.column(&name).map(value_to_json).unwrap_or(Json::Null);
        obj.insert(name, items);
    }
    Json::Object(obj)
}

/// JSON rendering of an atomic vector; other values become their text.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Logical(v) => Json::Array(v.iter().map(|x| x.map_or(Json::Null, Json::Bool)).collect()),
        Value::Int(v) => Json::Array(
            v.iter()
                .map(|x| x.map_or(Json::Null, |i| Json::Number(i.into())))
                .collect(),
        ),
        Value::Double(v) => Json::Array(
            v.iter()
                .map(|x| x.and_then(Number::from_f64).map_or(Json::Null, Json::Number))
                .collect(),
        ),
        Value::Str(v) => Json::Array(
            v.iter()
                .map(|x| x.as_ref().map_or(Json::Null, |s| Json::String(s.clone())))
                .collect(),
        ),
        other => Json::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_types_are_inferred() {
        let df = table_from_json(
            r#"{"i": [1, 2, null], "d": [1, 2.5, 3], "s": ["a", null, "c"], "b": [true, false, null]}"#,
        )
        .unwrap();
        assert_eq!(df.column("i"), Some(&Value::Int(vec![Some(1), Some(2), None])));
        assert_eq!(df.column("d"), Some(&Value::doubles([1.0, 2.5, 3.0])));
        assert_eq!(
            df.column("s"),
            Some(&Value::Str(vec![Some("a".into()), None, Some("c".into())]))
        );
        assert_eq!(
            df.column("b"),
            Some(&Value::Logical(vec![Some(true), Some(false), None]))
        );
    }

    #[test]
    fn column_order_survives_a_round_trip() {
        let text = r#"{"z":[1],"a":[2]}"#;
        let df = table_from_json(text).unwrap();
        assert_eq!(table_to_json(&df).to_string(), text);
    }

    #[test]
    fn ragged_tables_are_rejected() {
        assert!(table_from_json(r#"{"a":[1,2],"b":[1]}"#).is_err());
        assert!(table_from_json(r#"{"a":[1,"x"]}"#).is_err());
        assert!(table_from_json(r#"[1,2]"#).is_err());
    }

    #[test]
    fn let_bindings_are_evaluated_in_order() {
        let mut rt = Runtime::new();
        let env = session_env(&mut rt, &["a=2".into(), "b = a * 3".into()]).unwrap();
        assert_eq!(env, TOP_ENV);
        assert_eq!(rt.lookup(env, "b").unwrap(), Value::double(6.0));
        assert!(session_env(&mut rt, &["novalue".into()]).is_err());
    }

    #[test]
    fn non_finite_doubles_become_null() {
        let v = Value::Double(vec![Some(f64::INFINITY), Some(1.5), None]);
        assert_eq!(value_to_json(&v).to_string(), "[null,1.5,null]");
    }
}
