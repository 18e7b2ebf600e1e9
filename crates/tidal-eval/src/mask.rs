//! Data masks: table columns layered over an enclosing environment.

use indexmap::IndexMap;
use tidal_ast::{EnvId, Value};

use crate::table::Table;

/// Columns visible as plain names during masked evaluation. Names missing
/// from the mask are looked up in `enclosing`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMask {
    columns: IndexMap<String, Value>,
    nrows: usize,
    enclosing: EnvId,
}

impl DataMask {
    pub fn new<T: Table>(table: &T, enclosing: EnvId) -> Self {
        let columns = table
            .column_names()
            .into_iter()
            .filter_map(|name| {
                let col = table.column(&name)?.clone();
                Some((name, col))
            })
            .collect();
        Self {
            columns,
            nrows: table.nrows(),
            enclosing,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn enclosing(&self) -> EnvId {
        self.enclosing
    }

    /// Bind or replace a column; existing columns keep their position.
    pub(crate) fn set_column(&mut self, name: String, value: Value) {
        self.columns.insert(name, value);
    }

    pub(crate) fn remove_column(&mut self, name: &str) {
        self.columns.shift_remove(name);
    }

    pub(crate) fn into_columns(self) -> IndexMap<String, Value> {
        self.columns
    }
}
