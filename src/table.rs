//! Columnar submission table.
//!
//! A table is rebuilt from scratch on every fetch cycle: the column set is
//! the union of flattened keys across all records in first-seen order, and
//! rows are padded with nulls for keys a given record lacks. Cells are raw
//! `serde_json::Value`s; nothing is coerced until export time.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

pub const KEY_SEPARATOR: char = '.';

#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from the `results` array of a data API response.
    ///
    /// Nested object keys are joined with `.` into flat column names
    /// (`{"a":{"b":1}}` becomes column `a.b`); arrays are kept as cell
    /// values, not exploded into rows. Non-object entries cannot carry
    /// named fields and are skipped; the caller gets their count.
    pub fn from_results(results: &[Value]) -> (Self, usize) {
        let mut table = Self::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut skipped = 0usize;

        for record in results {
            let obj = match record.as_object() {
                Some(obj) => obj,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            let mut flat = Vec::new();
            for (key, value) in obj {
                flatten_into(key, value, &mut flat);
            }

            let mut row = vec![Value::Null; table.columns.len()];
            for (name, value) in flat {
                let col = match index.get(&name) {
                    Some(&col) => col,
                    None => {
                        let col = table.columns.len();
                        table.columns.push(name.clone());
                        index.insert(name, col);
                        // backfill older rows for the newly seen column
                        for older in table.rows.iter_mut() {
                            older.push(Value::Null);
                        }
                        row.push(Value::Null);
                        col
                    }
                };
                row[col] = value;
            }
            table.rows.push(row);
        }

        (table, skipped)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell lookup by column name; `None` for unknown columns, `Value::Null`
    /// for known-but-absent cells.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Distinct non-null values of a column in first-seen order. This is
    /// what a shell feeds into its filter value pickers.
    pub fn distinct_values(&self, column: &str) -> Vec<Value> {
        let Some(col) = self.column_index(column) else {
            return Vec::new();
        };
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            let cell = &row[col];
            if cell.is_null() {
                continue;
            }
            if seen.insert(cell.to_string()) {
                out.push(cell.clone());
            }
        }
        out
    }

    /// Rebuild a table from explicit columns and rows. Rows shorter than the
    /// column set are padded with nulls.
    pub fn from_parts(columns: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        for row in rows.iter_mut() {
            while row.len() < columns.len() {
                row.push(Value::Null);
            }
        }
        Self { columns, rows }
    }
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let joined = format!("{}{}{}", prefix, KEY_SEPARATOR, key);
                flatten_into(&joined, nested, out);
            }
        }
        other => out.push((prefix.to_string(), other.clone())),
    }
}
