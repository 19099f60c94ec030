use serde_json::Value;

use crate::table::Table;

/// Column → accepted-values selection. Filters compose as a logical AND
/// across columns; within a column a row passes on set membership. Null
/// cells never match, so filtering on a column a record lacks excludes it.
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    accepted: Vec<(String, Vec<Value>)>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a selection from its JSON form: an object mapping column names
    /// to arrays of accepted values. A bare scalar is treated as a
    /// single-element set.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        let mut selection = Self::new();
        if let Value::Object(map) = value {
            for (column, accepted) in map {
                match accepted {
                    Value::Array(values) => selection.insert(column, values),
                    scalar => selection.insert(column, vec![scalar]),
                }
            }
        }
        Ok(selection)
    }

    /// Add accepted values for a column. An empty value set imposes no
    /// constraint and is dropped.
    pub fn insert(&mut self, column: String, values: Vec<Value>) {
        if values.is_empty() {
            return;
        }
        match self.accepted.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => existing.extend(values),
            None => self.accepted.push((column, values)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.accepted.iter().map(|(c, _)| c.as_str())
    }

    /// Row-subset view of `table`. The source table is never mutated.
    pub fn apply(&self, table: &Table) -> Table {
        if self.is_empty() {
            return table.clone();
        }
        let resolved: Vec<(Option<usize>, &Vec<Value>)> = self
            .accepted
            .iter()
            .map(|(column, values)| (table.column_index(column), values))
            .collect();

        let rows = table
            .rows()
            .iter()
            .filter(|row| {
                resolved.iter().all(|(col, accepted)| match col {
                    Some(col) => {
                        let cell = &row[*col];
                        !cell.is_null() && accepted.contains(cell)
                    }
                    // Filtering on a column no record has: nothing matches.
                    None => false,
                })
            })
            .cloned()
            .collect();

        Table::from_parts(table.columns().to_vec(), rows)
    }
}
