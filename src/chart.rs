use std::collections::HashMap;

use serde_json::Value;
use snafu::Snafu;

use crate::table::Table;

/// Chart construction failure. Always recoverable: the pipeline downgrades
/// it to a warning and the rest of the render pass continues.
#[derive(Debug, Snafu)]
#[snafu(display("cannot chart column {column}: {reason}"))]
pub struct UnplottableColumn {
    pub column: String,
    pub reason: &'static str,
}

/// Value-frequency table shaped for a bar chart.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub column: String,
    pub title: String,
    /// (observed value, occurrence count), descending by count; ties keep
    /// first-observation order.
    pub bars: Vec<(Value, u64)>,
}

impl ChartSpec {
    pub fn total(&self) -> u64 {
        self.bars.iter().map(|(_, n)| n).sum()
    }
}

/// Count occurrences of each distinct non-null value in `column`.
pub fn value_counts(table: &Table, column: &str) -> Result<ChartSpec, UnplottableColumn> {
    let col = table.column_index(column).ok_or(UnplottableColumn {
        column: column.to_string(),
        reason: "no such column",
    })?;

    let mut order: Vec<Value> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in table.rows() {
        let cell = &row[col];
        if cell.is_null() {
            continue;
        }
        if cell.is_object() || cell.is_array() {
            return Err(UnplottableColumn {
                column: column.to_string(),
                reason: "nested values",
            });
        }
        let key = cell.to_string();
        let entry = counts.entry(key).or_insert(0);
        if *entry == 0 {
            order.push(cell.clone());
        }
        *entry += 1;
    }

    let mut bars: Vec<(Value, u64)> = order
        .into_iter()
        .map(|value| {
            let n = counts[&value.to_string()];
            (value, n)
        })
        .collect();
    bars.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(ChartSpec {
        title: format!("Distribution of {}", column),
        column: column.to_string(),
        bars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table_of(values: &[Value]) -> Table {
        let results: Vec<Value> = values.iter().map(|v| json!({ "k": v })).collect();
        Table::from_results(&results).0
    }

    #[test]
    fn counts_sum_to_non_null_entries() {
        let table = table_of(&[json!("a"), json!("b"), json!(null), json!("a")]);
        let spec = value_counts(&table, "k").unwrap();
        assert_eq!(spec.total(), 3);
        assert_eq!(spec.bars.len(), 2);
    }

    #[test]
    fn descending_count_with_first_seen_ties() {
        let table = table_of(&[json!("x"), json!("y"), json!("y"), json!("z")]);
        let spec = value_counts(&table, "k").unwrap();
        assert_eq!(spec.bars[0], (json!("y"), 2));
        // x and z tie at 1; x was observed first
        assert_eq!(spec.bars[1], (json!("x"), 1));
        assert_eq!(spec.bars[2], (json!("z"), 1));
    }

    #[test]
    fn mixed_scalar_types_count_separately() {
        let table = table_of(&[json!(1), json!("1"), json!(1)]);
        let spec = value_counts(&table, "k").unwrap();
        assert_eq!(spec.bars[0], (json!(1), 2));
        assert_eq!(spec.bars[1], (json!("1"), 1));
    }

    #[test]
    fn unknown_and_nested_columns_are_unplottable() {
        let table = table_of(&[json!("a")]);
        assert!(value_counts(&table, "missing").is_err());

        let nested = table_of(&[json!(["a", "b"])]);
        let err = value_counts(&nested, "k").unwrap_err();
        assert_eq!(err.reason, "nested values");
    }

    #[test]
    fn title_names_the_column() {
        let table = table_of(&[json!("a")]);
        let spec = value_counts(&table, "k").unwrap();
        assert_eq!(spec.title, "Distribution of k");
    }
}
