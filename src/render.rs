//! The rendered product of one refresh cycle.
//!
//! The presentation shell is out of scope, so "rendering" here means two
//! things: shaping a [`View`] value a shell could draw, and emitting it as
//! structured log records (plus optional export files) for headless runs.

use serde_json::{json, Value};
use std::path::Path;

use crate::chart::ChartSpec;
use crate::export;
use crate::geo::GeoView;
use crate::logging::{log, obj, v_str, v_u64, Domain, Level};
use crate::state::Config;
use crate::table::Table;

/// KoboToolbox stamps every submission with this metadata column.
pub const SUBMISSION_TIME_COLUMN: &str = "_submission_time";

/// Headline metrics of the unfiltered table, for the summary cards.
#[derive(Debug, Clone)]
pub struct Summary {
    pub total_submissions: usize,
    pub field_count: usize,
    pub earliest_submission: Option<String>,
    pub latest_submission: Option<String>,
}

impl Summary {
    pub fn of(table: &Table) -> Self {
        let mut earliest: Option<String> = None;
        let mut latest: Option<String> = None;
        if let Some(col) = table.column_index(SUBMISSION_TIME_COLUMN) {
            // ISO-8601 strings order lexicographically
            for row in table.rows() {
                if let Some(ts) = row[col].as_str() {
                    if earliest.as_deref().map_or(true, |e| ts < e) {
                        earliest = Some(ts.to_string());
                    }
                    if latest.as_deref().map_or(true, |l| ts > l) {
                        latest = Some(ts.to_string());
                    }
                }
            }
        }
        Self {
            total_submissions: table.n_rows(),
            field_count: table.n_cols(),
            earliest_submission: earliest,
            latest_submission: latest,
        }
    }
}

/// Everything one cycle produced for presentation.
#[derive(Debug, Clone)]
pub struct View {
    pub tick: u64,
    /// "Last updated" timestamp of the cycle, RFC3339.
    pub fetched_at: String,
    pub summary: Summary,
    /// The filtered table backing the data-table, chart and geo views.
    pub table: Table,
    pub chart: Option<ChartSpec>,
    /// Set when the chart column was unplottable this cycle.
    pub chart_warning: Option<String>,
    pub geo: Option<GeoView>,
}

fn bars_json(spec: &ChartSpec) -> Value {
    Value::Array(
        spec.bars
            .iter()
            .map(|(value, count)| json!({ "value": value, "count": count }))
            .collect(),
    )
}

/// Emit the view as structured log records and, when configured, write the
/// CSV/XLSX snapshot files. Export failures are reported and do not abort
/// the render pass.
pub fn render(view: &View, cfg: &Config) {
    log(
        Level::Info,
        Domain::Render,
        "summary",
        obj(&[
            ("tick", v_u64(view.tick)),
            ("last_updated", v_str(&view.fetched_at)),
            ("total_submissions", v_u64(view.summary.total_submissions as u64)),
            ("field_count", v_u64(view.summary.field_count as u64)),
            (
                "earliest_submission",
                view.summary
                    .earliest_submission
                    .as_deref()
                    .map(v_str)
                    .unwrap_or(Value::Null),
            ),
            (
                "latest_submission",
                view.summary
                    .latest_submission
                    .as_deref()
                    .map(v_str)
                    .unwrap_or(Value::Null),
            ),
            ("filtered_rows", v_u64(view.table.n_rows() as u64)),
        ]),
    );

    if let Some(spec) = &view.chart {
        log(
            Level::Info,
            Domain::Render,
            "chart",
            obj(&[
                ("title", v_str(&spec.title)),
                ("column", v_str(&spec.column)),
                ("total", v_u64(spec.total())),
                ("bars", bars_json(spec)),
            ]),
        );
    }
    if let Some(warning) = &view.chart_warning {
        log(
            Level::Warn,
            Domain::Render,
            "chart_skipped",
            obj(&[("reason", v_str(warning))]),
        );
    }

    if let Some(geo) = &view.geo {
        log(
            Level::Info,
            Domain::Render,
            "geo",
            obj(&[
                ("lat_column", v_str(&geo.lat_column)),
                ("lon_column", v_str(&geo.lon_column)),
                ("points", v_u64(geo.points.n_rows() as u64)),
            ]),
        );
    }

    if let Some(dir) = &cfg.export_dir {
        match export::write_snapshot(&view.table, Path::new(dir)) {
            Ok((csv_path, xlsx_path)) => log(
                Level::Info,
                Domain::Export,
                "snapshot_written",
                obj(&[
                    ("csv", v_str(&csv_path.display().to_string())),
                    ("xlsx", v_str(&xlsx_path.display().to_string())),
                    ("rows", v_u64(view.table.n_rows() as u64)),
                ]),
            ),
            Err(err) => log(
                Level::Error,
                Domain::Export,
                "snapshot_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            ),
        }
    }
}
