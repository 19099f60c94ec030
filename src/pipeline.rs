//! One fetch-transform-render pass, as an explicit dispatch.
//!
//! The cycle is a method on [`Dashboard`] that a scheduler or event source
//! invokes explicitly; no implicit whole-program re-execution. Cycles
//! are strictly sequential: the fetch awaits inline, so a second cycle
//! cannot start until the previous one returns.

use crate::chart::value_counts;
use crate::feed::kobo::{FetchError, KoboClient};
use crate::filter::FilterSelection;
use crate::geo::extract_geo_points;
use crate::logging::{log, obj, v_str, v_u64, Domain, Level};
use crate::render::{render, Summary, View};
use crate::retry::retry_async;
use crate::state::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fetching,
    Rendering,
}

/// Terminal state of one cycle. `Empty` is informational, not a failure;
/// `Failed` carries the fetch error that survived the retry budget.
#[derive(Debug)]
pub enum CycleOutcome {
    Rendered(View),
    Empty,
    Failed(FetchError),
}

pub struct Dashboard {
    cfg: Config,
    client: KoboClient,
    phase: CyclePhase,
    tick: u64,
}

impl Dashboard {
    pub fn new(cfg: Config) -> Self {
        let client = KoboClient::new(&cfg.base, cfg.http_timeout_secs);
        Self {
            cfg,
            client,
            phase: CyclePhase::Idle,
            tick: 0,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Replace the filter selection for subsequent cycles (a shell's filter
    /// pickers feed this between ticks).
    pub fn set_filters(&mut self, filters: FilterSelection) {
        self.cfg.filters = filters;
    }

    pub fn set_chart_column(&mut self, column: Option<String>) {
        self.cfg.chart_column = column;
    }

    fn set_phase(&mut self, next: CyclePhase) {
        log(
            Level::Debug,
            Domain::Pipeline,
            "cycle_state",
            obj(&[
                ("tick", v_u64(self.tick)),
                ("prev_state", v_str(&format!("{:?}", self.phase))),
                ("new_state", v_str(&format!("{:?}", next))),
            ]),
        );
        self.phase = next;
    }

    /// Run exactly one fetch-transform-render pass. Idempotent with respect
    /// to the dashboard's own state: every cycle rebuilds the table from
    /// the wire and nothing survives into the next one but the tick count.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.tick += 1;
        self.set_phase(CyclePhase::Fetching);

        let fetched = retry_async(
            &self.cfg.retry,
            "fetch_submissions",
            FetchError::is_retryable,
            || self.client.fetch_table(&self.cfg.token, &self.cfg.form_id),
        )
        .await;

        let (table, skipped) = match fetched {
            Ok(ok) => ok,
            Err(err) => {
                log(
                    Level::Error,
                    Domain::Fetch,
                    "fetch_failed",
                    obj(&[
                        ("tick", v_u64(self.tick)),
                        ("form_id", v_str(&self.cfg.form_id)),
                        ("error", v_str(&err.to_string())),
                    ]),
                );
                self.set_phase(CyclePhase::Idle);
                return CycleOutcome::Failed(err);
            }
        };

        log(
            Level::Debug,
            Domain::Fetch,
            "fetched",
            obj(&[
                ("tick", v_u64(self.tick)),
                ("rows", v_u64(table.n_rows() as u64)),
                ("columns", v_u64(table.n_cols() as u64)),
                ("skipped_records", v_u64(skipped as u64)),
            ]),
        );

        if table.is_empty() {
            log(
                Level::Info,
                Domain::Pipeline,
                "no_submissions",
                obj(&[("tick", v_u64(self.tick))]),
            );
            self.set_phase(CyclePhase::Idle);
            return CycleOutcome::Empty;
        }

        self.set_phase(CyclePhase::Rendering);

        // summary cards describe the full table; the data/chart/geo views
        // run over the filtered subset
        let summary = Summary::of(&table);
        let filtered = self.cfg.filters.apply(&table);

        let (chart, chart_warning) = match &self.cfg.chart_column {
            None => (None, None),
            Some(column) => match value_counts(&filtered, column) {
                Ok(spec) => (Some(spec), None),
                Err(err) => (None, Some(err.to_string())),
            },
        };

        let geo = extract_geo_points(&filtered);

        let view = View {
            tick: self.tick,
            fetched_at: crate::logging::ts_now(),
            summary,
            table: filtered,
            chart,
            chart_warning,
            geo,
        };

        render(&view, &self.cfg);
        self.set_phase(CyclePhase::Idle);
        CycleOutcome::Rendered(view)
    }
}
