//! Blocking-loop refresh mode: a cancellable periodic task.
//!
//! A bare fetch-sleep loop can only be stopped by killing the process. This
//! runner keeps the fixed cadence but observes a shutdown token (watch
//! channel, wired to Ctrl-C in the binary) and a kill-file sentinel between
//! cycles. Cycles never overlap: the cycle future is awaited inline, and
//! missed ticks are delayed, so consecutive cycle starts are at least one
//! interval apart.
//!
//! Cooperative mode needs no runner at all: the embedding shell calls
//! [`Dashboard::run_cycle`] on its own cadence and gets the same
//! one-in-flight guarantee from the same inline await.

use std::path::Path;

use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::feed::kobo::FetchError;
use crate::logging::{log, obj, v_str, v_u64, Domain, Level};
use crate::pipeline::{CycleOutcome, Dashboard};

/// Why the loop ended, for the session summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    KillFile,
    FetchFailed,
}

impl StopReason {
    fn as_str(&self) -> &'static str {
        match self {
            StopReason::Shutdown => "shutdown",
            StopReason::KillFile => "kill_file",
            StopReason::FetchFailed => "fetch_failed",
        }
    }
}

#[derive(Debug)]
pub struct SessionSummary {
    pub ticks: u64,
    pub rendered: u64,
    pub empty: u64,
    pub reason: StopReason,
}

fn log_session_summary(summary: &SessionSummary) {
    log(
        Level::Info,
        Domain::System,
        "session_summary",
        obj(&[
            ("ticks", v_u64(summary.ticks)),
            ("rendered", v_u64(summary.rendered)),
            ("empty", v_u64(summary.empty)),
            ("reason", v_str(summary.reason.as_str())),
        ]),
    );
}

/// Drive the dashboard until shutdown, kill file, or a fetch failure that
/// survived the retry budget. The first cycle runs immediately; subsequent
/// cycle starts are spaced at least `period` apart.
pub async fn run_loop(
    dash: &mut Dashboard,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<SessionSummary, FetchError> {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let kill_file = dash.config().kill_file.clone();
    let mut rendered = 0u64;
    let mut empty = 0u64;

    let reason = loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break StopReason::Shutdown;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        if Path::new(&kill_file).exists() {
            log(
                Level::Warn,
                Domain::Sched,
                "kill_file_present",
                obj(&[("path", v_str(&kill_file))]),
            );
            break StopReason::KillFile;
        }

        match dash.run_cycle().await {
            CycleOutcome::Rendered(_) => rendered += 1,
            CycleOutcome::Empty => empty += 1,
            CycleOutcome::Failed(err) => {
                let summary = SessionSummary {
                    ticks: dash.tick_count(),
                    rendered,
                    empty,
                    reason: StopReason::FetchFailed,
                };
                log_session_summary(&summary);
                return Err(err);
            }
        }
    };

    let summary = SessionSummary {
        ticks: dash.tick_count(),
        rendered,
        empty,
        reason,
    };
    log_session_summary(&summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSelection;
    use crate::retry::RetryConfig;
    use crate::state::Config;

    fn offline_config(kill_file: &str) -> Config {
        Config {
            token: "t".to_string(),
            form_id: "f".to_string(),
            base: "http://127.0.0.1:1".to_string(),
            refresh_secs: 10,
            http_timeout_secs: 1,
            chart_column: None,
            filters: FilterSelection::default(),
            export_dir: None,
            kill_file: kill_file.to_string(),
            retry: RetryConfig {
                max_retries: 0,
                base_delay_ms: 1,
                max_delay_ms: 1,
                jitter_factor: 0.0,
            },
        }
    }

    #[tokio::test]
    async fn shutdown_token_stops_the_loop_before_any_cycle() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let mut dash = Dashboard::new(offline_config("/nonexistent/kill"));
        let summary = run_loop(&mut dash, Duration::from_millis(10), rx)
            .await
            .unwrap();
        assert_eq!(summary.reason, StopReason::Shutdown);
        assert_eq!(summary.ticks, 0);
    }

    #[tokio::test]
    async fn kill_file_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let kill = dir.path().join("STOP");
        std::fs::write(&kill, b"").unwrap();

        let (_tx, rx) = watch::channel(false);
        let mut dash = Dashboard::new(offline_config(kill.to_str().unwrap()));
        let summary = run_loop(&mut dash, Duration::from_millis(10), rx)
            .await
            .unwrap();
        assert_eq!(summary.reason, StopReason::KillFile);
        assert_eq!(summary.ticks, 0);
    }

    #[tokio::test]
    async fn surfaced_fetch_failure_ends_the_loop_cleanly() {
        let (_tx, rx) = watch::channel(false);
        let mut dash = Dashboard::new(offline_config("/nonexistent/kill"));
        let err = run_loop(&mut dash, Duration::from_millis(10), rx)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
        assert_eq!(dash.tick_count(), 1);
    }
}
