use snafu::Snafu;

use crate::filter::FilterSelection;
use crate::retry::RetryConfig;

/// Refresh interval bounds in seconds. User input outside this range is
/// clamped at parse time, never deeper in the pipeline.
pub const MIN_REFRESH_SECS: u64 = 10;
pub const MAX_REFRESH_SECS: u64 = 300;
pub const DEFAULT_REFRESH_SECS: u64 = 30;

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("KOBO_TOKEN is empty; an API token is required"))]
    MissingToken,
    #[snafu(display("KOBO_FORM_ID is empty; a form id is required"))]
    MissingFormId,
}

#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub form_id: String,
    pub base: String,
    pub refresh_secs: u64,
    pub http_timeout_secs: u64,
    /// Column to aggregate for the distribution chart; no chart when unset.
    pub chart_column: Option<String>,
    pub filters: FilterSelection,
    /// Directory for per-cycle CSV/XLSX snapshots; exports skipped when unset.
    pub export_dir: Option<String>,
    pub kill_file: String,
    pub retry: RetryConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            token: std::env::var("KOBO_TOKEN").unwrap_or_default(),
            form_id: std::env::var("KOBO_FORM_ID").unwrap_or_default(),
            base: std::env::var("KOBO_BASE")
                .unwrap_or_else(|_| "https://kf.kobotoolbox.org".to_string()),
            refresh_secs: std::env::var("REFRESH_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REFRESH_SECS)
                .clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            chart_column: std::env::var("CHART_COLUMN").ok().filter(|c| !c.is_empty()),
            filters: std::env::var("FILTERS")
                .ok()
                .and_then(|v| FilterSelection::parse(&v).ok())
                .unwrap_or_default(),
            export_dir: std::env::var("EXPORT_DIR").ok().filter(|d| !d.is_empty()),
            kill_file: std::env::var("KILL_FILE").unwrap_or_else(|_| "/tmp/STOP".to_string()),
            retry: RetryConfig::from_env(),
        }
    }

    /// Launch gate: the dashboard refuses to start without credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.form_id.trim().is_empty() {
            return Err(ConfigError::MissingFormId);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            token: "t".to_string(),
            form_id: "f".to_string(),
            base: "https://kf.kobotoolbox.org".to_string(),
            refresh_secs: 30,
            http_timeout_secs: 10,
            chart_column: None,
            filters: FilterSelection::default(),
            export_dir: None,
            kill_file: "/tmp/STOP".to_string(),
            retry: RetryConfig::default(),
        }
    }

    #[test]
    fn validate_rejects_blank_credentials() {
        let mut cfg = base_config();
        cfg.token = "  ".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingToken)));

        let mut cfg = base_config();
        cfg.form_id = String::new();
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingFormId)));

        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn refresh_interval_clamps() {
        assert_eq!(3u64.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS), 10);
        assert_eq!(301u64.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS), 300);
        assert_eq!(45u64.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS), 45);
    }
}
