//! KoboToolbox v2 data API client.
//!
//! One authenticated GET per cycle against the submissions endpoint; no
//! pagination, a single page of `results` is assumed complete.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use std::time::Duration;

use crate::retry::is_retryable_http_status;
use crate::table::Table;

#[derive(Debug, Snafu)]
pub enum FetchError {
    #[snafu(display("remote unavailable: HTTP status {status}"))]
    RemoteUnavailable { status: u16 },
    #[snafu(display("malformed response body: {source}"))]
    MalformedResponse { source: serde_json::Error },
    #[snafu(display("transport failure: {source}"))]
    Transport { source: reqwest::Error },
}

impl FetchError {
    /// Flaky-gateway statuses and network hiccups are worth a backoff;
    /// auth/parse failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RemoteUnavailable { status } => is_retryable_http_status(*status),
            FetchError::MalformedResponse { .. } => false,
            FetchError::Transport { source } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataPage {
    #[serde(default)]
    results: Vec<Value>,
}

pub struct KoboClient {
    client: Client,
    base: String,
}

impl KoboClient {
    pub fn new(base: &str, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, form_id: &str) -> String {
        format!("{}/api/v2/assets/{}/data/", self.base, form_id)
    }

    /// Fetch one page of submissions as raw records.
    pub async fn fetch_submissions(
        &self,
        token: &str,
        form_id: &str,
    ) -> Result<Vec<Value>, FetchError> {
        let resp = self
            .client
            .get(self.endpoint(form_id))
            .header("Authorization", format!("Token {}", token))
            .send()
            .await
            .context(TransportSnafu)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::RemoteUnavailable {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.context(TransportSnafu)?;
        let page: DataPage = serde_json::from_str(&body).context(MalformedResponseSnafu)?;
        Ok(page.results)
    }

    /// Fetch and flatten into the submission table. Returns the table plus
    /// the count of non-object records the flattener skipped.
    pub async fn fetch_table(
        &self,
        token: &str,
        form_id: &str,
    ) -> Result<(Table, usize), FetchError> {
        let results = self.fetch_submissions(token, form_id).await?;
        Ok(Table::from_results(&results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_substitutes_form_id_into_the_path_template() {
        let client = KoboClient::new("https://kf.kobotoolbox.org", 10);
        assert_eq!(
            client.endpoint("aB3dE"),
            "https://kf.kobotoolbox.org/api/v2/assets/aB3dE/data/"
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash_on_base() {
        let client = KoboClient::new("http://127.0.0.1:8080/", 10);
        assert_eq!(
            client.endpoint("f"),
            "http://127.0.0.1:8080/api/v2/assets/f/data/"
        );
    }

    #[test]
    fn missing_results_key_parses_as_empty_page() {
        let page: DataPage = serde_json::from_str("{}").unwrap();
        assert!(page.results.is_empty());
    }
}
