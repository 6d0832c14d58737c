//! Google Sheets roster source: one `values.get` call per load.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::FetchError;

/// Default Sheets API base URL.
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Default range covering columns A through K of the House tab.
pub const DEFAULT_ROSTER_RANGE: &str = "House!A:K";

/// A tabular store that returns raw rows, header first.
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Fetch every row of the roster range. Row 0 is the header.
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, FetchError>;
}

/// Connection settings for the Sheets source.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_base: String,
    pub sheet_id: String,
    pub range: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

/// Read-only roster source backed by the Sheets v4 REST API.
pub struct SheetsRosterSource {
    config: SheetsConfig,
    client: reqwest::Client,
}

impl SheetsRosterSource {
    pub fn new(config: SheetsConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Build the `values.get` URL; the range is encoded as one path segment.
    fn values_url(&self) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.config.api_base)
            .map_err(|e| FetchError::Transport(format!("Invalid Sheets API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Transport("Sheets API base cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", &self.config.sheet_id, "values", &self.config.range]);
        Ok(url)
    }
}

/// Wire shape of a `values.get` response. `values` is absent for an empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[async_trait]
impl RosterSource for SheetsRosterSource {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, FetchError> {
        let url = self.values_url()?;
        debug!(sheet_id = %self.config.sheet_id, range = %self.config.range, "Fetching roster");

        let response = self
            .client
            .get(url)
            .query(&[("key", self.config.api_key.expose_secret())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Roster source returned an error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let rows = parse_value_range(&body)?;
        info!(rows = rows.len(), "Roster rows fetched");
        Ok(rows)
    }
}

/// Parse a `values.get` body into string rows.
fn parse_value_range(body: &str) -> Result<Vec<Vec<String>>, FetchError> {
    let range: ValueRange =
        serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    Ok(range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect())
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
