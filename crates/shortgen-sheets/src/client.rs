//! Google Sheets REST API client.
//!
//! Implements [`RowStore`] over the `spreadsheets.values` endpoints with:
//! - Token caching with refresh margin
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter
//! - Observability (tracing spans, metrics)

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use shortgen_models::CellRef;

use crate::error::{SheetsError, SheetsResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};
use crate::store::RowStore;
use crate::token_cache::TokenCache;
use crate::types::{first_row_of_range, AppendValuesResponse, ValueRange};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// Cells are stored as typed, so model output starting with `=` stays text.
const VALUE_INPUT_OPTION: &str = "RAW";

// =============================================================================
// Configuration
// =============================================================================

/// Sheets client configuration.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Spreadsheet ID (from the sheet URL)
    pub spreadsheet_id: String,
    /// Worksheet (tab) holding the topic rows
    pub worksheet: String,
    /// API base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl SheetsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> SheetsResult<Self> {
        let spreadsheet_id = std::env::var("SHEETS_SPREADSHEET_ID").map_err(|_| {
            SheetsError::config_error("SHEETS_SPREADSHEET_ID must be set to access the topic sheet")
        })?;

        if spreadsheet_id.trim().is_empty() {
            return Err(SheetsError::config_error(
                "SHEETS_SPREADSHEET_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("SHEETS_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            spreadsheet_id,
            worksheet: std::env::var("SHEETS_WORKSHEET").unwrap_or_else(|_| "Sheet1".to_string()),
            base_url: std::env::var("SHEETS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Google Sheets row store.
#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    config: SheetsConfig,
    base_url: String,
    token_cache: Arc<TokenCache>,
}

impl SheetsClient {
    /// Create a client authenticated with the service account from
    /// `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn new(config: SheetsConfig) -> SheetsResult<Self> {
        let auth = Self::create_auth_provider()?;
        Self::with_token_provider(config, auth)
    }

    /// Create a client with an explicit token provider.
    pub fn with_token_provider(
        config: SheetsConfig,
        auth: Arc<dyn TokenProvider>,
    ) -> SheetsResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("shortgen-sheets/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SheetsError::Network)?;

        let base_url = format!(
            "{}/v4/spreadsheets/{}",
            config.base_url.trim_end_matches('/'),
            config.spreadsheet_id
        );

        Ok(Self {
            http,
            config,
            base_url,
            token_cache: Arc::new(TokenCache::new(auth)),
        })
    }

    fn create_auth_provider() -> SheetsResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            SheetsError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(SheetsError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> SheetsResult<Self> {
        let config = SheetsConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    /// Qualify a range with the worksheet name.
    fn qualified_range(&self, range: &str) -> String {
        format!("'{}'!{}", self.config.worksheet.replace('\'', "''"), range)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.base_url,
            urlencoding::encode(&self.qualified_range(range))
        )
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Send an authorized request, refreshing the token once on expiry.
    async fn send_authorized<F>(&self, url: &str, build: F) -> SheetsResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.token_cache.get_token().await?;
        let response = build(&self.http).bearer_auth(&token).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            if Self::is_access_token_expired(&body) {
                self.token_cache.invalidate().await;
                let token = self.token_cache.get_token().await?;
                let response = build(&self.http).bearer_auth(&token).send().await?;
                return Self::check_status(url, response).await;
            }
            return Err(SheetsError::from_response(
                status.as_u16(),
                None,
                format!("{} failed: {}", url, body),
            ));
        }

        Self::check_status(url, response).await
    }

    async fn check_status(url: &str, response: Response) -> SheetsResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after = Self::retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        Err(SheetsError::from_response(
            status.as_u16(),
            retry_after,
            format!("{} failed: {}", url, body),
        ))
    }

    /// `Retry-After` in delta-seconds form, the only form the API sends.
    fn retry_after(response: &Response) -> Option<Duration> {
        response
            .headers()
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
            .map(Duration::from_secs)
    }

    async fn execute_request<T, F>(&self, operation: &str, range: &str, fut: F) -> SheetsResult<T>
    where
        F: std::future::Future<Output = SheetsResult<T>>,
    {
        let span = info_span!("sheets_request", operation = %operation, range = %range);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    /// Read a range of values.
    pub async fn get_values(&self, range: &str, columns_major: bool) -> SheetsResult<ValueRange> {
        let url = self.values_url(range);
        let url = url.as_str();
        let dimension = if columns_major { "COLUMNS" } else { "ROWS" };

        self.execute_request("get_values", range, async {
            with_retry(&self.config.retry, "get_values", || async move {
                let response = self
                    .send_authorized(url, |http| {
                        http.get(url).query(&[("majorDimension", dimension)])
                    })
                    .await?;
                Ok::<_, SheetsError>(response.json::<ValueRange>().await?)
            })
            .await
        })
        .await
    }

    /// Overwrite a range with a single row of values.
    pub async fn update_values(&self, range: &str, row: Vec<String>) -> SheetsResult<()> {
        let url = self.values_url(range);
        let url = url.as_str();
        let body = ValueRange::single_row(self.qualified_range(range), row);
        let body = &body;

        self.execute_request("update_values", range, async {
            with_retry(&self.config.retry, "update_values", || async move {
                self.send_authorized(url, |http| {
                    http.put(url)
                        .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
                        .json(body)
                })
                .await?;
                Ok::<_, SheetsError>(())
            })
            .await
        })
        .await
    }

    /// Append a row after the table and return the written row index.
    pub async fn append_values(&self, row: Vec<String>) -> SheetsResult<u32> {
        let range = "A1";
        let url = format!("{}:append", self.values_url(range));
        let body = ValueRange::single_row(self.qualified_range(range), row);

        // Appends are not idempotent; a retried append may duplicate the row.
        self.execute_request("append_values", range, async {
            let response = self
                .send_authorized(&url, |http| {
                    http.post(&url)
                        .query(&[
                            ("valueInputOption", VALUE_INPUT_OPTION),
                            ("insertDataOption", "INSERT_ROWS"),
                        ])
                        .json(&body)
                })
                .await?;

            let appended: AppendValuesResponse = response.json().await?;
            let updated_range = appended
                .updates
                .and_then(|u| u.updated_range)
                .ok_or_else(|| SheetsError::invalid_response("append returned no updatedRange"))?;

            debug!(updated_range = %updated_range, "Appended row");

            first_row_of_range(&updated_range).ok_or_else(|| {
                SheetsError::invalid_response(format!(
                    "cannot read row index from {}",
                    updated_range
                ))
            })
        })
        .await
    }
}

#[async_trait]
impl RowStore for SheetsClient {
    async fn header(&self) -> SheetsResult<Vec<String>> {
        Ok(self.get_values("1:1", false).await?.first_line())
    }

    async fn find_row(&self, column: u32, value: &str) -> SheetsResult<Option<u32>> {
        let values = self.column_values(column).await?;
        Ok(values
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, v)| v.as_str() == value)
            .map(|(i, _)| i as u32 + 1))
    }

    async fn read_cell(&self, row: u32, column: u32) -> SheetsResult<Option<String>> {
        let cell = CellRef::new(row, column).to_a1();
        Ok(self.get_values(&cell, false).await?.first_cell())
    }

    async fn column_values(&self, column: u32) -> SheetsResult<Vec<String>> {
        let letters = CellRef::column_letters(column);
        let range = format!("{}:{}", letters, letters);
        Ok(self.get_values(&range, true).await?.first_line())
    }

    async fn append_row(&self, values: Vec<String>) -> SheetsResult<u32> {
        self.append_values(values).await
    }

    async fn write_cell(&self, row: u32, column: u32, value: &str) -> SheetsResult<()> {
        let cell = CellRef::new(row, column).to_a1();
        self.update_values(&cell, vec![value.to_string()]).await
    }
}
