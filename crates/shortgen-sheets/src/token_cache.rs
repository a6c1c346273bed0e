//! Access token cache for the spreadsheets scope.
//!
//! Keeps the provider's token until it is within a minute of expiry. A 401
//! carrying `ACCESS_TOKEN_EXPIRED` invalidates it early (see the client).

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use gcp_auth::{Token, TokenProvider};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{SheetsError, SheetsResult};

/// OAuth scope for reading and writing spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const REFRESH_MARGIN_SECS: i64 = 60;

fn is_fresh(token: &Token) -> bool {
    token.expires_at() - TimeDelta::seconds(REFRESH_MARGIN_SECS) > Utc::now()
}

pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    current: Mutex<Option<Arc<Token>>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            current: Mutex::new(None),
        }
    }

    /// Bearer token for the next request, fetched only when the cached one
    /// is missing or about to expire.
    pub async fn get_token(&self) -> SheetsResult<String> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| is_fresh(t)) {
            return Ok(token.as_str().to_string());
        }

        let token = self
            .provider
            .token(&[SHEETS_SCOPE])
            .await
            .map_err(|e| SheetsError::auth_error(format!("Failed to obtain Sheets token: {}", e)))?;
        debug!(expires_at = %token.expires_at(), "Fetched Sheets access token");

        let bearer = token.as_str().to_string();
        *current = Some(token);
        Ok(bearer)
    }

    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
