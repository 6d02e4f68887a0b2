//! Remote CSV loading.
//!
//! Blocking reqwest client (no Tokio runtime required). Every fetch takes a
//! [`CancellationToken`]; a cancelled fetch yields `Ok(None)` and never an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tabview_engine::RowSet;

use crate::csv::{parse_csv_with, CsvOptions};
use crate::error::SourceError;

pub const USER_AGENT: &str = concat!("tabview/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shared cancel flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// HTTP client for CSV URLs.
#[derive(Clone)]
pub struct Fetcher {
    http: reqwest::blocking::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Fetch {
                status: 0,
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { http })
    }

    /// GET `url` as text.
    ///
    /// Non-success statuses become `Fetch{status, reason}`; transport
    /// failures use status 0. Returns `Ok(None)` once `token` is cancelled.
    pub fn fetch_text(&self, url: &str, token: &CancellationToken) -> Result<Option<String>, SourceError> {
        if token.is_cancelled() {
            return Ok(None);
        }

        let response = self.http.get(url).send().map_err(|e| SourceError::Fetch {
            status: 0,
            message: e.to_string(),
        });
        if token.is_cancelled() {
            log::debug!("fetch {}: cancelled", url);
            return Ok(None);
        }
        let response = response?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Fetch {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.text().map_err(|e| SourceError::Fetch {
            status: 0,
            message: e.to_string(),
        })?;
        if token.is_cancelled() {
            log::debug!("fetch {}: cancelled after body", url);
            return Ok(None);
        }
        log::debug!("fetch {}: {} bytes", url, body.len());
        Ok(Some(body))
    }

    /// Fetch and parse delimited text
    pub fn fetch_csv(
        &self,
        url: &str,
        options: &CsvOptions,
        token: &CancellationToken,
    ) -> Result<Option<RowSet>, SourceError> {
        match self.fetch_text(url, token)? {
            Some(body) => parse_csv_with(&body, options).map(Some),
            None => Ok(None),
        }
    }
}
