//! Quote backend HTTP client
//!
//! Talks to the backend's HTTP gateway. Calls are never retried here: the
//! next refresh tick is the retry.

use async_trait::async_trait;
use reqwest::{Client, Response};

use super::{BackendError, BackendResult, QuoteBackend};
use crate::config::BackendConfig;
use crate::quote::QuoteArchive;

/// reqwest-backed [`QuoteBackend`]
pub struct HttpQuoteBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpQuoteBackend {
    /// Create a new client with the given configuration
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        reqwest::Url::parse(&config.url)
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn check_status(response: Response) -> BackendResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(BackendError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[async_trait]
impl QuoteBackend for HttpQuoteBackend {
    async fn trigger_manual_fetch(&self) -> BackendResult<String> {
        let url = self.endpoint(&self.config.rate_path);
        tracing::debug!(%url, "Triggering manual quote fetch");

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        let body = Self::check_status(response)
            .await?
            .text()
            .await
            .map_err(BackendError::from_transport)?;

        Ok(unwrap_string_literal(body))
    }

    async fn get_quote_archive(&self) -> BackendResult<QuoteArchive> {
        let url = self.endpoint(&self.config.archive_path);
        tracing::debug!(%url, "Fetching quote archive");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        let body = Self::check_status(response)
            .await?
            .bytes()
            .await
            .map_err(BackendError::from_transport)?;

        let archive: QuoteArchive = serde_json::from_slice(&body)?;
        tracing::debug!(entries = archive.len(), "Quote archive received");

        Ok(archive)
    }
}

/// Gateways may return the payload as a JSON string literal; unwrap it once.
fn unwrap_string_literal(body: String) -> String {
    if body.trim_start().starts_with('"') {
        if let Ok(inner) = serde_json::from_str::<String>(&body) {
            return inner;
        }
    }
    body
}
