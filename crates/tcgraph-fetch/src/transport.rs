//! Single-attempt graph transport.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Result of one GET attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Full response body.
    Fetched(String),
    /// Transport error, timeout or error status; worth retrying.
    Transient(String),
    /// The request can never succeed (e.g. malformed URL).
    Permanent(String),
}

#[async_trait]
pub trait GraphTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> AttemptOutcome;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_client(Client::builder().build().unwrap_or_default())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphTransport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> AttemptOutcome {
        let request = match self.client.get(url).timeout(timeout).build() {
            Ok(request) => request,
            Err(e) => return AttemptOutcome::Permanent(e.to_string()),
        };

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return AttemptOutcome::Transient(format!("request timed out after {timeout:?}"));
            }
            Err(e) => return AttemptOutcome::Transient(e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return AttemptOutcome::Transient(format!("{url} returned {status}: {body}"));
        }

        match response.text().await {
            Ok(text) => {
                debug!(url, bytes = text.len(), "Fetched graph body");
                AttemptOutcome::Fetched(text)
            }
            Err(e) if e.is_timeout() => {
                AttemptOutcome::Transient(format!("request timed out after {timeout:?}"))
            }
            Err(e) => AttemptOutcome::Transient(e.to_string()),
        }
    }
}
