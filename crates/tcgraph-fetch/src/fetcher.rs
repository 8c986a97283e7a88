//! Bounded-retry graph fetching.

use crate::transport::{AttemptOutcome, GraphTransport, HttpTransport};
use std::sync::Arc;
use std::time::Duration;
use tcgraph_core::FetchError;
use tracing::{debug, error, info, warn};

/// Attempts per fetch.
pub const MAX_RETRIES: u32 = 2;
/// Backoff unit; the delay after attempt `n` is `n * BASE_RETRY_INTERVAL_MS`.
pub const BASE_RETRY_INTERVAL_MS: u64 = 5000;
/// Timeout of a single attempt.
pub const FETCH_TIMEOUT_MS: u64 = 30000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub max_retries: u32,
    pub base_interval: Duration,
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_interval: Duration::from_millis(BASE_RETRY_INTERVAL_MS),
            timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
        }
    }
}

impl FetchPolicy {
    /// Linear backoff after the 1-based `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_interval.saturating_mul(attempt)
    }
}

/// Fetches graph template text.
#[derive(Clone)]
pub struct GraphFetcher {
    transport: Arc<dyn GraphTransport>,
    policy: FetchPolicy,
}

impl GraphFetcher {
    pub fn new(transport: Arc<dyn GraphTransport>, policy: FetchPolicy) -> Self {
        Self { transport, policy }
    }

    /// Fetcher over plain HTTP.
    pub fn http(policy: FetchPolicy) -> Self {
        Self::new(Arc::new(HttpTransport::new()), policy)
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetch `url`, retrying transient failures with linear backoff.
    ///
    /// Returns on the first successful attempt. No delay follows the final
    /// attempt.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if url.is_empty() {
            return Err(FetchError::Rejected {
                url: String::new(),
                reason: "url is required".to_string(),
            });
        }

        info!(url, "Fetching graph");
        let attempts = self.policy.max_retries;
        let mut last_error = "no attempts made".to_string();

        for attempt in 1..=attempts {
            match self.transport.get(url, self.policy.timeout).await {
                AttemptOutcome::Fetched(text) => {
                    debug!(url, attempt, "Graph fetched");
                    return Ok(text);
                }
                AttemptOutcome::Permanent(reason) => {
                    error!(url, attempt, error = %reason, "Graph request cannot succeed");
                    return Err(FetchError::Rejected {
                        url: url.to_string(),
                        reason,
                    });
                }
                AttemptOutcome::Transient(reason) => {
                    if attempt < attempts {
                        let backoff = self.policy.backoff(attempt);
                        warn!(
                            url,
                            attempt,
                            error = %reason,
                            backoff_ms = backoff.as_millis() as u64,
                            "Error fetching graph"
                        );
                        tokio::time::sleep(backoff).await;
                    } else {
                        warn!(url, attempt, error = %reason, "Error fetching graph");
                    }
                    last_error = reason;
                }
            }
        }

        error!(url, attempts, "Could not fetch graph");
        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }
}
