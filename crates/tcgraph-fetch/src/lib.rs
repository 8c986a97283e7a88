//! Graph template fetching for tcgraph.
//!
//! [`GraphFetcher`] owns the retry discipline; a [`GraphTransport`] performs
//! one attempt and reports a tagged [`AttemptOutcome`], so a retryable
//! failure can never be mistaken for a template problem further up.

pub mod fetcher;
pub mod transport;

pub use fetcher::{
    BASE_RETRY_INTERVAL_MS, FETCH_TIMEOUT_MS, FetchPolicy, GraphFetcher, MAX_RETRIES,
};
pub use transport::{AttemptOutcome, GraphTransport, HttpTransport};
