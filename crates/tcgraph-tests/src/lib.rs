//! End-to-end test infrastructure for tcgraph.
//!
//! A single wiremock server stands in for the pushlog, the template host and
//! the scheduler, so a whole graph job runs over real HTTP.
//!
//! # Usage
//!
//! ```ignore
//! use tcgraph_tests::TestContext;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let ctx = TestContext::new().await;
//!     ctx.mount_push(&PushFixture::single()).await;
//!     let submission = ctx.graph_job().run(&ctx.job_input()).await;
//! }
//! ```

pub mod context;
pub mod fixtures;

pub use context::TestContext;
pub use fixtures::*;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,tcgraph_job=debug")),
        )
        .with_test_writer()
        .try_init();
}
