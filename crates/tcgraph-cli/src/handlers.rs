//! Command handlers.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tcgraph_config::{FetchSettings, ServiceConfig};
use tcgraph_core::{GraphJobInput, urls};
use tcgraph_fetch::{FetchPolicy, GraphFetcher};
use tcgraph_job::GraphJob;
use tcgraph_taskcluster::{HgPushlog, HttpSchedulerFactory};
use tcgraph_template::YamlInstantiator;
use tracing::info;

pub fn fetch_policy(settings: &FetchSettings) -> FetchPolicy {
    FetchPolicy {
        max_retries: settings.max_retries,
        base_interval: Duration::from_millis(settings.base_interval_ms),
        timeout: Duration::from_millis(settings.timeout_ms),
    }
}

/// Wire the job to the real pushlog, template host and scheduler.
pub fn graph_job(config: &ServiceConfig) -> GraphJob {
    GraphJob::new(
        Arc::new(HgPushlog::new(Duration::from_secs(config.pushlog.timeout_secs))),
        Arc::new(config.try_config.clone()),
        GraphFetcher::http(fetch_policy(&config.fetch)),
        Arc::new(YamlInstantiator::new()),
        Arc::new(HttpSchedulerFactory::new(config.scheduler.clone())),
    )
}

/// Submit the graph for `input`, stopping early on Ctrl-C.
pub async fn run(config: &ServiceConfig, input: GraphJobInput) -> anyhow::Result<()> {
    let job = graph_job(config);
    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let submission = job.run_until_cancelled(&input, interrupted).await?;
    info!(
        task_graph_id = %submission.id,
        outcome = ?submission.outcome,
        "Task graph submitted"
    );
    println!("{}", submission.id);
    Ok(())
}

/// Print the graph that `run` would submit.
pub async fn dry_run(config: &ServiceConfig, input: GraphJobInput) -> anyhow::Result<()> {
    let submission = graph_job(config).prepare(&input).await?;
    let graph = serde_json::to_string_pretty(&submission.graph)
        .context("serializing task graph")?;
    println!("{graph}");
    Ok(())
}

pub fn parse_url(url: &str) -> anyhow::Result<()> {
    let parts = urls::resolve(url)?;
    println!("host: {}", parts.host);
    println!("path: {}", parts.path);
    Ok(())
}
