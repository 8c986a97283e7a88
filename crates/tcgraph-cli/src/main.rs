//! tcgraph CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod handlers;

use commands::{Commands, LogFormat};
use tcgraph_config::ServiceConfig;

#[derive(Parser)]
#[command(name = "tcgraph")]
#[command(author, version, about = "Submit task graphs for pushed revisions", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./tcgraph.yaml when present)
    #[arg(long, global = true, env = "TCGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::ParseUrl { url } => handlers::parse_url(&url)?,
        Commands::Run { job } => {
            let config = ServiceConfig::load(cli.config.as_deref())?;
            handlers::run(&config, job.into_input()?).await?
        }
        Commands::DryRun { job } => {
            let config = ServiceConfig::load(cli.config.as_deref())?;
            handlers::dry_run(&config, job.into_input()?).await?
        }
    }

    Ok(())
}
