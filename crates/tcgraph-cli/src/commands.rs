//! CLI command definitions.

use anyhow::{Context, bail};
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;
use tcgraph_core::{GraphJobInput, PushRef, Repository};

#[derive(Subcommand)]
pub enum Commands {
    /// Build and submit the task graph for a push
    Run {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Build the task graph for a push and print it without submitting
    DryRun {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Split a repository URL into host and path
    ParseUrl {
        /// Repository URL
        url: String,
    },
}

/// Identifies the push a graph is built for.
#[derive(Args, Debug)]
pub struct JobArgs {
    /// JSON file holding the whole job
    #[arg(long, conflicts_with_all = ["repo_url", "alias", "push_id", "revision_hash"])]
    pub job: Option<PathBuf>,

    /// Repository URL
    #[arg(long)]
    pub repo_url: Option<String>,

    /// Project alias
    #[arg(long)]
    pub alias: Option<String>,

    /// Pushlog id of the push
    #[arg(long)]
    pub push_id: Option<u64>,

    /// Revision hash of the push
    #[arg(long)]
    pub revision_hash: Option<String>,
}

impl JobArgs {
    pub fn into_input(self) -> anyhow::Result<GraphJobInput> {
        if let Some(path) = self.job {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading job file {}", path.display()))?;
            return serde_json::from_str(&content)
                .with_context(|| format!("parsing job file {}", path.display()));
        }

        let (Some(url), Some(alias), Some(id), Some(revision_hash)) =
            (self.repo_url, self.alias, self.push_id, self.revision_hash)
        else {
            bail!("either --job or all of --repo-url, --alias, --push-id and --revision-hash are required");
        };

        Ok(GraphJobInput {
            revision_hash,
            pushref: PushRef { id },
            repo: Repository { url, alias },
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
