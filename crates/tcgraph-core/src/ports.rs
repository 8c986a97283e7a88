//! Port traits.
//!
//! These traits define the interfaces between the graph job and the
//! services it coordinates. Adapters live in the other workspace crates.

use crate::error::{ConfigError, PushlogError, SchedulerError, TemplateError};
use crate::graph::{GraphDocument, ScopeList, SubmittedGraph, TemplateVariables};
use crate::ids::SubmissionId;
use crate::push::Push;
use async_trait::async_trait;

/// Push metadata lookup.
#[async_trait]
pub trait PushLog: Send + Sync {
    /// Get a single push of a repository by id.
    async fn get_one(&self, repo_url: &str, push_id: u64) -> Result<Push, PushlogError>;
}

/// Per-project graph locations and scopes.
pub trait ProjectConfig: Send + Sync {
    /// URL of the graph template for a project, rendered with `variables`.
    fn url(&self, alias: &str, variables: &TemplateVariables) -> String;

    /// URL of the error graph template, rendered with `variables`.
    fn error_task_url(&self, variables: &TemplateVariables) -> String;

    /// Scopes a project's graphs are submitted with.
    fn scopes(&self, alias: &str) -> Result<ScopeList, ConfigError>;
}

/// Turns template text into a graph document.
pub trait GraphInstantiator: Send + Sync {
    fn instantiate(
        &self,
        template: &str,
        variables: &TemplateVariables,
    ) -> Result<GraphDocument, TemplateError>;
}

/// Client of the task scheduling service.
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    /// Submit a task graph under `id`.
    async fn create_task_graph(
        &self,
        id: &SubmissionId,
        graph: &SubmittedGraph,
    ) -> Result<(), SchedulerError>;
}

/// Builds scheduler clients restricted to a scope list.
pub trait SchedulerFactory: Send + Sync {
    fn connect(
        &self,
        authorized_scopes: &ScopeList,
    ) -> Result<Box<dyn TaskScheduler>, SchedulerError>;
}
