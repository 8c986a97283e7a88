//! Error types for tcgraph.
//!
//! Each collaborator has its own error enum so that the job can tell a
//! recoverable template failure apart from a fatal fetch, lookup or
//! submission failure. [`JobError`] wraps all of them without changing kind.

use thiserror::Error;

/// Failure to fetch a graph template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Could not fetch graph at {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Graph request for {url} rejected: {reason}")]
    Rejected { url: String, reason: String },
}

impl FetchError {
    /// URL the failed fetch was aimed at.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Exhausted { url, .. } | FetchError::Rejected { url, .. } => url,
        }
    }
}

/// Failure to turn template text into a graph document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template syntax error: {0}")]
    Syntax(String),

    #[error("Graph template must be a mapping at the root")]
    NotAMapping,

    #[error("Template render error: {0}")]
    Render(String),
}

impl TemplateError {
    /// Human readable diagnostic handed to the error graph.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushlogError {
    #[error("Push {push_id} not found in {repo}")]
    NotFound { repo: String, push_id: u64 },

    #[error("Push {push_id} has no changesets")]
    EmptyPush { push_id: u64 },

    #[error("Pushlog request failed: {0}")]
    Http(String),

    #[error("Malformed pushlog response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Scope list for {0} is empty")]
    EmptyScopes(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler rejected task graph (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Scheduler request failed: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid repository url {url}: {reason}")]
pub struct UrlError {
    pub url: String,
    pub reason: String,
}

/// Unrecoverable failure of one job run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Push lookup failed: {0}")]
    Lookup(#[from] PushlogError),

    #[error(transparent)]
    RepositoryUrl(#[from] UrlError),

    #[error("Project configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Graph fetch failed: {0}")]
    Fetch(#[source] FetchError),

    #[error("Error graph fetch failed: {0}")]
    FallbackFetch(#[source] FetchError),

    #[error("Error graph could not be instantiated: {0}")]
    FallbackInstantiation(#[source] TemplateError),

    #[error("Task graph submission failed: {0}")]
    Submission(#[from] SchedulerError),

    #[error("Job cancelled before submission")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, JobError>;
