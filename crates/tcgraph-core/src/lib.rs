//! tcgraph core
//!
//! Domain types, traits, and error handling for the task-graph submission job.
//! Every other crate in the workspace speaks in terms of the vocabulary
//! defined here: pushes and changesets, template variables, graph documents,
//! scope lists and the ports to the external services.

pub mod error;
pub mod graph;
pub mod ids;
pub mod ports;
pub mod push;
pub mod urls;

pub use error::{
    ConfigError, FetchError, JobError, PushlogError, Result, SchedulerError, TemplateError,
    UrlError,
};
pub use graph::{GraphDocument, ScopeList, SubmittedGraph, TemplateVariables};
pub use ids::SubmissionId;
pub use push::{Changeset, GraphJobInput, Push, PushRef, Repository};
pub use urls::UrlParts;
