//! The task-graph submission job.
//!
//! Given a push, [`GraphJob`] resolves the project's graph template, turns it
//! into a task graph and submits it to the scheduler. A template that fails
//! to instantiate is replaced by the project's error graph, so every push
//! ends in exactly one submission or a propagated error.

pub mod orchestrator;
pub mod state;
pub mod variables;

pub use orchestrator::{GraphJob, GraphOutcome, Submission};
pub use state::{RunHistory, RunState};
