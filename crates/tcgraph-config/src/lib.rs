//! Configuration for tcgraph.
//!
//! [`TryConfig`] maps project aliases to graph URL patterns and scopes;
//! [`ServiceConfig`] is everything the job needs at process start.

pub mod project;
pub mod service;

pub use project::{ProjectOverride, TryConfig};
pub use service::{
    Credentials, FetchSettings, PushlogSettings, SchedulerSettings, ServiceConfig,
};
