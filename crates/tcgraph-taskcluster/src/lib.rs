//! HTTP adapters for the services the graph job talks to: the Mercurial
//! pushlog and the task-graph scheduler.

pub mod pushlog;
pub mod scheduler;

pub use pushlog::HgPushlog;
pub use scheduler::{HttpSchedulerFactory, SchedulerClient};
