//! Per-run state machine.

use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    PushResolved,
    PrimaryFetched,
    Instantiated,
    InstantiationFailed,
    FallbackFetched,
    FallbackInstantiated,
    ScopesAssigned,
    Submitted,
    FetchFailed,
    SubmissionFailed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Submitted | RunState::FetchFailed | RunState::SubmissionFailed
        )
    }

    /// Whether `self` may directly follow `previous`.
    pub fn follows(self, previous: RunState) -> bool {
        use RunState::*;
        matches!(
            (previous, self),
            (Init, PushResolved)
                | (PushResolved, PrimaryFetched)
                | (PushResolved, FetchFailed)
                | (PrimaryFetched, Instantiated)
                | (PrimaryFetched, InstantiationFailed)
                | (InstantiationFailed, FallbackFetched)
                | (InstantiationFailed, FetchFailed)
                | (FallbackFetched, FallbackInstantiated)
                | (Instantiated, ScopesAssigned)
                | (FallbackInstantiated, ScopesAssigned)
                | (ScopesAssigned, Submitted)
                | (ScopesAssigned, SubmissionFailed)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// States a run has passed through, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHistory(Vec<RunState>);

impl RunHistory {
    pub fn new() -> Self {
        Self(vec![RunState::Init])
    }

    pub fn current(&self) -> RunState {
        self.0.last().copied().unwrap_or(RunState::Init)
    }

    pub fn advance(&mut self, next: RunState) {
        let current = self.current();
        debug_assert!(
            next.follows(current),
            "invalid transition {current} -> {next}"
        );
        debug!(from = %current, to = %next, "Graph job state");
        self.0.push(next);
    }

    pub fn states(&self) -> &[RunState] {
        &self.0
    }
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::new()
    }
}
