//! Job input and push metadata.

use serde::{Deserialize, Serialize};

/// Input to one run of the graph job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphJobInput {
    pub revision_hash: String,
    pub pushref: PushRef,
    pub repo: Repository,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRef {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository URL, e.g. `https://hg.mozilla.org/try/`.
    pub url: String,
    /// Project alias used to look up configuration.
    pub alias: String,
}

/// A set of changesets pushed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Push {
    pub id: u64,
    pub user: String,
    pub changesets: Vec<Changeset>,
}

impl Push {
    /// The changeset under consideration: the last one pushed.
    pub fn tip(&self) -> Option<&Changeset> {
        self.changesets.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// Revision id.
    pub node: String,
    /// Commit message.
    pub desc: String,
}
