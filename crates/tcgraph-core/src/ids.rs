//! Slug identifiers.
//!
//! The scheduler names task graphs with 22 character URL-safe slugs: a v4
//! UUID encoded as unpadded base64url.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("invalid slug encoding: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("invalid slug payload: {0}")]
    Uuid(#[from] uuid::Error),
}

/// Generate a fresh random slug.
pub fn slugid() -> String {
    encode(&Uuid::new_v4())
}

fn encode(uuid: &Uuid) -> String {
    URL_SAFE_NO_PAD.encode(uuid.as_bytes())
}

/// Identifier a task graph is submitted under.
///
/// Generated fresh per run; never derived from job data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SubmissionId(Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.0))
    }
}

impl std::str::FromStr for SubmissionId {
    type Err = IdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        Ok(Self(Uuid::from_slice(&bytes)?))
    }
}

impl From<SubmissionId> for String {
    fn from(id: SubmissionId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for SubmissionId {
    type Error = IdError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}
