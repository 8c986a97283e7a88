//! Mercurial pushlog client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tcgraph_core::ports::PushLog;
use tcgraph_core::{Changeset, Push, PushlogError};
use tracing::debug;

/// Reads pushes from `<repo>/json-pushes`.
#[derive(Debug, Clone)]
pub struct HgPushlog {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PushesResponse {
    pushes: HashMap<String, RawPush>,
}

#[derive(Debug, Deserialize)]
struct RawPush {
    user: String,
    #[serde(default)]
    changesets: Vec<RawChangeset>,
}

#[derive(Debug, Deserialize)]
struct RawChangeset {
    node: String,
    #[serde(default)]
    desc: String,
}

impl HgPushlog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn pushes_url(repo_url: &str, push_id: u64) -> String {
        format!(
            "{}/json-pushes?version=2&full=1&startID={}&endID={}",
            repo_url.trim_end_matches('/'),
            push_id.saturating_sub(1),
            push_id
        )
    }
}

#[async_trait]
impl PushLog for HgPushlog {
    async fn get_one(&self, repo_url: &str, push_id: u64) -> Result<Push, PushlogError> {
        let url = Self::pushes_url(repo_url, push_id);
        debug!(url = %url, "Looking up push");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PushlogError::Http(e.to_string()))?;

        let not_found = || PushlogError::NotFound {
            repo: repo_url.to_string(),
            push_id,
        };

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(not_found()),
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(PushlogError::Http(format!("{url} returned {status}: {body}")));
            }
        }

        let mut body: PushesResponse = response
            .json()
            .await
            .map_err(|e| PushlogError::Malformed(e.to_string()))?;

        let raw = body.pushes.remove(&push_id.to_string()).ok_or_else(not_found)?;
        if raw.changesets.is_empty() {
            return Err(PushlogError::EmptyPush { push_id });
        }

        Ok(Push {
            id: push_id,
            user: raw.user,
            changesets: raw
                .changesets
                .into_iter()
                .map(|c| Changeset {
                    node: c.node,
                    desc: c.desc,
                })
                .collect(),
        })
    }
}
