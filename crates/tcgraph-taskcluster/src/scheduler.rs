//! Task-graph scheduler client.
//!
//! Credentials are passed through untouched. Each client is bound to the
//! scope list it was connected with and never asks for more.

use async_trait::async_trait;
use reqwest::Client;
use tcgraph_config::{Credentials, SchedulerSettings};
use tcgraph_core::ports::{SchedulerFactory, TaskScheduler};
use tcgraph_core::{ScopeList, SchedulerError, SubmissionId, SubmittedGraph};
use tracing::{debug, info};

/// Header carrying the JSON-encoded authorized scopes.
pub const AUTHORIZED_SCOPES_HEADER: &str = "x-authorized-scopes";

pub struct SchedulerClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    authorized_scopes: ScopeList,
}

impl SchedulerClient {
    pub fn new(
        client: Client,
        base_url: &str,
        credentials: Credentials,
        authorized_scopes: ScopeList,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            authorized_scopes,
        }
    }

    pub fn authorized_scopes(&self) -> &ScopeList {
        &self.authorized_scopes
    }
}

#[async_trait]
impl TaskScheduler for SchedulerClient {
    async fn create_task_graph(
        &self,
        id: &SubmissionId,
        graph: &SubmittedGraph,
    ) -> Result<(), SchedulerError> {
        let url = format!("{}/task-graph/{}", self.base_url, id);
        let scopes = serde_json::to_string(&self.authorized_scopes)?;
        debug!(url = %url, "Creating task graph");

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.access_token))
            .header(AUTHORIZED_SCOPES_HEADER, scopes)
            .json(graph)
            .send()
            .await
            .map_err(|e| SchedulerError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(task_graph_id = %id, "Task graph created");
        Ok(())
    }
}

/// Connects scheduler clients using the service's scheduler settings.
pub struct HttpSchedulerFactory {
    client: Client,
    settings: SchedulerSettings,
}

impl HttpSchedulerFactory {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self {
            client: Client::builder().build().unwrap_or_default(),
            settings,
        }
    }
}

impl SchedulerFactory for HttpSchedulerFactory {
    fn connect(
        &self,
        authorized_scopes: &ScopeList,
    ) -> Result<Box<dyn TaskScheduler>, SchedulerError> {
        Ok(Box::new(SchedulerClient::new(
            self.client.clone(),
            &self.settings.base_url,
            self.settings.credentials.clone(),
            authorized_scopes.clone(),
        )))
    }
}
