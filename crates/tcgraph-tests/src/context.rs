//! Test context wiring a graph job to a mock server.

use crate::fixtures::{ALIAS, PUSH_ID, REVISION, REVISION_HASH, TRY_SCOPES};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tcgraph_config::{
    Credentials, FetchSettings, ProjectOverride, PushlogSettings, SchedulerSettings,
    ServiceConfig, TryConfig,
};
use tcgraph_core::{GraphJobInput, PushRef, Repository};
use tcgraph_fetch::{FetchPolicy, GraphFetcher};
use tcgraph_job::GraphJob;
use tcgraph_taskcluster::{HgPushlog, HttpSchedulerFactory};
use tcgraph_template::YamlInstantiator;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Backoff unit used by test jobs.
pub const TEST_RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// A mock server serving pushlog, templates and scheduler, plus the
/// configuration pointing at it.
pub struct TestContext {
    pub server: MockServer,
    pub config: ServiceConfig,
}

impl TestContext {
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let uri = server.uri();

        let mut projects = HashMap::new();
        projects.insert(
            ALIAS.to_string(),
            ProjectOverride {
                url: None,
                scopes: Some(TRY_SCOPES.iter().map(|s| s.to_string()).collect()),
            },
        );

        let config = ServiceConfig {
            scheduler: SchedulerSettings {
                base_url: format!("{uri}/v1"),
                credentials: Credentials {
                    client_id: "tcgraph-test".to_string(),
                    access_token: "secret".to_string(),
                },
            },
            pushlog: PushlogSettings { timeout_secs: 5 },
            fetch: FetchSettings {
                max_retries: 2,
                base_interval_ms: TEST_RETRY_INTERVAL.as_millis() as u64,
                timeout_ms: 5000,
            },
            try_config: TryConfig {
                default_url: "{{host}}{{path}}/raw-file/{{revision}}/graph.yml".to_string(),
                default_scopes: vec!["scheduler:create-task-graph".to_string()],
                error_task_url: format!("{uri}/templates/{{{{alias}}}}/error.yml"),
                projects,
            },
        };

        Self { server, config }
    }

    /// The repository URL of the `try` project on this server.
    pub fn repo_url(&self) -> String {
        format!("{}/{ALIAS}/", self.server.uri())
    }

    pub fn job_input(&self) -> GraphJobInput {
        GraphJobInput {
            revision_hash: REVISION_HASH.to_string(),
            pushref: PushRef { id: PUSH_ID },
            repo: Repository {
                url: self.repo_url(),
                alias: ALIAS.to_string(),
            },
        }
    }

    pub fn graph_path() -> String {
        format!("/{ALIAS}/raw-file/{REVISION}/graph.yml")
    }

    pub fn error_graph_path() -> String {
        format!("/templates/{ALIAS}/error.yml")
    }

    /// Graph job talking to this server over HTTP.
    pub fn graph_job(&self) -> GraphJob {
        let fetch = &self.config.fetch;
        let policy = FetchPolicy {
            max_retries: fetch.max_retries,
            base_interval: Duration::from_millis(fetch.base_interval_ms),
            timeout: Duration::from_millis(fetch.timeout_ms),
        };

        GraphJob::new(
            Arc::new(HgPushlog::new(Duration::from_secs(
                self.config.pushlog.timeout_secs,
            ))),
            Arc::new(self.config.try_config.clone()),
            GraphFetcher::http(policy),
            Arc::new(YamlInstantiator::new()),
            Arc::new(HttpSchedulerFactory::new(self.config.scheduler.clone())),
        )
    }

    pub async fn mount_push(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/{ALIAS}/json-pushes")))
            .and(query_param("endID", PUSH_ID.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_text(&self, at: String, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_scheduler(&self, status: u16) {
        Mock::given(method("PUT"))
            .and(path_regex(r"^/v1/task-graph/[A-Za-z0-9_-]{22}$"))
            .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({})))
            .mount(&self.server)
            .await;
    }

    pub async fn requests_to(&self, at: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == at)
            .collect()
    }

    /// Bodies of all task graphs sent to the scheduler.
    pub async fn submitted_graphs(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == "PUT")
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
