//! Graph submission orchestration.

use crate::state::{RunHistory, RunState};
use crate::variables::{graph_variables, url_variables};
use std::future::Future;
use std::sync::Arc;
use tcgraph_core::ports::{GraphInstantiator, ProjectConfig, PushLog, SchedulerFactory};
use tcgraph_core::urls;
use tcgraph_core::{
    GraphDocument, GraphJobInput, JobError, PushlogError, Result, SubmissionId, SubmittedGraph,
    TemplateError, TemplateVariables,
};
use tcgraph_fetch::GraphFetcher;
use tracing::{Instrument, Span, error, info, info_span, warn};

/// Which template produced the submitted graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphOutcome {
    /// The project's own graph template.
    Primary,
    /// The error graph, standing in for a template that failed to instantiate.
    Fallback,
}

/// A graph ready for (or already handed to) the scheduler.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: SubmissionId,
    pub graph: SubmittedGraph,
    /// URL of the primary graph template.
    pub source: String,
    pub outcome: GraphOutcome,
    pub history: RunHistory,
}

/// The graph job.
///
/// Collaborators are handed in at construction; a single instance can serve
/// any number of runs, each of which builds its own state.
pub struct GraphJob {
    pushlog: Arc<dyn PushLog>,
    projects: Arc<dyn ProjectConfig>,
    fetcher: GraphFetcher,
    instantiator: Arc<dyn GraphInstantiator>,
    schedulers: Arc<dyn SchedulerFactory>,
}

impl GraphJob {
    pub fn new(
        pushlog: Arc<dyn PushLog>,
        projects: Arc<dyn ProjectConfig>,
        fetcher: GraphFetcher,
        instantiator: Arc<dyn GraphInstantiator>,
        schedulers: Arc<dyn SchedulerFactory>,
    ) -> Self {
        Self {
            pushlog,
            projects,
            fetcher,
            instantiator,
            schedulers,
        }
    }

    /// Build and submit the task graph for a push.
    pub async fn run(&self, job: &GraphJobInput) -> Result<Submission> {
        async {
            let submission = self.build(job).await?;
            self.submit(submission).await
        }
        .instrument(job_span(job))
        .await
    }

    /// Build the task graph for a push without submitting it.
    pub async fn prepare(&self, job: &GraphJobInput) -> Result<Submission> {
        self.build(job).instrument(job_span(job)).await
    }

    /// Like [`GraphJob::run`], but gives up as soon as `cancelled` resolves.
    ///
    /// Cancellation is honoured until the graph is ready. Once submission has
    /// started it runs to completion, so the scheduler never sees a request
    /// whose outcome the caller discarded.
    pub async fn run_until_cancelled<F>(
        &self,
        job: &GraphJobInput,
        cancelled: F,
    ) -> Result<Submission>
    where
        F: Future<Output = ()>,
    {
        let span = job_span(job);
        let submission = tokio::select! {
            biased;
            () = cancelled => {
                span.in_scope(|| warn!("Graph job cancelled before submission"));
                return Err(JobError::Cancelled);
            }
            built = self.build(job).instrument(span.clone()) => built?,
        };
        self.submit(submission).instrument(span).await
    }

    async fn build(&self, job: &GraphJobInput) -> Result<Submission> {
        let mut history = RunHistory::new();

        let push = self.pushlog.get_one(&job.repo.url, job.pushref.id).await?;
        let changeset = push
            .tip()
            .ok_or(PushlogError::EmptyPush { push_id: push.id })?
            .clone();
        history.advance(RunState::PushResolved);

        let parts = urls::resolve(&job.repo.url)?;
        let url_vars = url_variables(&job.repo.alias, &changeset, &parts);
        let graph_url = self.projects.url(&job.repo.alias, &url_vars);

        info!(url = %graph_url, revision = %changeset.node, "Graph url resolved");
        let text = match self.fetcher.fetch(&graph_url).await {
            Ok(text) => text,
            Err(e) => {
                history.advance(RunState::FetchFailed);
                return Err(JobError::Fetch(e));
            }
        };
        history.advance(RunState::PrimaryFetched);

        let variables = graph_variables(job, &push, &changeset, &graph_url);
        let (document, outcome) = match self.instantiator.instantiate(&text, &variables) {
            Ok(document) => {
                history.advance(RunState::Instantiated);
                (document, GraphOutcome::Primary)
            }
            Err(e) => {
                history.advance(RunState::InstantiationFailed);
                warn!(error = %e.diagnostic(), "Error creating graph due to template errors");
                let document = self
                    .error_graph(&url_vars, variables, &e, &mut history)
                    .await?;
                (document, GraphOutcome::Fallback)
            }
        };

        let scopes = self.projects.scopes(&job.repo.alias)?;
        let graph = document.with_scopes(scopes);
        history.advance(RunState::ScopesAssigned);

        Ok(Submission {
            id: SubmissionId::new(),
            graph,
            source: graph_url,
            outcome,
            history,
        })
    }

    /// Fetch and instantiate the error graph reporting `failure`.
    async fn error_graph(
        &self,
        url_vars: &TemplateVariables,
        mut variables: TemplateVariables,
        failure: &TemplateError,
        history: &mut RunHistory,
    ) -> Result<GraphDocument> {
        let error_url = self.projects.error_task_url(url_vars);
        info!(url = %error_url, "Falling back to error graph");

        let text = match self.fetcher.fetch(&error_url).await {
            Ok(text) => text,
            Err(e) => {
                history.advance(RunState::FetchFailed);
                return Err(JobError::FallbackFetch(e));
            }
        };
        history.advance(RunState::FallbackFetched);

        variables.insert("error", failure.diagnostic());
        let document = self
            .instantiator
            .instantiate(&text, &variables)
            .map_err(JobError::FallbackInstantiation)?;
        history.advance(RunState::FallbackInstantiated);
        Ok(document)
    }

    async fn submit(&self, mut submission: Submission) -> Result<Submission> {
        let scopes = submission.graph.scopes();
        let scheduler = self.schedulers.connect(scopes)?;

        info!(
            task_graph_id = %submission.id,
            scopes = %scopes.joined(),
            "Posting task graph"
        );
        if let Err(e) = scheduler
            .create_task_graph(&submission.id, &submission.graph)
            .await
        {
            submission.history.advance(RunState::SubmissionFailed);
            error!(task_graph_id = %submission.id, error = ?e, "Task graph submission failed");
            return Err(JobError::Submission(e));
        }

        submission.history.advance(RunState::Submitted);
        Ok(submission)
    }
}

fn job_span(job: &GraphJobInput) -> Span {
    info_span!(
        "graph_job",
        alias = %job.repo.alias,
        push_id = job.pushref.id,
        revision_hash = %job.revision_hash
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tcgraph_config::TryConfig;
    use tcgraph_core::ports::TaskScheduler;
    use tcgraph_core::{Changeset, Push, PushRef, Repository, ScopeList, SchedulerError};
    use tcgraph_fetch::{AttemptOutcome, FetchPolicy, GraphTransport};
    use tcgraph_template::YamlInstantiator;

    const PRIMARY_URL: &str = "https://hg.mozilla.org/try/raw-file/deadbeef/graph.yml";
    const ERROR_URL: &str = "https://tasks.example.com/try/error.yml";

    const PROJECTS: &str = r#"
default_url: "{{host}}{{path}}/raw-file/{{revision}}/graph.yml"
error_task_url: "https://tasks.example.com/{{alias}}/error.yml"
default_scopes: ["scheduler:create-task-graph"]
projects:
  try:
    scopes:
      - "queue:define-task:aws-provisioner/build"
      - "scheduler:create-task-graph"
"#;

    const GOOD_GRAPH: &str = r#"
metadata:
  name: "{{project}} {{pushlog_id}}"
  source: "{{source}}"
tasks:
  - taskId: "{{#as_slugid}}build{{/as_slugid}}"
    task:
      payload:
        revision: "{{revision}}"
"#;

    const BROKEN_GRAPH: &str = "tasks:\n  - taskId: [unclosed\n";

    const ERROR_GRAPH: &str = r#"
metadata:
  name: "Error in {{project}} graph"
  description: "{{error}}"
tasks: []
"#;

    struct FixedPushlog(std::result::Result<Push, PushlogError>);

    #[async_trait]
    impl PushLog for FixedPushlog {
        async fn get_one(
            &self,
            _repo_url: &str,
            _push_id: u64,
        ) -> std::result::Result<Push, PushlogError> {
            self.0.clone()
        }
    }

    /// Never answers.
    struct HangingPushlog;

    #[async_trait]
    impl PushLog for HangingPushlog {
        async fn get_one(
            &self,
            _repo_url: &str,
            _push_id: u64,
        ) -> std::result::Result<Push, PushlogError> {
            std::future::pending().await
        }
    }

    /// Serves fixed bodies per URL; unknown URLs fail transiently.
    #[derive(Default)]
    struct MapTransport {
        bodies: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl MapTransport {
        fn serving(bodies: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                calls: Mutex::new(vec![]),
            })
        }

        fn calls_to(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    #[async_trait]
    impl GraphTransport for MapTransport {
        async fn get(&self, url: &str, _timeout: Duration) -> AttemptOutcome {
            self.calls.lock().unwrap().push(url.to_string());
            match self.bodies.get(url) {
                Some(body) => AttemptOutcome::Fetched(body.clone()),
                None => AttemptOutcome::Transient(format!("{url} returned 404 Not Found")),
            }
        }
    }

    /// Instantiates for real and remembers the variables of every call.
    #[derive(Default)]
    struct RecordingInstantiator {
        inner: YamlInstantiator,
        calls: Mutex<Vec<TemplateVariables>>,
    }

    impl GraphInstantiator for RecordingInstantiator {
        fn instantiate(
            &self,
            template: &str,
            variables: &TemplateVariables,
        ) -> std::result::Result<GraphDocument, TemplateError> {
            self.calls.lock().unwrap().push(variables.clone());
            self.inner.instantiate(template, variables)
        }
    }

    #[derive(Default)]
    struct Submissions {
        connected: Vec<ScopeList>,
        graphs: Vec<(SubmissionId, Value)>,
    }

    #[derive(Default)]
    struct RecordingSchedulers {
        submissions: Arc<Mutex<Submissions>>,
        reject: bool,
    }

    struct RecordingScheduler {
        submissions: Arc<Mutex<Submissions>>,
        reject: bool,
    }

    #[async_trait]
    impl TaskScheduler for RecordingScheduler {
        async fn create_task_graph(
            &self,
            id: &SubmissionId,
            graph: &SubmittedGraph,
        ) -> std::result::Result<(), SchedulerError> {
            if self.reject {
                return Err(SchedulerError::Rejected {
                    status: 400,
                    body: "malformed graph".to_string(),
                });
            }
            self.submissions
                .lock()
                .unwrap()
                .graphs
                .push((*id, serde_json::to_value(graph).unwrap()));
            Ok(())
        }
    }

    impl SchedulerFactory for RecordingSchedulers {
        fn connect(
            &self,
            authorized_scopes: &ScopeList,
        ) -> std::result::Result<Box<dyn TaskScheduler>, SchedulerError> {
            self.submissions
                .lock()
                .unwrap()
                .connected
                .push(authorized_scopes.clone());
            Ok(Box::new(RecordingScheduler {
                submissions: self.submissions.clone(),
                reject: self.reject,
            }))
        }
    }

    struct Harness {
        job: GraphJob,
        transport: Arc<MapTransport>,
        instantiator: Arc<RecordingInstantiator>,
        schedulers: Arc<RecordingSchedulers>,
    }

    fn push() -> Push {
        Push {
            id: 42,
            user: "dev@example.com".to_string(),
            changesets: vec![Changeset {
                node: "deadbeef".to_string(),
                desc: "fix bug".to_string(),
            }],
        }
    }

    fn input() -> GraphJobInput {
        GraphJobInput {
            revision_hash: "abc123".to_string(),
            pushref: PushRef { id: 42 },
            repo: Repository {
                url: "https://hg.mozilla.org/try/".to_string(),
                alias: "try".to_string(),
            },
        }
    }

    fn try_scopes() -> Vec<String> {
        vec![
            "queue:define-task:aws-provisioner/build".to_string(),
            "scheduler:create-task-graph".to_string(),
        ]
    }

    fn harness_with(
        pushlog: Arc<dyn PushLog>,
        bodies: &[(&str, &str)],
        reject: bool,
    ) -> Harness {
        let projects: TryConfig = serde_yaml::from_str(PROJECTS).unwrap();
        let transport = MapTransport::serving(bodies);
        let instantiator = Arc::new(RecordingInstantiator::default());
        let schedulers = Arc::new(RecordingSchedulers {
            reject,
            ..Default::default()
        });
        let policy = FetchPolicy {
            base_interval: Duration::from_millis(10),
            ..FetchPolicy::default()
        };

        Harness {
            job: GraphJob::new(
                pushlog,
                Arc::new(projects),
                GraphFetcher::new(transport.clone(), policy),
                instantiator.clone(),
                schedulers.clone(),
            ),
            transport,
            instantiator,
            schedulers,
        }
    }

    fn harness(bodies: &[(&str, &str)]) -> Harness {
        harness_with(Arc::new(FixedPushlog(Ok(push()))), bodies, false)
    }

    #[tokio::test]
    async fn test_primary_graph_is_submitted() {
        let h = harness(&[(PRIMARY_URL, GOOD_GRAPH), (ERROR_URL, ERROR_GRAPH)]);

        let submission = h.job.run(&input()).await.unwrap();

        assert_eq!(submission.outcome, GraphOutcome::Primary);
        assert_eq!(submission.source, PRIMARY_URL);
        assert_eq!(h.transport.calls_to(PRIMARY_URL), 1);
        assert_eq!(h.transport.calls_to(ERROR_URL), 0);

        let calls = h.instantiator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get_str("revision"), Some("deadbeef"));
        assert_eq!(calls[0].get_str("project"), Some("try"));

        let submissions = h.schedulers.submissions.lock().unwrap();
        assert_eq!(submissions.graphs.len(), 1);
        let (id, graph) = &submissions.graphs[0];
        assert_eq!(*id, submission.id);
        assert_eq!(graph["scopes"], json!(try_scopes()));
        assert_eq!(graph["metadata"]["name"], "try 42");
        assert_eq!(graph["tasks"][0]["task"]["payload"]["revision"], "deadbeef");
        assert_eq!(submissions.connected[0].as_slice(), try_scopes().as_slice());

        assert_eq!(
            submission.history.states(),
            [
                RunState::Init,
                RunState::PushResolved,
                RunState::PrimaryFetched,
                RunState::Instantiated,
                RunState::ScopesAssigned,
                RunState::Submitted,
            ]
        );
    }

    #[tokio::test]
    async fn test_broken_template_submits_error_graph() {
        let h = harness(&[(PRIMARY_URL, BROKEN_GRAPH), (ERROR_URL, ERROR_GRAPH)]);

        let submission = h.job.run(&input()).await.unwrap();

        assert_eq!(submission.outcome, GraphOutcome::Fallback);
        assert_eq!(h.transport.calls_to(ERROR_URL), 1);

        let calls = h.instantiator.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(!calls[0].contains("error"));
        let diagnostic = calls[1].get_str("error").unwrap();
        assert!(diagnostic.starts_with("Template syntax error"));
        assert_eq!(calls[1].get_str("revision"), Some("deadbeef"));

        let submissions = h.schedulers.submissions.lock().unwrap();
        assert_eq!(submissions.graphs.len(), 1);
        let graph = &submissions.graphs[0].1;
        assert_eq!(graph["metadata"]["name"], "Error in try graph");
        assert_eq!(graph["metadata"]["description"], diagnostic);
        assert_eq!(graph["scopes"], json!(try_scopes()));
        assert_eq!(submission.history.current(), RunState::Submitted);
        assert!(
            submission
                .history
                .states()
                .contains(&RunState::FallbackInstantiated)
        );
    }

    #[tokio::test]
    async fn test_primary_fetch_failure_is_fatal() {
        let h = harness(&[(ERROR_URL, ERROR_GRAPH)]);

        let err = h.job.run(&input()).await.unwrap_err();

        match err {
            JobError::Fetch(e) => assert!(e.to_string().contains(PRIMARY_URL)),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(h.transport.calls_to(PRIMARY_URL), 2);
        assert_eq!(h.transport.calls_to(ERROR_URL), 0);
        assert!(h.instantiator.calls.lock().unwrap().is_empty());
        assert!(h.schedulers.submissions.lock().unwrap().graphs.is_empty());
    }

    #[tokio::test]
    async fn test_error_graph_fetch_failure_is_fatal() {
        let h = harness(&[(PRIMARY_URL, BROKEN_GRAPH)]);

        let err = h.job.run(&input()).await.unwrap_err();

        assert!(matches!(err, JobError::FallbackFetch(_)));
        assert_eq!(h.transport.calls_to(ERROR_URL), 2);
        assert!(h.schedulers.submissions.lock().unwrap().connected.is_empty());
    }

    #[tokio::test]
    async fn test_broken_error_graph_is_fatal() {
        let h = harness(&[(PRIMARY_URL, BROKEN_GRAPH), (ERROR_URL, BROKEN_GRAPH)]);

        let err = h.job.run(&input()).await.unwrap_err();

        assert!(matches!(err, JobError::FallbackInstantiation(_)));
        assert!(h.schedulers.submissions.lock().unwrap().graphs.is_empty());
    }

    #[tokio::test]
    async fn test_submission_failure_is_fatal() {
        let h = harness_with(
            Arc::new(FixedPushlog(Ok(push()))),
            &[(PRIMARY_URL, GOOD_GRAPH)],
            true,
        );

        let err = h.job.run(&input()).await.unwrap_err();

        assert!(matches!(
            err,
            JobError::Submission(SchedulerError::Rejected { status: 400, .. })
        ));
        assert_eq!(h.schedulers.submissions.lock().unwrap().connected.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_fatal() {
        let h = harness_with(
            Arc::new(FixedPushlog(Err(PushlogError::NotFound {
                repo: "https://hg.mozilla.org/try/".to_string(),
                push_id: 42,
            }))),
            &[(PRIMARY_URL, GOOD_GRAPH)],
            false,
        );

        let err = h.job.run(&input()).await.unwrap_err();

        assert!(matches!(err, JobError::Lookup(PushlogError::NotFound { .. })));
        assert!(h.transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_push_without_changesets_is_fatal() {
        let empty = Push {
            changesets: vec![],
            ..push()
        };
        let h = harness_with(
            Arc::new(FixedPushlog(Ok(empty))),
            &[(PRIMARY_URL, GOOD_GRAPH)],
            false,
        );

        let err = h.job.run(&input()).await.unwrap_err();
        assert!(matches!(err, JobError::Lookup(PushlogError::EmptyPush { .. })));
    }

    #[tokio::test]
    async fn test_runs_never_share_submission_ids() {
        let h = harness(&[(PRIMARY_URL, GOOD_GRAPH)]);

        let first = h.job.run(&input()).await.unwrap();
        let second = h.job.run(&input()).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(h.schedulers.submissions.lock().unwrap().graphs.len(), 2);
    }

    #[tokio::test]
    async fn test_prepare_does_not_submit() {
        let h = harness(&[(PRIMARY_URL, GOOD_GRAPH)]);

        let prepared = h.job.prepare(&input()).await.unwrap();

        assert_eq!(prepared.history.current(), RunState::ScopesAssigned);
        assert_eq!(prepared.graph.scopes().as_slice(), try_scopes().as_slice());
        assert!(h.schedulers.submissions.lock().unwrap().connected.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_prevents_submission() {
        let h = harness_with(Arc::new(HangingPushlog), &[(PRIMARY_URL, GOOD_GRAPH)], false);

        let err = h
            .job
            .run_until_cancelled(&input(), tokio::time::sleep(Duration::from_secs(60)))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Cancelled));
        assert!(h.schedulers.submissions.lock().unwrap().connected.is_empty());
    }

    #[tokio::test]
    async fn test_uncancelled_run_submits() {
        let h = harness(&[(PRIMARY_URL, GOOD_GRAPH)]);

        let submission = h
            .job
            .run_until_cancelled(&input(), std::future::pending())
            .await
            .unwrap();

        assert_eq!(submission.history.current(), RunState::Submitted);
        assert_eq!(h.schedulers.submissions.lock().unwrap().graphs.len(), 1);
    }
}
