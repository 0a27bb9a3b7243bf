//! Job requests
//!
//! A [`JobRequest`] is assembled incrementally, submitted once, and then
//! followed either by polling ([`JobRequest::run_job`]) or through pushed
//! events ([`JobRequest::subscribe_completion`],
//! [`JobRequest::subscribe_messages`]). The two strategies are independent.
//!
//! Lifecycle:
//!
//! ```text
//! Unsubmitted --submit()--> Submitted(submitted)
//! Submitted   --poll-->     Submitted(running)
//! Submitted   --poll-->     Terminal(complete | failed)
//! ```
//!
//! Mutating a request after submission is allowed but has no effect on the
//! remote job; each such call records an [`Advisory`] and logs a warning.
//! A request is meant to be driven from one task at a time.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use futures::{Stream, StreamExt};
use mothr_core::domain::job::{JobField, JobRecord, JobStatus};
use mothr_core::domain::parameter::{Parameter, ParameterKind};
use mothr_core::dto::job::{JobSpec, SubmitJobResponse};
use tracing::{debug, info, warn};

use crate::MothrClient;
use crate::error::{ClientError, Result};
use crate::operations;

/// Non-fatal misuse recorded on a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// The request was changed after it had been submitted
    ModifiedAfterSubmit {
        job_id: String,
        change: &'static str,
    },
    /// An input or output parameter is not a storage URI
    NotStorageUri { kind: ParameterKind, value: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::ModifiedAfterSubmit { job_id, change } => write!(
                f,
                "job {job_id} has already been submitted, {change} will have no effect"
            ),
            Advisory::NotStorageUri { kind, value } => {
                write!(f, "{kind} parameter {value} is not an S3 URI")
            }
        }
    }
}

/// Options for [`JobRequest::run_job_with`]
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Delay between two status checks
    pub poll_interval: Duration,
    /// Return the record of a failed job instead of an error
    pub return_failed: bool,
    /// Give up after this many non-terminal status checks, at least 1
    pub max_polls: Option<u32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            return_failed: false,
            max_polls: None,
        }
    }
}

/// A job request and, once submitted, a handle on the remote job
pub struct JobRequest {
    client: MothrClient,
    spec: JobSpec,
    job_id: Option<String>,
    status: Option<JobStatus>,
    advisories: Vec<Advisory>,
}

impl JobRequest {
    /// Creates an unsubmitted request for `service`
    pub fn new(client: MothrClient, service: impl Into<String>) -> Self {
        Self::from_spec(client, JobSpec::new(service))
    }

    /// Creates an unsubmitted request from a prepared spec
    pub fn from_spec(client: MothrClient, spec: JobSpec) -> Self {
        Self {
            client,
            spec,
            job_id: None,
            status: None,
            advisories: Vec::new(),
        }
    }

    /// Identifier assigned on submission
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Last status seen for the job
    pub fn status(&self) -> Option<JobStatus> {
        self.status
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.spec.parameters
    }

    pub fn output_metadata(&self) -> &BTreeMap<String, String> {
        &self.spec.output_metadata
    }

    /// Advisories recorded so far, oldest first
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    // =============================================================================
    // Building
    // =============================================================================

    /// Add a parameter to the job request
    ///
    /// # Arguments
    /// * `value` - Parameter value
    /// * `kind` - Plain value, input or output
    /// * `name` - Parameter name or flag (e.g., `-i`, `--input`)
    ///
    /// Input and output values are expected to look like
    /// `s3://<bucket>/<key>`; other values are kept as given and recorded
    /// as an advisory.
    pub fn add_parameter(
        &mut self,
        value: impl Into<String>,
        kind: ParameterKind,
        name: Option<&str>,
    ) -> &mut Self {
        self.note_change("adding parameters");

        let parameter = Parameter::new(kind, value, name.map(str::to_string));
        if !parameter.has_valid_shape() {
            self.advise(Advisory::NotStorageUri {
                kind,
                value: parameter.value.clone(),
            });
        }

        self.spec.parameters.push(parameter);
        self
    }

    /// Add an input parameter to the job request
    pub fn add_input(&mut self, value: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.add_parameter(value, ParameterKind::Input, name)
    }

    /// Add an output parameter to the job request
    pub fn add_output(&mut self, value: impl Into<String>, name: Option<&str>) -> &mut Self {
        self.add_parameter(value, ParameterKind::Output, name)
    }

    /// Merge metadata attached to job outputs; later keys win
    pub fn add_output_metadata<I, K, V>(&mut self, metadata: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.note_change("adding output metadata");
        self.spec.output_metadata.extend(
            metadata
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );
        self
    }

    /// Version of the service to run (the service defaults to `latest`)
    pub fn set_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.note_change("setting the version");
        self.spec.version = Some(version.into());
        self
    }

    /// Pub/sub channel the job result is published to
    pub fn set_broadcast(&mut self, channel: impl Into<String>) -> &mut Self {
        self.note_change("setting the broadcast channel");
        self.spec.broadcast = Some(channel.into());
        self
    }

    /// Value passed to the service through stdin
    pub fn set_input_stream(&mut self, input: impl Into<String>) -> &mut Self {
        self.note_change("setting the input stream");
        self.spec.input_stream = Some(input.into());
        self
    }

    fn note_change(&mut self, change: &'static str) {
        if let Some(job_id) = &self.job_id {
            let job_id = job_id.clone();
            self.advise(Advisory::ModifiedAfterSubmit { job_id, change });
        }
    }

    fn advise(&mut self, advisory: Advisory) {
        warn!(service = %self.spec.service, "{advisory}");
        self.advisories.push(advisory);
    }

    // =============================================================================
    // Request/response operations
    // =============================================================================

    /// Submit the job request
    ///
    /// Every call creates a new remote job; the last identifier wins.
    ///
    /// # Returns
    /// The job identifier assigned by the service
    ///
    /// # Errors
    /// `ClientError::Submission` if the service answers with an error payload
    pub async fn submit(&mut self) -> Result<String> {
        if let Some(previous) = &self.job_id {
            warn!(job_id = %previous, "Submitting a request that was already submitted");
        }

        let operation = operations::submit_job(&self.spec)?;
        let response = self.client.session().execute(&operation).await?;
        if let Some(errors) = response.error_messages() {
            return Err(ClientError::Submission(errors.join("; ")));
        }

        let submitted: SubmitJobResponse = response
            .field("submitJob")?
            .ok_or_else(|| ClientError::Submission("no job returned".into()))?;
        let job = submitted.job;

        info!(job_id = %job.job_id, service = %self.spec.service, "Submitted job");
        self.status = Some(job.status);
        self.job_id = Some(job.job_id.clone());

        Ok(job.job_id)
    }

    /// Query selected fields of the submitted job
    ///
    /// # Errors
    /// `ClientError::State` if the request has not been submitted; no call
    /// is made in that case
    pub async fn query(&self, fields: &[JobField]) -> Result<JobRecord> {
        let job_id = self.require_job_id()?;
        let response = self
            .client
            .session()
            .execute(&operations::job(job_id, fields))
            .await?;
        response.require("job")
    }

    /// Check the current status of the job
    pub async fn check_status(&mut self) -> Result<JobStatus> {
        let record = self.query(&[JobField::Status]).await?;
        let status = record
            .status
            .ok_or_else(|| ClientError::ParseError("Job record has no status".into()))?;
        self.status = Some(status);
        Ok(status)
    }

    /// Get the job result
    ///
    /// Reads job id, service, status, result and error.
    pub async fn result(&mut self) -> Result<JobRecord> {
        let record = self.query(&JobField::RESULT).await?;
        if record.status.is_some() {
            self.status = record.status;
        }
        Ok(record)
    }

    // =============================================================================
    // Subscriptions
    // =============================================================================

    /// Wait for the service to push the job's completion event
    ///
    /// Only the first event is used; the subscription is closed after it.
    /// There is no timeout: wrap the call in `tokio::time::timeout` to bound
    /// the wait.
    pub async fn subscribe_completion(&self) -> Result<JobRecord> {
        let job_id = self.require_job_id()?;
        let authorization = self.client.session().authorization();

        let mut events = self
            .client
            .subscriptions()
            .subscribe(&operations::job_complete(job_id), authorization.as_deref())
            .await?;
        let first = events.next().await.ok_or_else(|| {
            ClientError::Subscription(format!("subscription for job {job_id} closed without an event"))
        })??;
        drop(events);

        debug!(job_id, "Received completion event");
        first.require("subscribeJobComplete")
    }

    /// Stream intermediate messages of the job
    ///
    /// The subscription is opened when the stream is first polled and lasts
    /// until the service closes it. Each call opens a new subscription;
    /// dropping the stream closes it.
    pub fn subscribe_messages(&self) -> impl Stream<Item = Result<String>> + Send + '_ {
        async_stream::try_stream! {
            let job_id = self.require_job_id()?;
            let authorization = self.client.session().authorization();
            let mut events = self
                .client
                .subscriptions()
                .subscribe(&operations::job_messages(job_id), authorization.as_deref())
                .await?;

            while let Some(event) = events.next().await {
                let message: String = event?.require("subscribeJobMessages")?;
                debug!(job_id, %message, "Job message");
                yield message;
            }
        }
    }

    // =============================================================================
    // Orchestration
    // =============================================================================

    /// Submit the job and poll until it finishes
    ///
    /// # Arguments
    /// * `poll_interval` - Delay between status checks
    /// * `return_failed` - Return the record of a failed job instead of an error
    ///
    /// # Errors
    /// `ClientError::JobFailed` if the job ends in a status other than
    /// `complete` and `return_failed` is false
    pub async fn run_job(
        &mut self,
        poll_interval: Duration,
        return_failed: bool,
    ) -> Result<JobRecord> {
        self.run_job_with(RunOptions {
            poll_interval,
            return_failed,
            max_polls: None,
        })
        .await
    }

    /// Submit the job and poll until it finishes, with explicit options
    ///
    /// # Errors
    /// `ClientError::Config` if `max_polls` is `Some(0)`; nothing is
    /// submitted in that case
    pub async fn run_job_with(&mut self, options: RunOptions) -> Result<JobRecord> {
        if options.max_polls == Some(0) {
            return Err(ClientError::Config("max_polls must be at least 1".into()));
        }

        let job_id = self.submit().await?;

        let mut polls = 0u32;
        let status = loop {
            let status = self.check_status().await?;
            if status.is_terminal() {
                break status;
            }

            polls += 1;
            if let Some(max_polls) = options.max_polls {
                if polls >= max_polls {
                    return Err(ClientError::PollLimitExceeded {
                        job_id,
                        status: status.to_string(),
                        polls,
                    });
                }
            }

            debug!(%job_id, %status, "Job not finished yet");
            tokio::time::sleep(options.poll_interval).await;
        };

        let record = self.result().await?;
        if status != JobStatus::Complete && !options.return_failed {
            return Err(ClientError::JobFailed {
                job_id,
                error: record.error.unwrap_or_default(),
            });
        }

        info!(%job_id, %status, "Job finished");
        Ok(record)
    }

    fn require_job_id(&self) -> Result<&str> {
        self.job_id
            .as_deref()
            .ok_or_else(|| ClientError::State("Job ID is not set, has the job been submitted?".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ScriptedSubscriptions, ScriptedTransport};
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct Fixture {
        requests: Arc<ScriptedTransport>,
        subscriptions: Arc<ScriptedSubscriptions>,
        request: JobRequest,
    }

    fn fixture() -> Fixture {
        let requests = Arc::new(ScriptedTransport::new());
        let subscriptions = Arc::new(ScriptedSubscriptions::new());
        let client = testing::client(requests.clone(), subscriptions.clone());
        Fixture {
            requests,
            subscriptions,
            request: client.job_request("test"),
        }
    }

    fn submit_response() -> Value {
        json!({"submitJob": {"job": {"jobId": "test", "status": "submitted"}}})
    }

    fn push_statuses(requests: &ScriptedTransport, statuses: &[&str], error: Option<&str>) {
        for status in statuses {
            let mut job = json!({"status": status});
            if *status == "failed" {
                job["error"] = json!(error);
            }
            requests.push_data(json!({"job": job}));
        }
    }

    #[test]
    fn test_method_chaining() {
        let mut f = fixture();
        f.request
            .add_input("s3://bucket/in.txt", Some("-i"))
            .add_output("s3://bucket/out.txt", Some("-o"))
            .add_parameter("--verbose", ParameterKind::Value, None)
            .add_output_metadata([("owner", "analyst")]);

        let kinds: Vec<_> = f.request.parameters().iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![ParameterKind::Input, ParameterKind::Output, ParameterKind::Value]
        );
        assert_eq!(f.request.output_metadata()["owner"], "analyst");
        assert!(f.request.advisories().is_empty());
    }

    #[test]
    fn test_output_metadata_last_write_wins() {
        let mut f = fixture();
        f.request
            .add_output_metadata([("a", "1"), ("b", "2")])
            .add_output_metadata([("a", "3")]);

        assert_eq!(f.request.output_metadata()["a"], "3");
        assert_eq!(f.request.output_metadata()["b"], "2");
    }

    #[test]
    fn test_non_uri_input_is_kept_with_advisory() {
        let mut f = fixture();
        f.request.add_input("local/file.txt", None);

        assert_eq!(f.request.parameters()[0].value, "local/file.txt");
        assert_eq!(
            f.request.advisories(),
            &[Advisory::NotStorageUri {
                kind: ParameterKind::Input,
                value: "local/file.txt".into()
            }]
        );
        assert_eq!(
            f.request.advisories()[0].to_string(),
            "input parameter local/file.txt is not an S3 URI"
        );
    }

    #[test]
    fn test_plain_values_are_not_checked() {
        let mut f = fixture();
        f.request.add_parameter("local/file.txt", ParameterKind::Value, None);
        assert!(f.request.advisories().is_empty());
    }

    #[tokio::test]
    async fn test_changes_after_submit_warn_but_apply() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        f.request.submit().await.unwrap();

        f.request
            .add_input("s3://bucket/late.txt", None)
            .add_output("s3://bucket/late-out.txt", None)
            .add_parameter("x", ParameterKind::Value, None)
            .add_output_metadata([("k", "v")]);

        assert_eq!(f.request.parameters().len(), 3);
        assert_eq!(f.request.output_metadata()["k"], "v");
        assert_eq!(f.request.advisories().len(), 4);
        assert!(f.request.advisories().iter().all(|a| matches!(
            a,
            Advisory::ModifiedAfterSubmit { job_id, .. } if job_id == "test"
        )));
    }

    #[tokio::test]
    async fn test_submit_sends_spec_and_stores_job() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        f.request
            .set_version("dev")
            .set_broadcast("jobs:done")
            .add_parameter("42", ParameterKind::Value, Some("--answer"));

        let job_id = f.request.submit().await.unwrap();

        assert_eq!(job_id, "test");
        assert_eq!(f.request.job_id(), Some("test"));
        assert_eq!(f.request.status(), Some(JobStatus::Submitted));

        let sent = &f.requests.calls()[0].variables["request"];
        assert_eq!(sent["service"], "test");
        assert_eq!(sent["version"], "dev");
        assert_eq!(sent["broadcast"], "jobs:done");
        assert_eq!(sent["parameters"][0]["name"], "--answer");
    }

    #[tokio::test]
    async fn test_submit_error_payload() {
        let mut f = fixture();
        f.requests.push_response(crate::transport::Response {
            data: None,
            errors: Some(vec![crate::transport::ResponseError {
                message: "unknown service".into(),
            }]),
        });

        let err = f.request.submit().await.unwrap_err();

        assert!(matches!(err, ClientError::Submission(ref m) if m == "unknown service"));
        assert!(f.request.job_id().is_none());
    }

    #[tokio::test]
    async fn test_query_before_submit_is_state_error() {
        let mut f = fixture();

        assert!(matches!(
            f.request.query(&[JobField::Status]).await,
            Err(ClientError::State(_))
        ));
        assert!(matches!(f.request.check_status().await, Err(ClientError::State(_))));
        assert!(matches!(
            f.request.subscribe_completion().await,
            Err(ClientError::State(_))
        ));
        assert!(f.requests.calls().is_empty());
        assert!(f.subscriptions.opened().is_empty());
    }

    #[tokio::test]
    async fn test_result_selects_result_fields() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        f.requests.push_data(json!({"job": {
            "jobId": "test", "service": "test", "status": "complete", "result": "ok", "error": null
        }}));
        f.request.submit().await.unwrap();

        let record = f.request.result().await.unwrap();

        assert!(record.is_complete());
        assert_eq!(record.result.as_deref(), Some("ok"));
        assert!(f.requests.calls()[1].query.contains("jobId service status result error"));
        assert_eq!(f.requests.calls()[1].variables["jobId"], "test");
    }

    #[tokio::test]
    async fn test_run_job() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        push_statuses(&f.requests, &["submitted", "running", "complete", "complete"], None);

        let result = f.request.run_job(Duration::from_millis(1), false).await.unwrap();

        assert_eq!(result.status, Some(JobStatus::Complete));
        assert_eq!(f.request.status(), Some(JobStatus::Complete));
        assert_eq!(f.requests.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_run_job_fail() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        push_statuses(&f.requests, &["submitted", "running", "failed", "failed"], Some("failed"));

        let err = f.request.run_job(Duration::from_millis(1), false).await.unwrap_err();

        match err {
            ClientError::JobFailed { job_id, error } => {
                assert_eq!(job_id, "test");
                assert_eq!(error, "failed");
            }
            other => panic!("expected JobFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_job_fail_return_failed() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        push_statuses(&f.requests, &["submitted", "running", "failed", "failed"], Some("failed"));

        let result = f.request.run_job(Duration::from_millis(1), true).await.unwrap();

        assert_eq!(result.error.as_deref(), Some("failed"));
        assert_eq!(result.status, Some(JobStatus::Failed));
    }

    #[tokio::test]
    async fn test_run_job_poll_limit() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        push_statuses(&f.requests, &["running", "running", "running"], None);

        let err = f
            .request
            .run_job_with(RunOptions {
                poll_interval: Duration::from_millis(1),
                return_failed: false,
                max_polls: Some(2),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::PollLimitExceeded { polls: 2, .. }));
        assert_eq!(f.requests.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_run_job_rejects_zero_poll_limit() {
        let mut f = fixture();

        let err = f
            .request
            .run_job_with(RunOptions {
                max_polls: Some(0),
                ..RunOptions::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Config(_)));
        assert!(f.requests.calls().is_empty());
        assert_eq!(f.request.job_id(), None);
    }

    #[tokio::test]
    async fn test_subscribe_completion_takes_first_event() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        f.subscriptions.push_stream(vec![
            json!({"subscribeJobComplete": {"jobId": "test", "status": "complete", "result": "done"}}),
            json!({"subscribeJobComplete": {"jobId": "test", "status": "failed"}}),
        ]);
        f.request.submit().await.unwrap();

        let record = f.request.subscribe_completion().await.unwrap();

        assert_eq!(record.result.as_deref(), Some("done"));
        assert!(record.is_complete());
        assert_eq!(f.subscriptions.opened()[0].variables["jobId"], "test");
        assert_eq!(f.subscriptions.released(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_completion_without_event() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        f.subscriptions.push_stream(vec![]);
        f.request.submit().await.unwrap();

        let err = f.request.subscribe_completion().await.unwrap_err();

        assert!(matches!(err, ClientError::Subscription(_)));
    }

    #[tokio::test]
    async fn test_subscribe_messages() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        f.subscriptions.push_stream(
            (1..=10)
                .map(|i| json!({"subscribeJobMessages": format!("message {i}")}))
                .collect(),
        );
        f.request.submit().await.unwrap();

        let messages: Vec<String> = f
            .request
            .subscribe_messages()
            .map(|m| m.unwrap())
            .collect()
            .await;

        assert_eq!(messages.len(), 10);
        assert_eq!(messages[0], "message 1");
        assert_eq!(messages[9], "message 10");
    }

    #[tokio::test]
    async fn test_dropping_message_stream_releases_subscription() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        f.subscriptions.push_stream(
            (1..=10)
                .map(|i| json!({"subscribeJobMessages": format!("message {i}")}))
                .collect(),
        );
        f.request.submit().await.unwrap();

        {
            let stream = f.request.subscribe_messages();
            futures::pin_mut!(stream);
            let first = stream.next().await.unwrap().unwrap();
            assert_eq!(first, "message 1");
            assert_eq!(f.subscriptions.released(), 0);
        }

        assert_eq!(f.subscriptions.released(), 1);
    }

    #[tokio::test]
    async fn test_each_message_stream_opens_its_own_subscription() {
        let mut f = fixture();
        f.requests.push_data(submit_response());
        f.subscriptions.push_stream(vec![json!({"subscribeJobMessages": "a"})]);
        f.subscriptions.push_stream(vec![json!({"subscribeJobMessages": "b"})]);
        f.request.submit().await.unwrap();

        let first: Vec<String> = f.request.subscribe_messages().map(|m| m.unwrap()).collect().await;
        let second: Vec<String> = f.request.subscribe_messages().map(|m| m.unwrap()).collect().await;

        assert_eq!(first, vec!["a"]);
        assert_eq!(second, vec!["b"]);
        assert_eq!(f.subscriptions.opened().len(), 2);
    }

    #[tokio::test]
    async fn test_message_stream_before_submit_fails_lazily() {
        let f = fixture();

        let stream = f.request.subscribe_messages();
        assert!(f.subscriptions.opened().is_empty());

        let items: Vec<Result<String>> = stream.collect().await;
        assert!(matches!(items.as_slice(), [Err(ClientError::State(_))]));
    }
}
