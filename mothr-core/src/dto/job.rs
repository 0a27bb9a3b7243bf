//! Job DTOs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::job::JobStatus;
use crate::domain::parameter::Parameter;

/// Job request as submitted to the remote service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub output_metadata: BTreeMap<String, String>,
    /// Pub/sub channel the job result is published to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<String>,
    /// Value piped to the service through stdin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_stream: Option<String>,
}

impl JobSpec {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }
}

/// Job reference returned when a request is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedJob {
    pub job_id: String,
    pub status: JobStatus,
}

/// Body of the `submitJob` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub job: SubmittedJob,
}
