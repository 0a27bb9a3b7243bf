//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Job status as reported by the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Submitted,
    Running,
    Complete,
    Failed,
    /// Any status string this client does not recognise
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Returns true once no further transition can happen.
    ///
    /// Unrecognised statuses count as terminal so a poll loop never spins
    /// on a value it cannot interpret.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Submitted | JobStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (possibly partial) job record
///
/// Only the fields that were selected in a query are populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<String>,
}

impl JobRecord {
    /// Returns true if the record carries the `complete` status
    pub fn is_complete(&self) -> bool {
        self.status == Some(JobStatus::Complete)
    }
}

/// Fields that can be selected when querying a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobField {
    JobId,
    Service,
    Version,
    Status,
    Result,
    Error,
    Broadcast,
}

impl JobField {
    /// Field set returned by a full result lookup
    pub const RESULT: [JobField; 5] = [
        JobField::JobId,
        JobField::Service,
        JobField::Status,
        JobField::Result,
        JobField::Error,
    ];

    /// Name of the field in the remote schema
    pub fn as_str(self) -> &'static str {
        match self {
            JobField::JobId => "jobId",
            JobField::Service => "service",
            JobField::Version => "version",
            JobField::Status => "status",
            JobField::Result => "result",
            JobField::Error => "error",
            JobField::Broadcast => "broadcast",
        }
    }

    /// Builds a whitespace separated selection set, dropping duplicates
    pub fn selection(fields: &[JobField]) -> String {
        let mut seen = Vec::with_capacity(fields.len());
        for field in fields {
            if !seen.contains(field) {
                seen.push(*field);
            }
        }
        seen.iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
