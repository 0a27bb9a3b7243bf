//! Job parameter types
//!
//! A parameter is either a plain value handed to the service, or a
//! reference to an object in storage the service reads from (input) or
//! writes to (output).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static STORAGE_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^s3://[a-zA-Z0-9\-.]+[a-zA-Z]/\S*?$").expect("storage URI pattern is valid")
});

/// Checks if a string matches `s3://<bucket>/<key>`
pub fn is_storage_uri(uri: &str) -> bool {
    STORAGE_URI.is_match(uri)
}

/// Kind of a job parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterKind {
    #[default]
    #[serde(rename = "parameter")]
    Value,
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "output")]
    Output,
}

impl ParameterKind {
    /// Input and output parameters must reference storage objects
    pub fn expects_storage_uri(self) -> bool {
        matches!(self, ParameterKind::Input | ParameterKind::Output)
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::Value => f.write_str("parameter"),
            ParameterKind::Input => f.write_str("input"),
            ParameterKind::Output => f.write_str("output"),
        }
    }
}

/// A single job parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub value: String,
    /// Flag or name the service expects (e.g. `-i`, `--input`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Parameter {
    pub fn new(kind: ParameterKind, value: impl Into<String>, name: Option<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            name,
        }
    }

    /// Returns false for input/output parameters whose value is not a storage URI
    pub fn has_valid_shape(&self) -> bool {
        !self.kind.expects_storage_uri() || is_storage_uri(&self.value)
    }
}
