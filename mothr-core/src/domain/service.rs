//! Service catalogue types

use serde::{Deserialize, Serialize};

/// A service registered with the job service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ServiceParameter>,
}

/// Parameter a service declares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceParameter {
    pub name: String,
    #[serde(default)]
    pub file_type: Option<FileType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileType {
    pub name: String,
}
