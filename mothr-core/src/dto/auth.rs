//! Authentication payloads

use serde::{Deserialize, Serialize};

/// Tokens returned by a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginTokens {
    pub token: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Access token returned by a successful refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshedToken {
    pub token: String,
}
