//! Error types for the Mothr client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Mothr client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing credentials, failed login or failed refresh
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The service rejected a job request
    #[error("Error submitting job request: {0}")]
    Submission(String),

    /// Operation requires a submitted job
    #[error("Invalid job state: {0}")]
    State(String),

    /// Job reached a terminal status other than `complete`
    #[error("Job {job_id} failed: {error}")]
    JobFailed {
        /// Identifier of the failed job
        job_id: String,
        /// Error text reported by the service
        error: String,
    },

    /// Poll loop gave up before the job reached a terminal status
    #[error("Job {job_id} still {status} after {polls} status checks")]
    PollLimitExceeded {
        job_id: String,
        status: String,
        polls: u32,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// WebSocket connection failed
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Response carried query errors
    #[error("Query returned errors: {}", .0.join("; "))]
    Graphql(Vec<String>),

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Subscription closed or misbehaved
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth(_)) || matches!(self, Self::ApiError { status: 401, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(ClientError::api_error(401, "nope").is_auth_error());
        assert!(ClientError::api_error(404, "missing").is_client_error());
        assert!(ClientError::api_error(502, "bad gateway").is_server_error());
        assert!(!ClientError::State("x".into()).is_client_error());
    }

    #[test]
    fn test_job_failed_message() {
        let err = ClientError::JobFailed {
            job_id: "job-1".into(),
            error: "exit 1".into(),
        };
        assert_eq!(err.to_string(), "Job job-1 failed: exit 1");
    }

    #[test]
    fn test_graphql_errors_joined() {
        let err = ClientError::Graphql(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Query returned errors: a; b");
    }
}
