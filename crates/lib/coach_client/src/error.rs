//! Client error types.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Convenience alias for client return types.
pub type ClientResult<T> = Result<T, ClientError>;

/// Retry delay suggested when the backend does not send one.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// A non-success HTTP response before the error interceptors classify it.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    pub status: StatusCode,
    /// Most specific message found in the body, or the status reason.
    pub message: String,
    /// Parsed JSON body, if the body was JSON.
    pub body: Option<Value>,
    /// `Retry-After` header in seconds, if present.
    pub retry_after_header: Option<Duration>,
}

/// Errors surfaced by [`crate::ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP 401. `session_cleared` is true only for the call that ended the session.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        session_cleared: bool,
    },

    /// HTTP 503 or 202: the backend's datastore is not available yet.
    #[error("{message}")]
    BackendUnavailable {
        status: StatusCode,
        message: String,
        retry_after: Duration,
    },

    /// Any other non-success status (validation and business errors).
    #[error("{}", .0.message)]
    Http(HttpFailure),

    /// A 2xx response that reports `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// Connection failures and timeouts.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Interceptor error: {0}")]
    Interceptor(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ClientError::BackendUnavailable { status, .. } => Some(*status),
            ClientError::Http(failure) => Some(failure.status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    /// True for backend-unavailable errors (the datastore is down or starting).
    pub fn is_database_error(&self) -> bool {
        matches!(self, ClientError::BackendUnavailable { .. })
    }

    /// Whether the caller may retry after [`ClientError::retry_after`].
    pub fn is_retryable(&self) -> bool {
        self.is_database_error()
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::BackendUnavailable { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthorized { message, .. } => message.clone(),
            ClientError::BackendUnavailable { message, .. } => message.clone(),
            ClientError::Http(failure) => failure.message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else if e.is_builder() {
            ClientError::Config(e.to_string())
        } else {
            // Timeouts land here too; they are not special-cased.
            ClientError::Network(e.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::Config(format!("invalid URL: {e}"))
    }
}

/// Pull the most specific human-readable message out of an error body.
///
/// Looks at `message`, then `error`, then the first entry of `errors`
/// (validation arrays like `[{"msg": ".."}]` or plain strings).
pub(crate) fn message_from_body(body: &Value) -> Option<String> {
    let non_empty = |v: &Value| {
        v.as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(msg) = body.get("message").and_then(non_empty) {
        return Some(msg);
    }
    if let Some(msg) = body.get("error").and_then(non_empty) {
        return Some(msg);
    }
    let first = body.get("errors")?.as_array()?.first()?;
    non_empty(first)
        .or_else(|| first.get("msg").and_then(non_empty))
        .or_else(|| first.get("message").and_then(non_empty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_prefers_message_then_error() {
        assert_eq!(
            message_from_body(&json!({"message": "Invalid credentials", "error": "x"})).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            message_from_body(&json!({"error": "Forbidden"})).as_deref(),
            Some("Forbidden")
        );
    }

    #[test]
    fn message_from_validation_array() {
        let body = json!({"errors": [{"msg": "Email is required", "param": "email"}]});
        assert_eq!(message_from_body(&body).as_deref(), Some("Email is required"));
        assert_eq!(
            message_from_body(&json!({"errors": ["Too short"]})).as_deref(),
            Some("Too short")
        );
    }

    #[test]
    fn blank_message_is_ignored() {
        assert!(message_from_body(&json!({"message": "  "})).is_none());
        assert!(message_from_body(&json!([1, 2])).is_none());
    }

    #[test]
    fn retry_accessors_only_apply_to_unavailable() {
        let unavailable = ClientError::BackendUnavailable {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "down".into(),
            retry_after: Duration::from_secs(10),
        };
        assert!(unavailable.is_database_error());
        assert!(unavailable.is_retryable());
        assert_eq!(unavailable.retry_after(), Some(Duration::from_secs(10)));

        let network = ClientError::Network("timed out".into());
        assert!(!network.is_retryable());
        assert_eq!(network.retry_after(), None);
        assert_eq!(network.status(), None);
    }

    #[test]
    fn http_failure_displays_its_message() {
        let err = ClientError::Http(HttpFailure {
            status: StatusCode::NOT_FOUND,
            message: "Student not found".into(),
            body: None,
            retry_after_header: None,
        });
        assert_eq!(err.to_string(), "Student not found");
        assert_eq!(err.user_message(), "Student not found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }
}
