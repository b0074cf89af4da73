//! Error taxonomy shared by the request client, the cache and the services.

use reqwest::StatusCode;
use thiserror::Error;
use validator::ValidationErrors;

/// Everything that can go wrong between a service call and the API.
///
/// The type is `Clone` because a single in-flight fetch hands its outcome to
/// every reader waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Input rejected before any network I/O; carries per-field errors.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Re-authentication failed or was impossible. Tokens have been cleared.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response, passed through unchanged.
    #[error("HTTP {status}: {message}")]
    Http { status: StatusCode, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The read was aborted before the fetch completed.
    #[error("request cancelled")]
    Cancelled,

    #[error("token store error: {0}")]
    TokenStore(String),
}

impl ClientError {
    /// HTTP status associated with the error, if it came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::SessionExpired)
            || self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Failures worth retrying blindly: transport problems, 5xx and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Timeout => true,
            ClientError::Http { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        ClientError::Validation(errors)
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: StatusCode) -> ClientError {
        ClientError::Http {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_unauthorized_is_never_transient() {
        let err = http(StatusCode::UNAUTHORIZED);
        assert!(err.is_unauthorized());
        assert!(!err.is_transient());
        assert!(ClientError::SessionExpired.is_unauthorized());
        assert!(!ClientError::SessionExpired.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        assert!(http(StatusCode::BAD_GATEWAY).is_transient());
        assert!(http(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(ClientError::Timeout.is_transient());
        assert!(ClientError::Network("reset".into()).is_transient());
        assert!(!http(StatusCode::BAD_REQUEST).is_transient());
        assert!(!ClientError::NotFound("todo".into()).is_transient());
        assert!(!ClientError::Cancelled.is_transient());
    }

    #[test]
    fn test_not_found_reports_404() {
        assert_eq!(
            ClientError::NotFound("x".into()).status(),
            Some(StatusCode::NOT_FOUND)
        );
        assert_eq!(ClientError::Timeout.status(), None);
    }
}
