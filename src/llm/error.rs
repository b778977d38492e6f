use crate::util::sanitize_api_response;
use std::fmt;
use thiserror::Error;

/// Environment variable holding the service credential
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Advisory classification of a failed completion attempt.
///
/// Only used to build user-facing messages; retry eligibility is decided by
/// [`ServiceError::is_retryable`] from the status code alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidCredential,
    AccessDenied,
    ModelUnavailable,
    MalformedRequest,
    RateLimited,
    ServerError,
    Connectivity,
    Timeout,
    Unknown,
}

impl FailureKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => FailureKind::InvalidCredential,
            403 => FailureKind::AccessDenied,
            404 => FailureKind::ModelUnavailable,
            400 | 413 | 422 => FailureKind::MalformedRequest,
            429 | 529 => FailureKind::RateLimited,
            408 | 504 => FailureKind::Timeout,
            500..=599 => FailureKind::ServerError,
            _ => FailureKind::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::InvalidCredential => "invalid credential",
            FailureKind::AccessDenied => "access denied",
            FailureKind::ModelUnavailable => "model unavailable",
            FailureKind::MalformedRequest => "malformed request",
            FailureKind::RateLimited => "rate limited",
            FailureKind::ServerError => "server error",
            FailureKind::Connectivity => "connectivity error",
            FailureKind::Timeout => "timeout",
            FailureKind::Unknown => "unknown error",
        }
    }

    /// What the user can do about it
    pub fn hint(&self) -> &'static str {
        match self {
            FailureKind::InvalidCredential => {
                "Invalid API key. Check the value of ANTHROPIC_API_KEY."
            }
            FailureKind::AccessDenied => {
                "The API key does not have access to this model or workspace."
            }
            FailureKind::ModelUnavailable => {
                "The configured model was not found. Check the model name in your config."
            }
            FailureKind::MalformedRequest => {
                "The request was rejected as invalid. The prompt may be too large for the model."
            }
            FailureKind::RateLimited => {
                "The service is rate limiting or overloaded. Try again in a few minutes."
            }
            FailureKind::ServerError => {
                "The service returned a server error. It may be temporarily unavailable."
            }
            FailureKind::Connectivity => {
                "Could not connect to the service. Check your network and try again."
            }
            FailureKind::Timeout => "The request timed out. Please try again.",
            FailureKind::Unknown => "The request failed unexpectedly.",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure of a single completion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub status: Option<u16>,
    pub kind: FailureKind,
    pub message: String,
}

impl ServiceError {
    pub fn from_status(status: u16, message: &str) -> Self {
        Self {
            status: Some(status),
            kind: FailureKind::from_status(status),
            message: sanitize_api_response(message),
        }
    }

    pub fn without_status(kind: FailureKind, message: &str) -> Self {
        Self {
            status: None,
            kind,
            message: sanitize_api_response(message),
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_connect() {
            FailureKind::Connectivity
        } else if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), &err.to_string());
        } else {
            FailureKind::Unknown
        };
        Self::without_status(kind, &err.to_string())
    }

    /// Rate limiting (429) and overload (529) are the only retryable signals.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status, Some(429) | Some(529))
    }

    fn status_label(&self) -> String {
        match self.status {
            Some(status) => format!("HTTP {}", status),
            None => self.kind.label().to_string(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.kind.hint(),
            self.status_label(),
            self.message
        )
    }
}

impl std::error::Error for ServiceError {}

/// Error surfaced by the completion client.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error(
        "ANTHROPIC_API_KEY environment variable is required.\nSet it with: export ANTHROPIC_API_KEY=your-key-here"
    )]
    MissingCredential,

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("{0}")]
    Service(ServiceError),

    #[error("Gave up after {attempts} attempts, retries exhausted. {last}")]
    RetriesExhausted { attempts: u32, last: ServiceError },
}

impl CompletionError {
    /// Classification of the underlying service failure, if any
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            CompletionError::Service(err) => Some(err.kind),
            CompletionError::RetriesExhausted { last, .. } => Some(last.kind),
            CompletionError::MissingCredential | CompletionError::HttpClient(_) => None,
        }
    }

    /// Configuration problems that no amount of retrying can fix
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CompletionError::MissingCredential | CompletionError::HttpClient(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_429_and_529_are_retryable() {
        assert!(ServiceError::from_status(429, "slow down").is_retryable());
        assert!(ServiceError::from_status(529, "overloaded").is_retryable());
        for status in [400, 401, 403, 404, 500, 502, 503] {
            assert!(
                !ServiceError::from_status(status, "nope").is_retryable(),
                "status {status} must not be retried"
            );
        }
        assert!(!ServiceError::without_status(FailureKind::Timeout, "t").is_retryable());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(FailureKind::from_status(401), FailureKind::InvalidCredential);
        assert_eq!(FailureKind::from_status(403), FailureKind::AccessDenied);
        assert_eq!(FailureKind::from_status(404), FailureKind::ModelUnavailable);
        assert_eq!(FailureKind::from_status(400), FailureKind::MalformedRequest);
        assert_eq!(FailureKind::from_status(500), FailureKind::ServerError);
        assert_eq!(FailureKind::from_status(529), FailureKind::RateLimited);
        assert_eq!(FailureKind::from_status(418), FailureKind::Unknown);
    }

    #[test]
    fn test_missing_credential_message_has_remediation() {
        let msg = CompletionError::MissingCredential.to_string();
        assert!(msg.contains("ANTHROPIC_API_KEY"));
        assert!(msg.contains("export"));
        assert!(CompletionError::MissingCredential.is_configuration());
    }

    #[test]
    fn test_exhausted_message_mentions_retries() {
        let err = CompletionError::RetriesExhausted {
            attempts: 3,
            last: ServiceError::from_status(429, "rate limited"),
        };
        let msg = err.to_string();
        assert!(msg.contains("retries exhausted"));
        assert!(msg.contains("HTTP 429"));
        assert_eq!(err.kind(), Some(FailureKind::RateLimited));
    }

    #[test]
    fn test_service_error_redacts_secret_looking_bodies() {
        let err = ServiceError::from_status(401, "invalid x-api-key sk-ant-123");
        assert!(!err.message.contains("sk-ant"));
    }
}
