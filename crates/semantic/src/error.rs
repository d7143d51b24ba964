use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while generating an embedding.
///
/// `Display` carries the upstream detail verbatim; callers decide whether to
/// show it to end users.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SemanticError {
    /// Configuration is unusable (e.g. empty API key, zero dimensions).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// The request never produced an HTTP response (DNS, connect, TLS, reset).
    #[error("Connection error: {0}")]
    Transport(String),
    /// The provider answered with a non-success status.
    #[error("Error code: {status} - {message}")]
    Api { status: u16, message: String },
    /// The provider answered 2xx but the body was not a usable embedding.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
    /// The returned vector does not have the requested length.
    #[error("expected a {expected}-dimensional embedding, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// The call did not complete within its time budget.
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl SemanticError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SemanticError::Transport(_) | SemanticError::Timeout(_) => true,
            SemanticError::Api { status, .. } => {
                matches!(status, 408 | 409 | 429) || *status >= 500
            }
            SemanticError::InvalidConfig(_)
            | SemanticError::InvalidResponse(_)
            | SemanticError::DimensionMismatch { .. } => false,
        }
    }
}
