use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway::{PipelineError, ValidationError};
use serde::{Deserialize, Serialize};

use crate::rate_limit::RateLimitError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Detail shown in place of upstream errors when exposure is disabled.
pub const REDACTED_UPSTREAM_DETAIL: &str = "upstream request failed";

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Embedding provider failure; carries the detail to show the caller.
    #[error("OpenAI API Error: {0}")]
    EmbeddingProvider(String),

    /// Vector index failure; carries the detail to show the caller.
    #[error("Pinecone API Error: {0}")]
    IndexProvider(String),

    #[error("Payload too large: max {0}KB allowed")]
    PayloadTooLarge(usize),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ServerError {
    /// Map a pipeline failure, optionally hiding the upstream detail.
    pub fn from_pipeline(err: PipelineError, expose_detail: bool) -> Self {
        let detail = |message: String| {
            if expose_detail {
                message
            } else {
                REDACTED_UPSTREAM_DETAIL.to_string()
            }
        };
        match err {
            PipelineError::Embedding(err) => ServerError::EmbeddingProvider(detail(err.to_string())),
            PipelineError::Index(err) => ServerError::IndexProvider(detail(err.to_string())),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Validation(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::EmbeddingProvider(_)
            | ServerError::IndexProvider(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string, used as the `outcome` metric label
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Unauthorized => "unauthorized",
            ServerError::RateLimited(_) => "rate_limited",
            ServerError::Validation(_) => "invalid_input",
            ServerError::EmbeddingProvider(_) => "embedding_error",
            ServerError::IndexProvider(_) => "index_error",
            ServerError::PayloadTooLarge(_) => "payload_too_large",
            ServerError::Internal(_) => "internal_error",
            ServerError::NotFound => "not_found",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            ServerError::RateLimited(err) => Some(err.retry_after),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        let mut response = (status, body).into_response();

        if let Some(retry_after) = retry_after {
            // Whole seconds, rounded up so clients never retry early.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }

        response
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::{Quota, Scope};
    use gateway::{IndexError, SemanticError};
    use std::time::Duration;

    #[test]
    fn messages_match_wire_format() {
        assert_eq!(ServerError::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(
            ServerError::from(ValidationError::InvalidInput).to_string(),
            "Invalid input"
        );
        assert_eq!(
            ServerError::from(ValidationError::EmptyText).to_string(),
            "Text must be a non-empty string"
        );
    }

    #[test]
    fn pipeline_errors_keep_provider_prefix() {
        let err = ServerError::from_pipeline(
            PipelineError::Embedding(SemanticError::Api {
                status: 401,
                message: "Incorrect API key provided".into(),
            }),
            true,
        );
        assert_eq!(
            err.to_string(),
            "OpenAI API Error: Error code: 401 - Incorrect API key provided"
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ServerError::from_pipeline(
            PipelineError::Index(IndexError::Transport("connection reset".into())),
            true,
        );
        assert_eq!(
            err.to_string(),
            "Pinecone API Error: Connection error: connection reset"
        );
    }

    #[test]
    fn pipeline_detail_can_be_hidden() {
        let err = ServerError::from_pipeline(
            PipelineError::Index(IndexError::Api {
                status: 403,
                message: "key sk-leaky rejected".into(),
            }),
            false,
        );
        assert_eq!(err.to_string(), "Pinecone API Error: upstream request failed");
    }

    #[test]
    fn rate_limit_sets_retry_after() {
        let err = ServerError::from(RateLimitError {
            scope: Scope::Client,
            quota: Quota::per_minute(10),
            retry_after: Duration::from_millis(12_300),
        });
        assert_eq!(err.to_string(), "Rate limit exceeded: 10 per 1 minute");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "13");
    }

    #[test]
    fn statuses() {
        assert_eq!(ServerError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ServerError::from(ValidationError::EmptyText).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServerError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::PayloadTooLarge(64).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
