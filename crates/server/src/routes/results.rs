use crate::config::IdsFormat;
use crate::error::{ServerError, ServerResult};
use crate::observability;
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gateway::{QueryText, ResultSet, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const NO_MATCHES_MESSAGE: &str = "No matches found";

/// Request body for `POST /api/get_results`
#[derive(Debug, Deserialize)]
pub struct ResultsRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Response body for `POST /api/get_results`
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResultsResponse {
    /// `{"ids": "a, b, c"}`
    Joined { ids: String },
    /// `{"ids": ["a", "b", "c"]}`
    List { ids: Vec<String> },
    /// `{"ids": [], "message": "No matches found"}`
    NoMatches {
        ids: Vec<String>,
        message: &'static str,
    },
}

impl ResultsResponse {
    pub fn render(results: ResultSet, format: IdsFormat) -> Self {
        match (results, format) {
            (ResultSet::Empty, _) => ResultsResponse::NoMatches {
                ids: Vec::new(),
                message: NO_MATCHES_MESSAGE,
            },
            (results @ ResultSet::Matches(_), IdsFormat::Joined) => ResultsResponse::Joined {
                ids: results.joined(),
            },
            (ResultSet::Matches(ids), IdsFormat::List) => ResultsResponse::List { ids },
        }
    }
}

/// Embed the text, query the index, return matching ids
///
/// Authentication and rate limiting have already run by the time this handler
/// is reached; validation happens here, before any upstream call.
pub async fn get_results(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<ResultsRequest>, JsonRejection>,
) -> ServerResult<Json<ResultsResponse>> {
    let outcome = handle(&state, payload).await;
    observability::record_request(match &outcome {
        Ok(ResultsResponse::NoMatches { .. }) => "no_matches",
        Ok(_) => "ok",
        Err(err) => err.error_code(),
    });
    outcome.map(Json)
}

async fn handle(
    state: &ServerState,
    payload: Result<Json<ResultsRequest>, JsonRejection>,
) -> ServerResult<ResultsResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ServerError::PayloadTooLarge(state.config.max_body_size_kb));
        }
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "rejected request body");
            return Err(ValidationError::InvalidInput.into());
        }
    };

    let text = QueryText::from_field(request.text.as_deref())?;

    let results = state
        .pipeline
        .run(&text)
        .await
        .map_err(|err| ServerError::from_pipeline(err, state.config.expose_upstream_errors))?;

    Ok(ResultsResponse::render(results, state.config.ids_format))
}
