//! API route handlers
//!
//! - `health`: Health checks, readiness, and metrics
//! - `results`: Text-to-ids retrieval

pub mod health;
pub mod results;

use crate::error::ServerError;

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
