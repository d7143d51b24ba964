//! # Gateway Index
//!
//! Client side of the vector-index capability: given a query vector, return
//! the identifiers of the nearest stored items, best first.
//!
//! The gateway never writes to the index. Index lifecycle (upserts, deletes,
//! provisioning) belongs to whoever owns the corpus; this crate only queries.
//!
//! ## Key Concepts
//!
//! - [`VectorIndex`] is the seam the pipeline depends on.
//! - [`PineconeIndex`] implements it over Pinecone's REST data plane.
//! - [`Match`] is one ranked hit; its position in the returned `Vec` is its rank.
//!
//! ## Example Usage
//!
//! ```no_run
//! use index::{PineconeConfig, PineconeIndex, QueryRequest, VectorIndex};
//!
//! # async fn run() -> Result<(), index::IndexError> {
//! let index = PineconeIndex::new(PineconeConfig {
//!     api_key: "pc-...".into(),
//!     ..Default::default()
//! })?;
//! let vector = vec![0.0f32; 1536];
//! let matches = index.query(QueryRequest::new(&vector, 10)).await?;
//! for m in &matches {
//!     println!("{}", m.id);
//! }
//! # Ok(())
//! # }
//! ```

mod pinecone;
mod query;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use pinecone::{
    PineconeConfig, PineconeIndex, API_VERSION, DEFAULT_CONTROL_PLANE_URL, DEFAULT_INDEX_NAME,
};
pub use query::{Match, QueryRequest};

/// Capability: given a vector, return the top-K nearest stored items.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Matches ordered by descending similarity. An empty `Vec` is a valid answer.
    async fn query(&self, request: QueryRequest<'_>) -> Result<Vec<Match>, IndexError>;

    /// Name of the fixed target index, surfaced in logs.
    fn index_name(&self) -> &str;
}

/// Errors surfaced by a similarity query.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndexError {
    #[error("invalid index config: {0}")]
    InvalidConfig(String),
    #[error("Connection error: {0}")]
    Transport(String),
    #[error("({status}) {message}")]
    Api { status: u16, message: String },
    #[error("invalid query response: {0}")]
    InvalidResponse(String),
    #[error("could not resolve index host: {0}")]
    HostResolution(String),
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl IndexError {
    /// Whether retrying the same query could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            IndexError::Transport(_) | IndexError::Timeout(_) => true,
            IndexError::Api { status, .. } => matches!(status, 408 | 429) || *status >= 500,
            IndexError::InvalidConfig(_)
            | IndexError::InvalidResponse(_)
            | IndexError::HostResolution(_) => false,
        }
    }
}
