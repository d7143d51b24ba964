//! Workspace umbrella crate for the retrieval gateway.
//!
//! This crate stitches the embedding client and the vector-index client into a
//! single retrieval pipeline: validated query text in, ranked identifiers out.
//! The HTTP surface lives in the `gateway-server` crate.

mod pipeline;
mod query;
mod retry;

pub use index::{
    IndexError, Match, PineconeConfig, PineconeIndex, QueryRequest, VectorIndex,
};
pub use pipeline::{Pipeline, PipelineConfig};
pub use query::{QueryText, ResultSet, ValidationError};
pub use retry::{retry_async, RetryConfig};
pub use semantic::{Embedder, Embedding, OpenAiEmbedder, SemanticConfig, SemanticError};

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Errors that can occur while running a query through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    Embedding(SemanticError),
    Index(IndexError),
}

impl PipelineError {
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Embedding(err) => err.is_transient(),
            PipelineError::Index(err) => err.is_transient(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Embedding(err) => write!(f, "embedding failure: {err}"),
            PipelineError::Index(err) => write!(f, "similarity query failure: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Embedding(err) => Some(err),
            PipelineError::Index(err) => Some(err),
        }
    }
}

impl From<SemanticError> for PipelineError {
    fn from(value: SemanticError) -> Self {
        PipelineError::Embedding(value)
    }
}

impl From<IndexError> for PipelineError {
    fn from(value: IndexError) -> Self {
        PipelineError::Index(value)
    }
}

/// Metrics observer for pipeline stages.
///
/// Latency covers every attempt of a stage, including retry sleeps.
pub trait PipelineMetrics: Send + Sync {
    fn record_embed(&self, latency: Duration, result: Result<(), SemanticError>);
    fn record_query(&self, latency: Duration, result: Result<(), IndexError>);
}
