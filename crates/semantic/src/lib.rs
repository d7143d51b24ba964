//! Gateway semantic stage
//!
//! Turns a piece of text into a dense vector by calling a remote embedding
//! provider. Nothing is computed locally; this crate is the HTTP client and the
//! error vocabulary around it.
//!
//! The [`Embedder`] trait is the seam the pipeline depends on. Production code
//! uses [`OpenAiEmbedder`]; tests plug in their own implementations to count
//! calls or inject failures.
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{Embedder, OpenAiEmbedder, SemanticConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = SemanticConfig {
//!         api_key: "sk-...".into(),
//!         ..Default::default()
//!     };
//!     let embedder = OpenAiEmbedder::new(cfg).unwrap();
//!     let embedding = embedder.embed("hello world").await.unwrap();
//!     assert_eq!(embedding.dim(), 1536);
//! }
//! ```

mod api;
mod config;
mod error;
mod types;

use async_trait::async_trait;

pub use api::OpenAiEmbedder;
pub use config::{SemanticConfig, DEFAULT_API_URL, DEFAULT_DIMENSIONS, DEFAULT_MODEL};
pub use error::SemanticError;
pub use types::Embedding;

/// Capability: given text, return a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, SemanticError>;

    /// Model identifier, surfaced in logs.
    fn model_name(&self) -> &str;
}
