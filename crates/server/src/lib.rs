//! Retrieval gateway server: one authenticated endpoint that turns text into
//! the ids of its nearest neighbours in a vector index.
//!
//! # Features
//!
//! - **Authentication**: single shared bearer token, compared in constant time
//! - **Rate limiting**: sliding windows per client address and per deployment
//! - **Middleware**: request id tracking, structured JSON logging, timeouts
//! - **Configuration**: `.env`, optional `server.*` file, environment variables
//! - **Graceful Shutdown**: Ctrl+C and SIGTERM
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Protected Endpoints (`Authorization: Bearer <token>`)
//!
//! - `POST /api/get_results` - `{"text": "..."}` to `{"ids": "a, b, c"}`
//!
//! # Configuration
//!
//! Variables use the `GATEWAY__` prefix, e.g. `GATEWAY__PORT=9000`. The plain
//! names `OPENAI_API_KEY`, `PINECONE_API_KEY`, `ACCESS_TOKEN`, `PORT` and
//! `HOST` are also honoured.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{IdsFormat, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use rate_limit::{Quota, RateLimitError, RateLimiter};
pub use server::{build_router, start_server};
pub use state::ServerState;
