//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all API endpoints
//! - Middleware stack (request id, logging, timeout, auth, rate limiting)
//! - Graceful shutdown handling

use crate::config::ServerConfig;
use crate::middleware::{bearer_auth, log_requests, rate_limit, request_id};
use crate::observability;
use crate::routes::not_found;
use crate::routes::{health, results};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Build the Axum router with all routes and middleware
///
/// Routes are divided into:
/// - Public routes: /health, /ready, /metrics (no auth required)
/// - Protected routes: /api/get_results (bearer token required)
///
/// Protected routes run bearer auth, then rate limiting, then the handler, so
/// an unauthenticated request never consumes a rate-limit slot.
pub fn build_router(state: Arc<ServerState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    // Protected routes. The last route_layer added runs first.
    let protected_routes = Router::new()
        .route("/api/get_results", post(results::get_results))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .route_layer(from_fn_with_state(state.clone(), rate_limit))
        .route_layer(from_fn_with_state(state.clone(), bearer_auth));

    // Combine routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server
///
/// Initializes logging and metrics, builds the upstream clients and listens
/// until SIGTERM or Ctrl+C.
///
/// # Example
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    // Create server state
    let mut state = ServerState::new(config.clone())?;
    if config.metrics_enabled {
        state = state.with_metrics_handle(observability::install_prometheus()?);
    }
    let state = Arc::new(state);

    spawn_rate_limit_purge(state.clone());

    // Build router
    let app = build_router(state);

    // Parse bind address
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting retrieval gateway on {} (model {}, index {})",
        addr,
        config.embedding_model,
        config.pinecone_index
    );
    tracing::info!(
        "Request timeout: {}s, upstream timeout: {}s, max body: {}KB",
        config.request_timeout_secs,
        config.upstream_timeout_secs,
        config.max_body_size_kb
    );
    tracing::info!(
        "Rate limit: {} requests/minute per client, {} requests/hour global",
        config.client_rate_limit_per_minute,
        config.global_rate_limit_per_hour
    );
    tracing::info!(
        "Retries: {}, metrics: {}, ids format: {:?}",
        config.max_retries,
        config.metrics_enabled,
        config.ids_format
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Periodically forget clients with no recent requests.
fn spawn_rate_limit_purge(state: Arc<ServerState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            state.rate_limiter.purge_idle();
            tracing::debug!(
                tracked_clients = state.rate_limiter.tracked_clients(),
                "purged idle rate-limit entries"
            );
        }
    });
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
