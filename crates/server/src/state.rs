use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::observability::PrometheusPipelineMetrics;
use crate::rate_limit::{Quota, RateLimiter};
use gateway::{OpenAiEmbedder, PineconeIndex, Pipeline, PipelineConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Process-wide request admission
    pub rate_limiter: Arc<RateLimiter>,

    /// Embed-then-query pipeline (shared across requests)
    pub pipeline: Arc<Pipeline>,

    /// Renders `/metrics` when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state with the OpenAI and Pinecone clients.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let embedder = OpenAiEmbedder::new(config.semantic_config())
            .map_err(|e| anyhow::anyhow!("embedding client: {e}"))?;
        let index = PineconeIndex::new(config.pinecone_config())
            .map_err(|e| anyhow::anyhow!("index client: {e}"))?;

        let pipeline = Pipeline::new(
            Arc::new(embedder),
            Arc::new(index),
            pipeline_config(&config),
        )
        .with_metrics(Arc::new(PrometheusPipelineMetrics));

        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Build state around an already assembled pipeline.
    pub fn with_pipeline(config: ServerConfig, pipeline: Pipeline) -> Self {
        let rate_limiter = RateLimiter::new(
            Quota::per_hour(config.global_rate_limit_per_hour),
            Quota::per_minute(config.client_rate_limit_per_minute),
        );
        Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(rate_limiter),
            pipeline: Arc::new(pipeline),
            metrics: None,
        }
    }

    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn pipeline_config(config: &ServerConfig) -> PipelineConfig {
    PipelineConfig {
        top_k: config.top_k,
        include_metadata: true,
        stage_timeout: config.upstream_timeout(),
        retry: config.retry_config(),
    }
}
