use std::sync::Arc;
use std::time::{Duration, Instant};

use index::{IndexError, Match, QueryRequest, VectorIndex};
use semantic::{Embedder, SemanticError};

use crate::query::{QueryText, ResultSet};
use crate::retry::{retry_async, RetryConfig};
use crate::{PipelineError, PipelineMetrics};

/// Tuning knobs for a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Neighbours requested from the index, and the cap on returned ids.
    pub top_k: usize,
    pub include_metadata: bool,
    /// Bound on a single outbound attempt, embed or query.
    pub stage_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            include_metadata: true,
            stage_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// Embed-then-query retrieval over injected capabilities.
///
/// The two stages are strictly sequential: the index is only queried once an
/// embedding has been produced, and any failure ends the request.
#[derive(Clone)]
pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: PipelineConfig,
    metrics: Option<Arc<dyn PipelineMetrics>>,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn index_name(&self) -> &str {
        self.index.index_name()
    }

    pub async fn run(&self, text: &QueryText) -> Result<ResultSet, PipelineError> {
        let start = Instant::now();
        let vector = self.embed(text).await?;
        let matches = self.query(&vector).await?;
        drop(vector);

        let mut results = ResultSet::from_matches(matches);
        if let ResultSet::Matches(ids) = &mut results {
            ids.truncate(self.config.top_k);
        }

        tracing::info!(
            text_len = text.len(),
            matches = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "retrieval completed"
        );
        Ok(results)
    }

    async fn embed(&self, text: &QueryText) -> Result<Vec<f32>, PipelineError> {
        let start = Instant::now();
        let timeout = self.config.stage_timeout;
        let embedder = &self.embedder;
        let text = text.as_str();
        let result = retry_async(&self.config.retry, SemanticError::is_transient, move |_| async move {
            match tokio::time::timeout(timeout, embedder.embed(text)).await {
                Ok(result) => result,
                Err(_) => Err(SemanticError::Timeout(timeout)),
            }
        })
        .await;

        if let Some(metrics) = &self.metrics {
            let outcome = result.as_ref().map(|_| ()).map_err(|e| e.clone());
            metrics.record_embed(start.elapsed(), outcome);
        }

        match result {
            Ok(embedding) => Ok(embedding.vector),
            Err(err) => {
                tracing::error!(
                    model = self.embedder.model_name(),
                    error = %err,
                    "embedding request failed"
                );
                Err(PipelineError::Embedding(err))
            }
        }
    }

    async fn query(&self, vector: &[f32]) -> Result<Vec<Match>, PipelineError> {
        let start = Instant::now();
        let timeout = self.config.stage_timeout;
        let request = QueryRequest {
            vector,
            top_k: self.config.top_k,
            include_metadata: self.config.include_metadata,
        };
        let vector_index = &self.index;
        let result = retry_async(&self.config.retry, IndexError::is_transient, move |_| async move {
            match tokio::time::timeout(timeout, vector_index.query(request)).await {
                Ok(result) => result,
                Err(_) => Err(IndexError::Timeout(timeout)),
            }
        })
        .await;

        if let Some(metrics) = &self.metrics {
            let outcome = result.as_ref().map(|_| ()).map_err(|e| e.clone());
            metrics.record_query(start.elapsed(), outcome);
        }

        result.map_err(|err| {
            tracing::error!(
                index = self.index.index_name(),
                error = %err,
                "similarity query failed"
            );
            PipelineError::Index(err)
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("model", &self.embedder.model_name())
            .field("index", &self.index.index_name())
            .field("config", &self.config)
            .finish()
    }
}
