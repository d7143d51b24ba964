use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Embedder, Embedding, SemanticConfig, SemanticError};

/// Embedding client for OpenAI-compatible `/v1/embeddings` endpoints.
///
/// One text per call, no batching. The HTTP client (and its connection pool)
/// is built once and reused for every request.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    cfg: SemanticConfig,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
    model: &'a str,
    dimensions: usize,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl OpenAiEmbedder {
    pub fn new(cfg: SemanticConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .connect_timeout(cfg.connect_timeout)
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client, cfg })
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.cfg
    }

    async fn send_request(&self, text: &str) -> Result<EmbeddingResponse, SemanticError> {
        let payload = EmbeddingRequest {
            input: [text],
            model: &self.cfg.model_name,
            dimensions: self.cfg.dimensions,
            encoding_format: "float",
        };

        let response = self
            .client
            .post(&self.cfg.api_url)
            .bearer_auth(&self.cfg.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SemanticError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&body)
            .map_err(|e| SemanticError::InvalidResponse(format!("Invalid JSON response: {e}")))
    }

    fn transport_error(&self, err: reqwest::Error) -> SemanticError {
        if err.is_timeout() {
            SemanticError::Timeout(self.cfg.timeout)
        } else {
            SemanticError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, SemanticError> {
        let response = self.send_request(text).await?;
        let vector = first_embedding(response)?;

        if vector.len() != self.cfg.dimensions {
            return Err(SemanticError::DimensionMismatch {
                expected: self.cfg.dimensions,
                actual: vector.len(),
            });
        }

        tracing::debug!(
            model = %self.cfg.model_name,
            dim = vector.len(),
            "embedding received"
        );

        Ok(Embedding {
            vector,
            model_name: self.cfg.model_name.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.cfg.model_name
    }
}

fn first_embedding(response: EmbeddingResponse) -> Result<Vec<f32>, SemanticError> {
    response
        .data
        .into_iter()
        .min_by_key(|item| item.index)
        .map(|item| item.embedding)
        .ok_or_else(|| SemanticError::InvalidResponse("response did not contain embeddings".into()))
}

/// Pull a human-readable message out of a provider error body.
///
/// OpenAI wraps errors as `{"error": {"message": ...}}`; anything else is
/// returned as-is so no detail is lost.
pub(crate) fn api_error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
    });

    match message {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().to_string(),
    }
}
