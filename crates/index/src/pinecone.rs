//! Pinecone data-plane query client.
//!
//! The index is addressed by name. Its data-plane host is either configured
//! up front or looked up once through the control plane (`GET /indexes/{name}`)
//! and cached for the life of the client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{IndexError, Match, QueryRequest, VectorIndex};

pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_INDEX_NAME: &str = "alloratesting";
pub const API_VERSION: &str = "2025-01";

/// Connection settings for a single Pinecone index.
#[derive(Clone, PartialEq)]
pub struct PineconeConfig {
    /// Sent as the `Api-Key` header.
    pub api_key: String,
    /// Fixed index name; never chosen per request.
    pub index_name: String,
    /// Data-plane host. When `None` it is resolved via the control plane.
    pub index_host: Option<String>,
    /// Optional namespace inside the index.
    pub namespace: Option<String>,
    pub control_plane_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            index_name: DEFAULT_INDEX_NAME.into(),
            index_host: None,
            namespace: None,
            control_plane_url: DEFAULT_CONTROL_PLANE_URL.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl fmt::Debug for PineconeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeConfig")
            .field("api_key", &"<redacted>")
            .field("index_name", &self.index_name)
            .field("index_host", &self.index_host)
            .field("namespace", &self.namespace)
            .field("control_plane_url", &self.control_plane_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl PineconeConfig {
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.api_key.trim().is_empty() {
            return Err(IndexError::InvalidConfig("api_key must be set".into()));
        }
        if self.index_name.trim().is_empty() {
            return Err(IndexError::InvalidConfig("index_name must be set".into()));
        }
        if matches!(self.index_host.as_deref(), Some(host) if host.trim().is_empty()) {
            return Err(IndexError::InvalidConfig(
                "index_host must not be blank".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

/// [`VectorIndex`] backed by a Pinecone serverless or pod index.
pub struct PineconeIndex {
    client: reqwest::Client,
    cfg: PineconeConfig,
    host: OnceCell<String>,
}

impl fmt::Debug for PineconeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeIndex")
            .field("cfg", &self.cfg)
            .field("host", &self.host.get())
            .finish()
    }
}

impl PineconeIndex {
    pub fn new(cfg: PineconeConfig) -> Result<Self, IndexError> {
        cfg.validate()?;
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .connect_timeout(cfg.connect_timeout)
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| IndexError::InvalidConfig(format!("HTTP client: {e}")))?;
        let host = OnceCell::new_with(cfg.index_host.as_deref().map(normalize_host));
        Ok(Self { client, cfg, host })
    }

    pub fn config(&self) -> &PineconeConfig {
        &self.cfg
    }

    async fn data_plane_host(&self) -> Result<&str, IndexError> {
        self.host
            .get_or_try_init(|| self.describe_index_host())
            .await
            .map(String::as_str)
    }

    async fn describe_index_host(&self) -> Result<String, IndexError> {
        let url = format!(
            "{}/indexes/{}",
            self.cfg.control_plane_url.trim_end_matches('/'),
            self.cfg.index_name
        );
        tracing::info!(index = %self.cfg.index_name, "resolving index host");

        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.cfg.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::HostResolution(format!(
                "({}) {}",
                status.as_u16(),
                api_error_message(&body)
            )));
        }

        let described: DescribeIndexResponse = response
            .json()
            .await
            .map_err(|e| IndexError::HostResolution(format!("Invalid JSON response: {e}")))?;
        Ok(normalize_host(&described.host))
    }

    fn transport_error(&self, err: reqwest::Error) -> IndexError {
        if err.is_timeout() {
            IndexError::Timeout(self.cfg.timeout)
        } else {
            IndexError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, request: QueryRequest<'_>) -> Result<Vec<Match>, IndexError> {
        if request.top_k == 0 {
            return Err(IndexError::InvalidConfig("top_k must be at least 1".into()));
        }

        let host = self.data_plane_host().await?;
        let body = QueryBody {
            vector: request.vector,
            top_k: request.top_k,
            include_metadata: request.include_metadata,
            include_values: false,
            namespace: self.cfg.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{host}/query"))
            .header("Api-Key", &self.cfg.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed: QueryResponse = serde_json::from_slice(&bytes)
            .map_err(|e| IndexError::InvalidResponse(format!("Invalid JSON response: {e}")))?;

        tracing::debug!(
            index = %self.cfg.index_name,
            matches = parsed.matches.len(),
            "similarity query completed"
        );
        Ok(parsed.matches)
    }

    fn index_name(&self) -> &str {
        &self.cfg.index_name
    }
}

/// Control-plane hosts come back without a scheme.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// Pinecone reports errors as `{"code": .., "message": ..}` or
/// `{"error": {"code": .., "message": ..}}`.
fn api_error_message(body: &str) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_host_adds_https() {
        assert_eq!(
            normalize_host("alloratesting-abc123.svc.aped-4627-b74a.pinecone.io"),
            "https://alloratesting-abc123.svc.aped-4627-b74a.pinecone.io"
        );
        assert_eq!(normalize_host("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }

    #[test]
    fn query_body_uses_camel_case() {
        let vector = [0.5f32, 0.25];
        let body = QueryBody {
            vector: &vector,
            top_k: 10,
            include_metadata: true,
            include_values: false,
            namespace: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["topK"], 10);
        assert_eq!(value["includeMetadata"], true);
        assert_eq!(value["includeValues"], false);
        assert!(value.get("namespace").is_none());
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            api_error_message(r#"{"code":16,"message":"Invalid API Key","details":[]}"#),
            "Invalid API Key"
        );
        assert_eq!(
            api_error_message(r#"{"error":{"code":"NOT_FOUND","message":"Resource alloratesting not found"}}"#),
            "Resource alloratesting not found"
        );
        assert_eq!(api_error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn config_validation() {
        assert!(PineconeConfig::default().validate().is_err());

        let cfg = PineconeConfig {
            api_key: "pc-test".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.index_name, "alloratesting");

        let blank_host = PineconeConfig {
            index_host: Some("  ".into()),
            ..cfg
        };
        assert!(blank_host.validate().is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = PineconeConfig {
            api_key: "pc-secret".into(),
            ..Default::default()
        };
        assert!(!format!("{cfg:?}").contains("pc-secret"));
    }
}
