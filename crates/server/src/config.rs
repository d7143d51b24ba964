use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use gateway::{PineconeConfig, RetryConfig, SemanticConfig};

/// Environment variables read without the `GATEWAY__` prefix, mapped to
/// their config keys. Prefixed variables win over these.
const PLAIN_ENV_KEYS: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "openai_api_key"),
    ("PINECONE_API_KEY", "pinecone_api_key"),
    ("ACCESS_TOKEN", "access_token"),
    ("PORT", "port"),
    ("HOST", "bind_addr"),
];

/// How matched identifiers are rendered in a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdsFormat {
    /// `"a, b, c"`
    #[default]
    Joined,
    /// `["a", "b", "c"]`
    List,
}

/// Server configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Expected bearer token for `/api/get_results`
    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub openai_api_key: String,

    #[serde(default)]
    pub pinecone_api_key: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Override for the embeddings endpoint (proxies, tests)
    #[serde(default)]
    pub openai_base_url: Option<String>,

    #[serde(default = "default_pinecone_index")]
    pub pinecone_index: String,

    /// Data-plane host; resolved through the control plane when unset
    #[serde(default)]
    pub pinecone_host: Option<String>,

    #[serde(default)]
    pub pinecone_namespace: Option<String>,

    #[serde(default)]
    pub pinecone_control_plane_url: Option<String>,

    /// Neighbours requested per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Per-attempt bound on each outbound call
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Whole-request bound
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in KB
    #[serde(default = "default_max_body_size_kb")]
    pub max_body_size_kb: usize,

    #[serde(default = "default_client_rate_limit_per_minute")]
    pub client_rate_limit_per_minute: u32,

    #[serde(default = "default_global_rate_limit_per_hour")]
    pub global_rate_limit_per_hour: u32,

    /// Key rate-limit buckets on the first `X-Forwarded-For` hop
    #[serde(default)]
    pub trust_forwarded_for: bool,

    #[serde(default)]
    pub ids_format: IdsFormat,

    /// Embed upstream error detail in 500 responses
    #[serde(default = "default_true")]
    pub expose_upstream_errors: bool,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            access_token: String::new(),
            openai_api_key: String::new(),
            pinecone_api_key: String::new(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            openai_base_url: None,
            pinecone_index: default_pinecone_index(),
            pinecone_host: None,
            pinecone_namespace: None,
            pinecone_control_plane_url: None,
            top_k: default_top_k(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_size_kb: default_max_body_size_kb(),
            client_rate_limit_per_minute: default_client_rate_limit_per_minute(),
            global_rate_limit_per_hour: default_global_rate_limit_per_hour(),
            trust_forwarded_for: false,
            ids_format: IdsFormat::default(),
            expose_upstream_errors: default_true(),
            max_retries: 0,
            retry_base_delay_ms: default_retry_base_delay_ms(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("access_token", &redacted(&self.access_token))
            .field("openai_api_key", &redacted(&self.openai_api_key))
            .field("pinecone_api_key", &redacted(&self.pinecone_api_key))
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("pinecone_index", &self.pinecone_index)
            .field("pinecone_host", &self.pinecone_host)
            .field("top_k", &self.top_k)
            .field("client_rate_limit_per_minute", &self.client_rate_limit_per_minute)
            .field("global_rate_limit_per_hour", &self.global_rate_limit_per_hour)
            .field("ids_format", &self.ids_format)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.*` file and the
    /// environment, then validate it.
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is normal outside local development.
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        for (var, key) in PLAIN_ENV_KEYS {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_default(*key, value)?;
            }
        }

        let builder = builder
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix("GATEWAY")
                    .prefix_separator("__")
                    .separator("__"),
            );

        Self::from_builder(builder)
    }

    /// Deserialize and validate an already assembled builder.
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> anyhow::Result<Self> {
        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("access_token", &self.access_token),
            ("openai_api_key", &self.openai_api_key),
            ("pinecone_api_key", &self.pinecone_api_key),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{name} must be set (GATEWAY__{})", name.to_uppercase());
            }
        }
        if self.pinecone_index.trim().is_empty() {
            anyhow::bail!("pinecone_index must not be empty");
        }
        if self.top_k == 0 {
            anyhow::bail!("top_k must be at least 1");
        }
        if self.embedding_dimensions == 0 {
            anyhow::bail!("embedding_dimensions must be at least 1");
        }
        if self.client_rate_limit_per_minute == 0 || self.global_rate_limit_per_hour == 0 {
            anyhow::bail!("rate limits must be at least 1");
        }
        if self.upstream_timeout_secs == 0 || self.request_timeout_secs == 0 {
            anyhow::bail!("timeouts must be at least 1 second");
        }
        let budget = self.pipeline_budget();
        if self.timeout() <= budget {
            anyhow::bail!(
                "request_timeout_secs ({}s) must exceed the worst-case upstream time of {}ms \
                 (two stages, {} retries, {}s each attempt)",
                self.request_timeout_secs,
                budget.as_millis(),
                self.max_retries,
                self.upstream_timeout_secs
            );
        }
        self.socket_addr()?;
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind_addr {:?}: {e}", self.bind_addr))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Longest the embed and query stages can take together, counting every
    /// attempt and backoff. The request timeout must outlast it so a stalled
    /// upstream surfaces as that stage's error, not a bare 408.
    pub fn pipeline_budget(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let stage = self
            .upstream_timeout()
            .saturating_mul(attempts)
            .saturating_add(self.retry_config().max_total_delay());
        stage.saturating_mul(2)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_kb * 1024
    }

    pub fn semantic_config(&self) -> SemanticConfig {
        let defaults = SemanticConfig::default();
        SemanticConfig {
            api_url: self.openai_base_url.clone().unwrap_or(defaults.api_url),
            api_key: self.openai_api_key.clone(),
            model_name: self.embedding_model.clone(),
            dimensions: self.embedding_dimensions,
            timeout: self.upstream_timeout(),
            ..defaults
        }
    }

    pub fn pinecone_config(&self) -> PineconeConfig {
        let defaults = PineconeConfig::default();
        PineconeConfig {
            api_key: self.pinecone_api_key.clone(),
            index_name: self.pinecone_index.clone(),
            index_host: self.pinecone_host.clone(),
            namespace: self.pinecone_namespace.clone(),
            control_plane_url: self
                .pinecone_control_plane_url
                .clone()
                .unwrap_or(defaults.control_plane_url),
            timeout: self.upstream_timeout(),
            ..defaults
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(self.max_retries)
            .with_base_delay(Duration::from_millis(self.retry_base_delay_ms))
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_embedding_model() -> String {
    semantic::DEFAULT_MODEL.to_string()
}

fn default_embedding_dimensions() -> usize {
    semantic::DEFAULT_DIMENSIONS
}

fn default_pinecone_index() -> String {
    index::DEFAULT_INDEX_NAME.to_string()
}

fn default_top_k() -> usize {
    10
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    75
}

fn default_max_body_size_kb() -> usize {
    64
}

fn default_client_rate_limit_per_minute() -> u32 {
    10
}

fn default_global_rate_limit_per_hour() -> u32 {
    50
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secrets() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("access_token", "token-123")
            .unwrap()
            .set_override("openai_api_key", "sk-test")
            .unwrap()
            .set_override("pinecone_api_key", "pc-test")
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.bind_addr, "0.0.0.0");
        assert_eq!(cfg.top_k, 10);
        assert_eq!(cfg.embedding_model, "text-embedding-3-small");
        assert_eq!(cfg.embedding_dimensions, 1536);
        assert_eq!(cfg.pinecone_index, "alloratesting");
        assert_eq!(cfg.client_rate_limit_per_minute, 10);
        assert_eq!(cfg.global_rate_limit_per_hour, 50);
        assert_eq!(cfg.ids_format, IdsFormat::Joined);
        assert_eq!(cfg.max_retries, 0);
        assert!(cfg.expose_upstream_errors);
        assert!(cfg.metrics_enabled);
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn ipv6_bind_addr_is_accepted() {
        let cfg = ServerConfig {
            bind_addr: "::".into(),
            port: 9000,
            ..ServerConfig::default()
        };
        let addr = cfg.socket_addr().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 9000);

        let cfg = ServerConfig {
            bind_addr: "localhost".into(),
            ..ServerConfig::default()
        };
        assert!(cfg.socket_addr().is_err());
    }

    #[test]
    fn request_timeout_must_outlast_upstream_stages() {
        let builder = with_secrets()
            .set_override("upstream_timeout_secs", 1)
            .unwrap()
            .set_override("request_timeout_secs", 2)
            .unwrap()
            .set_override("max_retries", 2)
            .unwrap();
        let err = ServerConfig::from_builder(builder).unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));

        let builder = with_secrets()
            .set_override("upstream_timeout_secs", 30)
            .unwrap()
            .set_override("request_timeout_secs", 60)
            .unwrap();
        assert!(ServerConfig::from_builder(builder).is_err());
    }

    #[test]
    fn default_timeouts_leave_headroom() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.pipeline_budget(), Duration::from_secs(60));
        assert!(cfg.timeout() > cfg.pipeline_budget());

        let cfg = ServerConfig {
            upstream_timeout_secs: 1,
            max_retries: 2,
            ..ServerConfig::default()
        };
        // Two stages of three 1s attempts plus 200ms and 400ms backoff with jitter.
        assert_eq!(cfg.pipeline_budget(), Duration::from_millis(7800));
    }

    #[test]
    fn builder_fills_defaults() {
        let cfg = ServerConfig::from_builder(with_secrets()).unwrap();
        assert_eq!(cfg.access_token, "token-123");
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.max_body_size(), 64 * 1024);
        assert_eq!(cfg.timeout(), Duration::from_secs(75));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let builder = config::Config::builder()
            .set_override("openai_api_key", "sk-test")
            .unwrap()
            .set_override("pinecone_api_key", "pc-test")
            .unwrap();
        let err = ServerConfig::from_builder(builder).unwrap_err();
        assert!(err.to_string().contains("access_token"));
    }

    #[test]
    fn zero_quota_is_rejected() {
        let builder = with_secrets()
            .set_override("client_rate_limit_per_minute", 0)
            .unwrap();
        assert!(ServerConfig::from_builder(builder).is_err());
    }

    #[test]
    fn ids_format_parses_lowercase() {
        let builder = with_secrets().set_override("ids_format", "list").unwrap();
        let cfg = ServerConfig::from_builder(builder).unwrap();
        assert_eq!(cfg.ids_format, IdsFormat::List);
    }

    #[test]
    fn stage_configs_carry_settings() {
        let builder = with_secrets()
            .set_override("pinecone_host", "alloratesting-abc.svc.pinecone.io")
            .unwrap()
            .set_override("upstream_timeout_secs", 5)
            .unwrap()
            .set_override("max_retries", 2)
            .unwrap();
        let cfg = ServerConfig::from_builder(builder).unwrap();

        let embed_cfg = cfg.semantic_config();
        assert_eq!(embed_cfg.api_key, "sk-test");
        assert_eq!(embed_cfg.dimensions, 1536);
        assert_eq!(embed_cfg.timeout, Duration::from_secs(5));
        assert_eq!(embed_cfg.api_url, semantic::DEFAULT_API_URL);

        let pinecone = cfg.pinecone_config();
        assert_eq!(pinecone.index_name, "alloratesting");
        assert_eq!(
            pinecone.index_host.as_deref(),
            Some("alloratesting-abc.svc.pinecone.io")
        );

        assert_eq!(cfg.retry_config().max_retries, 2);
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = ServerConfig::from_builder(with_secrets()).unwrap();
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("token-123"));
        assert!(!printed.contains("sk-test"));
        assert!(!printed.contains("pc-test"));
    }
}
