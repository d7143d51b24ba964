use std::fmt;
use std::time::Duration;

use crate::SemanticError;

/// Default OpenAI embeddings endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/embeddings";
/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
/// Vector length requested from the provider.
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// Runtime configuration for the remote embedding provider.
///
/// # Example
/// ```no_run
/// use semantic::{OpenAiEmbedder, SemanticConfig};
///
/// let cfg = SemanticConfig {
///     api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
///     ..Default::default()
/// };
/// let embedder = OpenAiEmbedder::new(cfg).expect("valid config");
/// ```
#[derive(Clone, PartialEq)]
pub struct SemanticConfig {
    /// Full URL of the embeddings endpoint.
    pub api_url: String,
    /// Secret sent as `Authorization: Bearer <api_key>`.
    pub api_key: String,
    /// Model identifier passed to the provider.
    pub model_name: String,
    /// Requested (and enforced) vector length.
    pub dimensions: usize,
    /// Overall per-request timeout applied by the HTTP client.
    pub timeout: Duration,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            api_key: String::new(),
            model_name: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// Keeps the key out of logs.
impl fmt::Debug for SemanticConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model_name", &self.model_name)
            .field("dimensions", &self.dimensions)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl SemanticConfig {
    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.api_key.trim().is_empty() {
            return Err(SemanticError::InvalidConfig("api_key must be set".into()));
        }
        if self.api_url.trim().is_empty() {
            return Err(SemanticError::InvalidConfig("api_url must be set".into()));
        }
        if self.model_name.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "model_name must be set".into(),
            ));
        }
        if self.dimensions == 0 {
            return Err(SemanticError::InvalidConfig(
                "dimensions must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = SemanticConfig::default();
        assert_eq!(cfg.api_url, "https://api.openai.com/v1/embeddings");
        assert_eq!(cfg.model_name, "text-embedding-3-small");
        assert_eq!(cfg.dimensions, 1536);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert!(cfg.api_key.is_empty());
    }

    #[test]
    fn validate_requires_api_key() {
        let cfg = SemanticConfig::default();
        assert!(matches!(
            cfg.validate(),
            Err(SemanticError::InvalidConfig(_))
        ));

        let cfg = SemanticConfig {
            api_key: "sk-test".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_dimensions() {
        let cfg = SemanticConfig {
            api_key: "sk-test".into(),
            dimensions: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = SemanticConfig {
            api_key: "sk-very-secret".into(),
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
