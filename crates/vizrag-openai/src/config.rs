//! OpenAI-compatible service configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;
use vizrag_core::{Error, Result};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the embedding and chat completion endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub api_base: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// Create configuration from environment variables (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup
    ///
    /// `VIZRAG_API_KEY` wins over `OPENAI_API_KEY`. A missing or blank key is
    /// a [`Error::MissingCredential`]; everything else has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = non_blank("VIZRAG_API_KEY")
            .or_else(|| non_blank("OPENAI_API_KEY"))
            .ok_or_else(|| {
                Error::MissingCredential(
                    "VIZRAG_API_KEY or OPENAI_API_KEY environment variable not found".to_string(),
                )
            })?;

        let timeout_secs = match non_blank("VIZRAG_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::Configuration(format!("VIZRAG_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            api_key: api_key.trim().to_string(),
            api_base: non_blank("VIZRAG_API_BASE")
                .or_else(|| non_blank("OPENAI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            chat_model: non_blank("VIZRAG_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: non_blank("VIZRAG_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            timeout_secs,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration with an explicit key and default endpoints
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Check the key is present and the base URL is an http(s) URL
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::MissingCredential("API key is empty".to_string()));
        }

        let base = Url::parse(&self.api_base).map_err(|e| {
            Error::Configuration(format!("invalid API base URL '{}': {}", self.api_base, e))
        })?;
        if base.scheme() != "https" && base.scheme() != "http" {
            return Err(Error::Configuration(format!(
                "API base URL must use http or https, got '{}'",
                base.scheme()
            )));
        }

        if self.timeout_secs == 0 {
            return Err(Error::Configuration("timeout must be at least one second".to_string()));
        }

        Ok(())
    }

    /// Full URL of an endpoint below the API base, e.g. `embeddings`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
