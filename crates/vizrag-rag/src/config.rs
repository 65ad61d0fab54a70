//! Configuration for the ingestion and retrieval pipeline

use serde::{Deserialize, Serialize};
use std::env;

use vizrag_core::{Error, Result};

use crate::index::DistanceMetric;

/// Pipeline parameters shared by every session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
    /// Number of chunks handed to the answer generator
    pub top_k: usize,
    /// Texts per embedding request while building an index
    pub embedding_batch_size: usize,
    pub metric: DistanceMetric,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
            top_k: 4,
            embedding_batch_size: 64,
            metric: DistanceMetric::Cosine,
        }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Defaults overridden by `VIZRAG_CHUNK_SIZE`, `VIZRAG_CHUNK_OVERLAP`,
    /// `VIZRAG_TOP_K`, `VIZRAG_EMBEDDING_BATCH` and `VIZRAG_METRIC`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| -> Result<Option<usize>> {
            match lookup(key) {
                Some(raw) if !raw.trim().is_empty() => raw
                    .trim()
                    .parse::<usize>()
                    .map(Some)
                    .map_err(|_| Error::Configuration(format!("{} is not a number: {}", key, raw))),
                _ => Ok(None),
            }
        };

        let mut builder = RagConfig::builder();
        if let Some(size) = number("VIZRAG_CHUNK_SIZE")? {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = number("VIZRAG_CHUNK_OVERLAP")? {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(k) = number("VIZRAG_TOP_K")? {
            builder = builder.top_k(k);
        }
        if let Some(batch) = number("VIZRAG_EMBEDDING_BATCH")? {
            builder = builder.embedding_batch_size(batch);
        }
        if let Some(raw) = lookup("VIZRAG_METRIC").filter(|raw| !raw.trim().is_empty()) {
            builder = builder.metric(raw.parse()?);
        }

        builder.build()
    }
}

/// Builder for a validated [`RagConfig`]
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn embedding_batch_size(mut self, size: usize) -> Self {
        self.config.embedding_batch_size = size;
        self
    }

    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.config.metric = metric;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `chunk_size == 0`,
    /// `chunk_overlap >= chunk_size`, `top_k == 0` or the batch size is zero.
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(Error::Configuration("top_k must be greater than zero".to_string()));
        }
        if config.embedding_batch_size == 0 {
            return Err(Error::Configuration(
                "embedding batch size must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}
