//! Embedding provider trait

use async_trait::async_trait;

use crate::{Error, Result};

/// A provider that turns text into fixed-dimension vectors.
///
/// The default [`embed`](EmbeddingProvider::embed) goes through
/// [`embed_batch`](EmbeddingProvider::embed_batch), so backends only need to
/// implement the batch call.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingService("service returned no vector".to_string()))
    }

    /// Identifier of the embedding model
    fn model_id(&self) -> &str;
}
