//! In-memory retrieval index
//!
//! Built once per processed document and never updated in place: a new
//! upload produces a whole new index.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vizrag_core::{EmbeddingProvider, Error, Result, RetrievedChunk, TextChunk};

/// Similarity measure, fixed for the lifetime of an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

impl DistanceMetric {
    /// Score where higher means more similar: cosine similarity, or the
    /// negated L2 distance.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::Euclidean => -euclidean_distance(a, b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclidean" | "l2" => Ok(DistanceMetric::Euclidean),
            other => Err(Error::Configuration(format!(
                "unknown distance metric '{}', expected cosine or l2",
                other
            ))),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Cosine => f.write_str("cosine"),
            DistanceMetric::Euclidean => f.write_str("l2"),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Summary of a built index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub chunks: usize,
    pub dimensions: usize,
    pub sources: Vec<String>,
    pub metric: DistanceMetric,
    pub embedding_model: String,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: TextChunk,
    embedding: Vec<f32>,
}

/// Chunks paired with their embeddings, in insertion order
#[derive(Debug, Clone)]
pub struct RetrievalIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
    metric: DistanceMetric,
    embedding_model: String,
    built_at: DateTime<Utc>,
}

impl RetrievalIndex {
    /// Embed every chunk and build an index.
    ///
    /// Any embedding failure aborts the build; nothing partial is returned.
    pub async fn build(
        chunks: Vec<TextChunk>,
        embedder: &dyn EmbeddingProvider,
        metric: DistanceMetric,
        batch_size: usize,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::Ingestion("the document contains no text to index".to_string()));
        }

        let mut entries = Vec::with_capacity(chunks.len());
        let mut dimensions = 0;

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            debug!(batch_size = texts.len(), "embedding chunk batch");

            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::EmbeddingService(format!(
                    "expected {} vectors, service returned {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(vectors) {
                if dimensions == 0 {
                    dimensions = embedding.len();
                }
                if embedding.is_empty() || embedding.len() != dimensions {
                    return Err(Error::EmbeddingService(format!(
                        "inconsistent embedding dimension {} (expected {})",
                        embedding.len(),
                        dimensions
                    )));
                }
                entries.push(IndexEntry {
                    chunk: chunk.clone(),
                    embedding,
                });
            }
        }

        info!(chunks = entries.len(), dimensions, %metric, "retrieval index built");

        Ok(Self {
            entries,
            dimensions,
            metric,
            embedding_model: embedder.model_id().to_string(),
            built_at: Utc::now(),
        })
    }

    /// Embed `query` and return the `k` most similar chunks, best first
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<RetrievedChunk>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("the question is empty".to_string()));
        }
        if k == 0 {
            return Err(Error::InvalidInput("k must be greater than zero".to_string()));
        }

        let query_vector = embedder.embed(query).await?;
        self.search_by_vector(&query_vector, k)
    }

    /// Rank chunks against an already-embedded query.
    ///
    /// Ties keep insertion order.
    pub fn search_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Err(Error::InvalidInput("k must be greater than zero".to_string()));
        }
        if query.len() != self.dimensions {
            return Err(Error::EmbeddingService(format!(
                "query vector has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let score = self.metric.score(&entry.embedding, query);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(position, (i, score))| RetrievedChunk {
                chunk: self.entries[i].chunk.clone(),
                score,
                rank: position + 1,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TextChunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }

    pub fn stats(&self) -> IndexStats {
        let mut sources: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !sources.contains(&entry.chunk.source) {
                sources.push(entry.chunk.source.clone());
            }
        }

        IndexStats {
            chunks: self.entries.len(),
            dimensions: self.dimensions,
            sources,
            metric: self.metric,
            embedding_model: self.embedding_model.clone(),
            built_at: self.built_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Returns a fixed vector per known text, or a zero vector
    struct TableEmbedder {
        vectors: HashMap<String, Vec<f32>>,
    }

    impl TableEmbedder {
        fn new(pairs: &[(&str, [f32; 3])]) -> Self {
            Self {
                vectors: pairs
                    .iter()
                    .map(|(text, v)| (text.to_string(), v.to_vec()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| self.vectors.get(*t).cloned().unwrap_or_else(|| vec![0.0; 3]))
                .collect())
        }

        fn model_id(&self) -> &str {
            "table"
        }
    }

    struct RaggedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for RaggedEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![1.0; t.len()]).collect())
        }

        fn model_id(&self) -> &str {
            "ragged"
        }
    }

    fn chunk(content: &str, i: usize) -> TextChunk {
        TextChunk {
            id: format!("c{}", i),
            content: content.to_string(),
            source: "notes.txt".to_string(),
            row: None,
            record_index: 0,
            chunk_index: i,
            offset: 0,
        }
    }

    fn abc_embedder() -> TableEmbedder {
        TableEmbedder::new(&[
            ("A", [1.0, 0.0, 0.0]),
            ("B", [0.0, 1.0, 0.0]),
            ("C", [0.0, 0.0, 1.0]),
            ("near A", [0.9, 0.2, 0.1]),
        ])
    }

    #[tokio::test]
    async fn test_closest_chunk_ranks_first() {
        let embedder = abc_embedder();
        for metric in [DistanceMetric::Cosine, DistanceMetric::Euclidean] {
            let chunks = vec![chunk("B", 0), chunk("A", 1), chunk("C", 2)];
            let index = RetrievalIndex::build(chunks, &embedder, metric, 2).await.unwrap();

            let results = index.retrieve("near A", 3, &embedder).await.unwrap();
            assert_eq!(results[0].chunk.content, "A", "metric {}", metric);
            assert_eq!(results[0].rank, 1);
            assert!(results[0].score >= results[1].score);
        }
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let embedder = TableEmbedder::new(&[
            ("first", [1.0, 0.0, 0.0]),
            ("second", [1.0, 0.0, 0.0]),
            ("third", [0.0, 1.0, 0.0]),
            ("query", [1.0, 0.0, 0.0]),
        ]);
        let chunks = vec![chunk("first", 0), chunk("second", 1), chunk("third", 2)];
        let index = RetrievalIndex::build(chunks, &embedder, DistanceMetric::Cosine, 8)
            .await
            .unwrap();

        let results = index.retrieve("query", 2, &embedder).await.unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.chunk.content.as_str()).collect();
        assert_eq!(order, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_k_larger_than_index_returns_everything() {
        let embedder = abc_embedder();
        let index = RetrievalIndex::build(vec![chunk("A", 0)], &embedder, DistanceMetric::Cosine, 1)
            .await
            .unwrap();

        assert_eq!(index.retrieve("near A", 10, &embedder).await.unwrap().len(), 1);
        assert!(matches!(
            index.retrieve("near A", 0, &embedder).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_build_is_ingestion_error() {
        let err = RetrievalIndex::build(Vec::new(), &abc_embedder(), DistanceMetric::Cosine, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));
    }

    #[tokio::test]
    async fn test_inconsistent_dimensions_abort_build() {
        let chunks = vec![chunk("ab", 0), chunk("abc", 1)];
        let err = RetrievalIndex::build(chunks, &RaggedEmbedder, DistanceMetric::Cosine, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddingService(_)));
    }

    #[tokio::test]
    async fn test_stats_report_sources_once() {
        let embedder = abc_embedder();
        let mut second = chunk("B", 1);
        second.source = "sales.csv".to_string();
        let chunks = vec![chunk("A", 0), second, chunk("C", 2)];
        let index = RetrievalIndex::build(chunks, &embedder, DistanceMetric::Cosine, 2)
            .await
            .unwrap();

        let stats = index.stats();
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.dimensions, 3);
        assert_eq!(stats.sources, vec!["notes.txt".to_string(), "sales.csv".to_string()]);
        assert_eq!(stats.embedding_model, "table");
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("L2".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclidean);
        assert_eq!("cosine".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }
}
