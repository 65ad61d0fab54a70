//! OpenAI-compatible service client for vizrag
//!
//! This crate provides one client that implements both capability traits of
//! `vizrag-core`: [`EmbeddingProvider`] over `/embeddings` and [`LLMProvider`]
//! over `/chat/completions`.

mod client;
mod config;

#[cfg(test)]
mod tests;

pub use client::OpenAIClient;
pub use config::{
    OpenAIConfig, DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_TIMEOUT_SECS,
};

// Re-export core types for convenience
pub use vizrag_core::{EmbeddingProvider, Error, GenerationConfig, LLMProvider, Prompt, Result};
