//! Core traits and types for vizrag
//!
//! This crate defines the error taxonomy, the data model shared by the
//! ingestion and answering pipeline, and the capability traits for the two
//! external services (embedding and generation). Keeping the services behind
//! traits lets deterministic fakes drive every test.

pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod types;

pub use document::{
    SUPPORTED_EXTENSIONS, TextChunk, TextRecord, UploadedDocument, supported_formats,
};
pub use embedding::EmbeddingProvider;
pub use error::{Error, Result};
pub use llm::{GenerationConfig, GenerationResult, LLMProvider, Prompt};
pub use types::*;
