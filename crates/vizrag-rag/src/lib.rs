//! Retrieval-augmented answering pipeline for vizrag
//!
//! Uploaded files are loaded into text records, split into overlapping
//! chunks, embedded into an in-memory index and searched per question. The
//! retrieved chunks ground a single model call that produces the answer.

mod chunker;
mod config;
mod generator;
mod index;
mod loader;
mod registry;
mod session;

#[cfg(test)]
mod testing;

pub use chunker::{DEFAULT_SEPARATORS, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use generator::{AnswerGenerator, SYSTEM_INSTRUCTION, build_context, build_prompt};
pub use index::{DistanceMetric, IndexStats, RetrievalIndex};
pub use loader::{DocumentLoader, FileFormat};
pub use registry::SessionRegistry;
pub use session::{ProcessReport, SessionController, SessionState, SessionStatus};

// Re-export core types for convenience
pub use vizrag_core::{
    ConversationTurn, EmbeddingProvider, Error, LLMProvider, Result, RetrievedChunk, SessionKey,
    TextChunk, TextRecord, UploadedDocument,
};
