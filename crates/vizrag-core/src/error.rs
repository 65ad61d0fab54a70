//! Error types for vizrag

use thiserror::Error;

use crate::document::supported_formats;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the vizrag pipeline
///
/// Every variant is recoverable at the action boundary: the shell prints
/// [`Error::guidance`] and keeps the session alive.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Generation service error: {0}")]
    GenerationService(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Session not ready: {0}")]
    NotReady(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Message shown to the user when an action fails.
    pub fn guidance(&self) -> String {
        match self {
            Error::UnsupportedFormat(detail) => format!(
                "{}. Upload a {} file instead.",
                detail,
                supported_formats()
            ),
            Error::Ingestion(detail) => format!(
                "Could not process the document: {}. The previous index, if any, is still in use.",
                detail
            ),
            Error::EmbeddingService(detail) => format!(
                "The embedding service failed: {}. Try processing the document again.",
                detail
            ),
            Error::GenerationService(detail) => format!(
                "The answer could not be generated: {}. Ask again when the service is available.",
                detail
            ),
            Error::MissingCredential(detail) => format!(
                "{}. Set VIZRAG_API_KEY or enter a key with the 'key' command.",
                detail
            ),
            Error::NotReady(detail) => detail.clone(),
            Error::Configuration(detail) => format!("Configuration problem: {}", detail),
            Error::InvalidInput(detail) => detail.clone(),
            Error::Io(e) => format!("File access failed: {}", e),
        }
    }

    /// True for failures of the remote embedding or generation services.
    pub fn is_service_error(&self) -> bool {
        matches!(self, Error::EmbeddingService(_) | Error::GenerationService(_))
    }
}
