//! Session controller
//!
//! Owns one user's loader, chunker, index and answer generator, and gates
//! question answering on a successfully processed document.
//!
//! ```text
//! EMPTY ──process(file)──▶ INDEXING ──ok──▶ READY ──process(file)──▶ INDEXING
//!   ▲                         │                                        │
//!   └──────── FAILED ◀──err───┘          (err with a previous index ──▶ READY)
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vizrag_core::{
    ConversationTurn, EmbeddingProvider, Error, GenerationConfig, LLMProvider, Result,
    UploadedDocument, supported_formats,
};

use crate::chunker::RecursiveChunker;
use crate::config::RagConfig;
use crate::generator::AnswerGenerator;
use crate::index::{IndexStats, RetrievalIndex};
use crate::loader::{DocumentLoader, FileFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Empty,
    Indexing,
    Ready,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Empty => "EMPTY",
            SessionState::Indexing => "INDEXING",
            SessionState::Ready => "READY",
            SessionState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful "process" action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessReport {
    pub filename: String,
    pub records: usize,
    pub chunks: usize,
    pub index: IndexStats,
}

/// Snapshot of a session for status displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub index: Option<IndexStats>,
    pub turns_answered: usize,
    pub last_error: Option<String>,
}

pub struct SessionController {
    config: RagConfig,
    loader: DocumentLoader,
    chunker: RecursiveChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: AnswerGenerator,
    state: SessionState,
    index: Option<RetrievalIndex>,
    last_turn: Option<ConversationTurn>,
    turns_answered: usize,
    last_error: Option<String>,
}

impl SessionController {
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LLMProvider>,
    ) -> Self {
        Self {
            chunker: RecursiveChunker::new(config.chunk_size, config.chunk_overlap),
            config,
            loader: DocumentLoader::new(),
            embedder,
            generator: AnswerGenerator::new(llm),
            state: SessionState::Empty,
            index: None,
            last_turn: None,
            turns_answered: 0,
            last_error: None,
        }
    }

    /// Stage uploads with a custom loader (e.g. a dedicated temp directory)
    pub fn with_loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generator = self.generator.with_config(config);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready && self.index.is_some()
    }

    pub fn index(&self) -> Option<&RetrievalIndex> {
        self.index.as_ref()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn last_turn(&self) -> Option<&ConversationTurn> {
        self.last_turn.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            index: self.index.as_ref().map(RetrievalIndex::stats),
            turns_answered: self.turns_answered,
            last_error: self.last_error.clone(),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "session state change");
            self.state = next;
        }
    }

    /// The "process" action: load, chunk and index an upload.
    ///
    /// A new index starts a new conversation: the last turn and the answered
    /// count are reset. Without a file, or with an unsupported extension, nothing changes and
    /// the loader is never called. On failure any previous index stays in
    /// service.
    pub async fn process(&mut self, upload: Option<UploadedDocument>) -> Result<ProcessReport> {
        let Some(upload) = upload else {
            return Err(Error::InvalidInput(format!(
                "No file selected. Upload a {} file, then process it.",
                supported_formats()
            )));
        };

        FileFormat::for_upload(&upload)?;

        self.transition(SessionState::Indexing);

        match self.ingest(&upload).await {
            Ok((records, index)) => {
                let report = ProcessReport {
                    filename: upload.filename.clone(),
                    records,
                    chunks: index.len(),
                    index: index.stats(),
                };
                self.index = Some(index);
                self.last_turn = None;
                self.turns_answered = 0;
                self.last_error = None;
                self.transition(SessionState::Ready);
                info!(filename = %report.filename, chunks = report.chunks, "document processed");
                Ok(report)
            }
            Err(e) => {
                warn!(filename = %upload.filename, error = %e, "processing failed");
                self.last_error = Some(e.to_string());
                if self.index.is_some() {
                    self.transition(SessionState::Ready);
                } else {
                    self.transition(SessionState::Failed);
                }
                Err(e)
            }
        }
    }

    async fn ingest(&self, upload: &UploadedDocument) -> Result<(usize, RetrievalIndex)> {
        let records = self.loader.load(upload)?;
        let chunks = self.chunker.chunk_records(&records);
        let index = RetrievalIndex::build(
            chunks,
            self.embedder.as_ref(),
            self.config.metric,
            self.config.embedding_batch_size,
        )
        .await?;
        Ok((records.len(), index))
    }

    /// The "generate" action: retrieve context and answer one question.
    ///
    /// Rejected with [`Error::NotReady`] unless a document has been processed.
    /// Service failures leave the index and state untouched.
    pub async fn ask(&mut self, question: &str) -> Result<ConversationTurn> {
        let index = match (&self.index, self.state) {
            (Some(index), SessionState::Ready) => index,
            _ => return Err(Error::NotReady(self.not_ready_guidance())),
        };

        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("Type a question first.".to_string()));
        }

        let sources = index
            .retrieve(question, self.config.top_k, self.embedder.as_ref())
            .await?;
        let answer = self.generator.generate(question, &sources).await?;

        let turn = ConversationTurn {
            question: question.to_string(),
            answer,
            sources,
            answered_at: Utc::now(),
        };
        self.turns_answered += 1;
        self.last_turn = Some(turn.clone());
        Ok(turn)
    }

    fn not_ready_guidance(&self) -> String {
        match self.state {
            SessionState::Empty => format!(
                "No document has been processed yet. Upload a {} file and process it first.",
                supported_formats()
            ),
            SessionState::Indexing => "The document is still being processed.".to_string(),
            SessionState::Failed => {
                "The last document could not be processed. Upload a file and process it again."
                    .to_string()
            }
            SessionState::Ready => "No index is available. Process a document first.".to_string(),
        }
    }
}
