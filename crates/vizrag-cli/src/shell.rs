//! Interactive shell state and command dispatch

use std::path::Path;

use tracing::{debug, info};
use vizrag_core::{ConversationTurn, Error, Result, RetrievedChunk, UploadedDocument};
use vizrag_rag::{ProcessReport, SessionController, SessionStatus};

use crate::commands::ShellCommand;

/// Builds a session around the services reachable with an API key
pub type SessionFactory = Box<dyn Fn(&str) -> Result<SessionController> + Send + Sync>;

/// What a dispatched command produced, for the front end to print
#[derive(Debug)]
pub enum Reply {
    Selected { filename: String, bytes: usize },
    Processed(ProcessReport),
    Answer(ConversationTurn),
    Status(ShellStatus),
    Sources(Vec<RetrievedChunk>),
    KeyRequested,
    Help,
    Exit,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct ShellStatus {
    pub credential: bool,
    pub selected: Option<String>,
    pub session: Option<SessionStatus>,
}

/// One user's shell: the selected file plus, once a key is known, a session
pub struct Shell {
    factory: SessionFactory,
    session: Option<SessionController>,
    selected: Option<UploadedDocument>,
}

impl Shell {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            session: None,
            selected: None,
        }
    }

    /// Build the session for `key`. A previous session and its index are
    /// discarded.
    pub fn set_api_key(&mut self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::MissingCredential("the API key is empty".to_string()));
        }
        let session = (self.factory)(key)?;
        if self.session.replace(session).is_some() {
            info!("API key replaced, previous index discarded");
        }
        Ok(())
    }

    pub fn has_credential(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&SessionController> {
        self.session.as_ref()
    }

    pub fn selected(&self) -> Option<&UploadedDocument> {
        self.selected.as_ref()
    }

    /// Read `path` and make it the file used by the next `process`
    pub fn select(&mut self, path: &Path) -> Result<&UploadedDocument> {
        let upload = UploadedDocument::from_path(path).map_err(|e| {
            Error::InvalidInput(format!("could not read '{}': {}", path.display(), e))
        })?;
        debug!(filename = %upload.filename, bytes = upload.bytes.len(), "file selected");
        Ok(self.selected.insert(upload))
    }

    fn session_mut(&mut self) -> Result<&mut SessionController> {
        self.session.as_mut().ok_or_else(|| {
            Error::MissingCredential("no API key has been provided".to_string())
        })
    }

    pub async fn dispatch(&mut self, command: ShellCommand) -> Result<Reply> {
        match command {
            ShellCommand::Empty => Ok(Reply::Nothing),
            ShellCommand::Help => Ok(Reply::Help),
            ShellCommand::Exit => Ok(Reply::Exit),
            ShellCommand::Key => Ok(Reply::KeyRequested),
            ShellCommand::Upload(path) => {
                let upload = self.select(&path)?;
                Ok(Reply::Selected {
                    filename: upload.filename.clone(),
                    bytes: upload.bytes.len(),
                })
            }
            ShellCommand::Process => {
                let selected = self.selected.clone();
                let report = self.session_mut()?.process(selected).await?;
                Ok(Reply::Processed(report))
            }
            ShellCommand::Ask(question) => {
                let turn = self.session_mut()?.ask(&question).await?;
                Ok(Reply::Answer(turn))
            }
            ShellCommand::Status => Ok(Reply::Status(ShellStatus {
                credential: self.has_credential(),
                selected: self.selected.as_ref().map(|u| u.filename.clone()),
                session: self.session.as_ref().map(SessionController::status),
            })),
            ShellCommand::Sources => Ok(Reply::Sources(
                self.session
                    .as_ref()
                    .and_then(SessionController::last_turn)
                    .map(|turn| turn.sources.clone())
                    .unwrap_or_default(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use vizrag_core::{
        EmbeddingProvider, GenerationConfig, GenerationResult, LLMProvider, Prompt,
    };
    use vizrag_rag::{RagConfig, SessionState};

    #[derive(Default)]
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn model_id(&self) -> &str {
            "counting"
        }
    }

    struct FixedLlm;

    #[async_trait]
    impl LLMProvider for FixedLlm {
        async fn generate(&self, _prompt: &Prompt) -> Result<GenerationResult> {
            Ok(GenerationResult {
                text: "Use `VAR ... RETURN`.".to_string(),
                model_id: "fixed".to_string(),
                tokens_used: None,
            })
        }

        async fn generate_with_config(
            &self,
            prompt: &Prompt,
            _config: &GenerationConfig,
        ) -> Result<GenerationResult> {
            self.generate(prompt).await
        }

        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    fn shell(embedder: Arc<CountingEmbedder>) -> Shell {
        Shell::new(Box::new(move |_key: &str| {
            Ok(SessionController::new(
                RagConfig::default(),
                embedder.clone(),
                Arc::new(FixedLlm),
            ))
        }))
    }

    #[tokio::test]
    async fn test_model_actions_need_a_key() {
        let mut shell = shell(Arc::new(CountingEmbedder::default()));

        let err = shell.dispatch(ShellCommand::Process).await.unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));

        let err = shell.dispatch(ShellCommand::Ask("kpi?".to_string())).await.unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));

        assert!(matches!(
            shell.set_api_key("  ").unwrap_err(),
            Error::MissingCredential(_)
        ));
    }

    #[tokio::test]
    async fn test_process_without_selection_stays_empty() {
        let embedder = Arc::new(CountingEmbedder::default());
        let mut shell = shell(embedder.clone());
        shell.set_api_key("sk-test").unwrap();

        let err = shell.dispatch(ShellCommand::Process).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(shell.session().unwrap().state(), SessionState::Empty);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_process_ask_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("guide.md");
        std::fs::write(&path, "Tarjeta KPI con HTML").unwrap();

        let mut shell = shell(Arc::new(CountingEmbedder::default()));
        shell.set_api_key("sk-test").unwrap();

        match shell.dispatch(ShellCommand::Upload(path)).await.unwrap() {
            Reply::Selected { filename, bytes } => {
                assert_eq!(filename, "guide.md");
                assert_eq!(bytes, 20);
            }
            other => panic!("unexpected reply: {:?}", other),
        }

        assert!(matches!(
            shell.dispatch(ShellCommand::Process).await.unwrap(),
            Reply::Processed(report) if report.chunks == 1
        ));

        match shell.dispatch(ShellCommand::Ask("KPI?".to_string())).await.unwrap() {
            Reply::Answer(turn) => assert_eq!(turn.answer, "Use `VAR ... RETURN`."),
            other => panic!("unexpected reply: {:?}", other),
        }

        match shell.dispatch(ShellCommand::Sources).await.unwrap() {
            Reply::Sources(sources) => {
                assert_eq!(sources.len(), 1);
                assert_eq!(sources[0].chunk.source, "guide.md");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let mut shell = shell(Arc::new(CountingEmbedder::default()));
        let err = shell
            .dispatch(ShellCommand::Upload("/definitely/not/here.txt".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(shell.selected().is_none());
    }

    #[tokio::test]
    async fn test_status_without_key() {
        let mut shell = shell(Arc::new(CountingEmbedder::default()));
        match shell.dispatch(ShellCommand::Status).await.unwrap() {
            Reply::Status(status) => {
                assert!(!status.credential);
                assert!(status.selected.is_none());
                assert!(status.session.is_none());
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }
}
