//! Answer generator: one grounded model call per question

use std::sync::Arc;

use tracing::{debug, warn};
use vizrag_core::{Error, GenerationConfig, LLMProvider, Prompt, Result, RetrievedChunk};

/// System instruction sent with every question.
///
/// The two response modes are a contract with the model; nothing in code
/// classifies the question.
pub const SYSTEM_INSTRUCTION: &str = "\
You are an assistant for the Power BI \"HTML Content\" custom visual.
Answer using only the context provided in the user message. If the context does not contain the answer, say so plainly instead of guessing.

Infer what the user is asking for:
1. A calculation, measure or KPI: reply with one complete, self-contained DAX measure (VAR ... RETURN) that can be pasted into Power BI as-is, followed by a short explanation.
2. HTML, CSS or SVG markup: reply with only that code, then state explicitly that the markup must be returned as a text string from a DAX measure and that measure placed in the HTML Content visual, otherwise it will not render.
For anything else answer in concise prose. Reply in the language of the question.";

/// Composes the grounded prompt and calls the language model
pub struct AnswerGenerator {
    llm: Arc<dyn LLMProvider>,
    config: Option<GenerationConfig>,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm, config: None }
    }

    /// Use explicit generation settings instead of the provider defaults
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Answer `question` from `context`. Issues exactly one model call.
    pub async fn generate(&self, question: &str, context: &[RetrievedChunk]) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("the question is empty".to_string()));
        }

        let prompt = build_prompt(question, context);
        debug!(
            model = self.llm.model_id(),
            context_chunks = context.len(),
            "generating answer"
        );

        let result = match &self.config {
            Some(config) => self.llm.generate_with_config(&prompt, config).await,
            None => self.llm.generate(&prompt).await,
        }
        .map_err(|e| {
            warn!(error = %e, "generation failed");
            e
        })?;

        let answer = result.text.trim();
        if answer.is_empty() {
            return Err(Error::GenerationService("the model returned an empty answer".to_string()));
        }

        Ok(answer.to_string())
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }
}

/// Numbered context block, one entry per retrieved chunk
pub fn build_context(context: &[RetrievedChunk]) -> String {
    context
        .iter()
        .map(|retrieved| {
            format!(
                "[{}] {}\n{}",
                retrieved.rank,
                retrieved.chunk.label(),
                retrieved.chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(question: &str, context: &[RetrievedChunk]) -> Prompt {
    Prompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user: format!("Context:\n{}\n\nQuestion: {}", build_context(context), question),
    }
}
