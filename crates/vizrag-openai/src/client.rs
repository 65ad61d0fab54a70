//! OpenAI-compatible client implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use vizrag_core::{
    EmbeddingProvider, Error, GenerationConfig, GenerationResult, LLMProvider, Prompt, Result,
};

use crate::config::OpenAIConfig;

/// Client for `/embeddings` and `/chat/completions` on an OpenAI-compatible API
pub struct OpenAIClient {
    config: OpenAIConfig,
    client: Client,
    generation: GenerationConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAIClient {
    /// Create a new client from configuration
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        let generation = GenerationConfig {
            model_id: config.chat_model.clone(),
            ..Default::default()
        };

        Ok(Self {
            config,
            client,
            generation,
        })
    }

    /// Override the default generation settings
    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }
}

/// Pull the service's own error message out of an error body, if it has one
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no details".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

/// Describe a non-success status for the user
fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = error_detail(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("authentication failed ({}): {}", status, detail)
        }
        StatusCode::TOO_MANY_REQUESTS => format!("rate limit or quota exceeded ({}): {}", status, detail),
        _ => format!("request failed with status {}: {}", status, detail),
    }
}

fn describe_transport(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("could not connect: {}", e)
    } else {
        format!("request failed: {}", e)
    }
}

/// Parse an `/embeddings` body into `expected` vectors, in input order
fn parse_embedding_response(body: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| Error::EmbeddingService(format!("malformed response: {}", e)))?;

    if response.data.len() != expected {
        return Err(Error::EmbeddingService(format!(
            "expected {} vectors, service returned {}",
            expected,
            response.data.len()
        )));
    }

    let mut data = response.data;
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
    }

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

/// Parse a `/chat/completions` body into the answer text and token usage
fn parse_chat_response(body: &str) -> Result<(String, Option<u32>)> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::GenerationService(format!("malformed response: {}", e)))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::GenerationService("empty response from model".to_string()));
    }

    Ok((text, response.usage.map(|u| u.total_tokens)))
}

#[async_trait]
impl EmbeddingProvider for OpenAIClient {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            model = %self.config.embedding_model,
            batch_size = texts.len(),
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
        };

        let response = self
            .client
            .post(self.config.endpoint("embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "embedding request failed");
                Error::EmbeddingService(describe_transport(&e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::EmbeddingService(describe_transport(&e)))?;

        if !status.is_success() {
            error!(%status, "embedding API error");
            return Err(Error::EmbeddingService(describe_failure(status, &body)));
        }

        parse_embedding_response(&body, texts.len())
    }

    fn model_id(&self) -> &str {
        &self.config.embedding_model
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn generate(&self, prompt: &Prompt) -> Result<GenerationResult> {
        self.generate_with_config(prompt, &self.generation).await
    }

    async fn generate_with_config(
        &self,
        prompt: &Prompt,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        debug!(
            model = %config.model_id,
            system_len = prompt.system.len(),
            user_len = prompt.user.len(),
            "chat completion"
        );

        let request_body = ChatRequest {
            model: &config.model_id,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "chat completion request failed");
                Error::GenerationService(describe_transport(&e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::GenerationService(describe_transport(&e)))?;

        if !status.is_success() {
            error!(%status, "chat completion API error");
            return Err(Error::GenerationService(describe_failure(status, &body)));
        }

        let (text, tokens_used) = parse_chat_response(&body)?;

        Ok(GenerationResult {
            text,
            model_id: config.model_id.clone(),
            tokens_used,
        })
    }

    fn model_id(&self) -> &str {
        &self.generation.model_id
    }
}
