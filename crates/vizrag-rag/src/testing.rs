//! Deterministic service fakes shared by the crate's tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use vizrag_core::{
    EmbeddingProvider, Error, GenerationConfig, GenerationResult, LLMProvider, Prompt, Result,
};

pub const DIMENSIONS: usize = 32;

/// Bag-of-words embedder: each lower-cased word bumps one md5 bucket
#[derive(Default)]
pub struct HashingEmbedder {
    pub calls: AtomicUsize,
    pub fail: Mutex<bool>,
}

impl HashingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = md5::compute(word.to_lowercase().as_bytes());
            vector[digest.0[0] as usize % DIMENSIONS] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            return Err(Error::EmbeddingService("401 invalid api key".to_string()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model_id(&self) -> &str {
        "hashing"
    }
}

/// Replays queued replies (falling back to an echo) and records every prompt
#[derive(Default)]
pub struct ScriptedLlm {
    pub prompts: Mutex<Vec<Prompt>>,
    pub configs: Mutex<Vec<GenerationConfig>>,
    replies: Mutex<VecDeque<Result<String>>>,
}

impl ScriptedLlm {
    pub fn push_reply(&self, reply: Result<String>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    /// Settings passed through `generate_with_config`, in call order
    pub fn configs(&self) -> Vec<GenerationConfig> {
        self.configs.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLlm {
    async fn generate(&self, prompt: &Prompt) -> Result<GenerationResult> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("echo: {}", prompt.user.lines().last().unwrap_or(""))));

        reply.map(|text| GenerationResult {
            text,
            model_id: "scripted".to_string(),
            tokens_used: None,
        })
    }

    async fn generate_with_config(
        &self,
        prompt: &Prompt,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        self.configs.lock().unwrap().push(config.clone());
        self.generate(prompt).await
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}
