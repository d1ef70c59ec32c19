//! OpenAI-compatible HTTP backends (llama.cpp server, LM Studio, vLLM,
//! and friends). Used for the local embedding server and the primary
//! generation backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

use super::provider::{ChatBackend, EmbeddingBackend};
use super::types::ChatMessage;

// ── Embeddings ──────────────────────────────────────────────────────

pub struct OpenAiCompatEmbedder {
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
    client: Client,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiCompatEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        dimensions: usize,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RagError::internal)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
            batch_size: batch_size.max(1),
            client,
        })
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let res = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::EmbeddingFailed(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::EmbeddingFailed(format!(
                "embedding server returned {status}: {body}"
            )));
        }

        let payload: EmbeddingResponse = res
            .json()
            .await
            .map_err(|e| RagError::EmbeddingFailed(e.to_string()))?;

        if payload.data.len() != texts.len() {
            return Err(RagError::EmbeddingFailed(format!(
                "{} inputs but {} vectors returned",
                texts.len(),
                payload.data.len()
            )));
        }

        let vectors: Vec<Vec<f32>> = payload.data.into_iter().map(|d| d.embedding).collect();
        for vector in &vectors {
            if vector.len() != self.dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: vector.len(),
                });
            }
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiCompatEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all.extend(self.request_batch(batch).await?);
        }
        Ok(all)
    }
}

// ── Chat completions ────────────────────────────────────────────────

pub struct OpenAiCompatChat {
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    client: Client,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatChat {
    pub fn new(
        base_url: &str,
        model: &str,
        max_tokens: u32,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RagError::internal)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
            client,
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatChat {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            stream: false,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let res = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::GenerationFailed(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(RagError::GenerationFailed(format!(
                "chat server returned {status}: {body}"
            )));
        }

        let payload: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| RagError::GenerationFailed(e.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RagError::GenerationFailed("empty completion".to_string()))
    }
}
