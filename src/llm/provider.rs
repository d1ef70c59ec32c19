use async_trait::async_trait;

use crate::core::errors::RagError;

/// Text embedding backend.
///
/// The same model must be used for indexing and querying an index;
/// `model_id` and `dimensions` are recorded alongside persisted vectors
/// so drift can be detected.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Identifier of the embedding model (e.g. "nomic-embed-text-v1.5").
    fn model_id(&self) -> &str;

    /// Vector width produced by this backend.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    /// A failure on any item fails the whole batch.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::EmbeddingFailed("no vector returned".to_string()))
    }
}

/// Single-shot text completion backend. Stateless: no multi-turn session
/// is held here.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider name for logs (e.g. "openai-compat", "gemini").
    fn name(&self) -> &str;

    /// Send one prompt, return the raw response text. The text is not
    /// assumed to be well-formed JSON even when the prompt asked for it.
    async fn complete(&self, prompt: &str) -> Result<String, RagError>;
}
