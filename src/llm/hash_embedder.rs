//! Deterministic token-hash embedder.
//!
//! Maps each lowercased alphanumeric token into a hashed bucket and
//! L2-normalizes the resulting bag-of-words vector. No model, no
//! network: meant for offline development and tests, where retrieval
//! quality matters less than determinism.

use async_trait::async_trait;

use crate::core::errors::RagError;

use super::provider::EmbeddingBackend;

pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(&token.to_lowercase()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl EmbeddingBackend for HashEmbedder {
    fn model_id(&self) -> &str {
        "token-hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::index::cosine_similarity;

    #[tokio::test]
    async fn identical_input_gives_identical_vectors() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("The capital of France is Paris.").await.unwrap();
        let b = embedder.embed("The capital of France is Paris.").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let embedder = HashEmbedder::new(64);
        let v = embedder.embed("some study notes about biology").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn overlapping_vocabulary_scores_higher() {
        let embedder = HashEmbedder::new(128);
        let doc = embedder.embed("The capital of France is Paris.").await.unwrap();
        let close = embedder
            .embed("What is the capital of France?")
            .await
            .unwrap();
        let far = embedder.embed("quantum entanglement spin states").await.unwrap();

        assert!(cosine_similarity(&doc, &close) > cosine_similarity(&doc, &far));
        assert!(cosine_similarity(&doc, &close) > 0.4);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashEmbedder::new(32);
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
