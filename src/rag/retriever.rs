//! Query-side retrieval: embed the question, search the user's index,
//! drop weakly related chunks.

use std::sync::Arc;

use tracing::debug;

use crate::core::errors::RagError;
use crate::llm::provider::EmbeddingBackend;

use super::index::SearchHit;
use super::store::IndexStore;

pub struct Retriever {
    embedder: Arc<dyn EmbeddingBackend>,
    store: Arc<IndexStore>,
    similarity_floor: f32,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        store: Arc<IndexStore>,
        similarity_floor: f32,
    ) -> Self {
        Self {
            embedder,
            store,
            similarity_floor,
        }
    }

    /// Return up to `k` chunks of the user's own documents relevant to
    /// `query`, highest similarity first. Candidates below the floor are
    /// dropped; if everything falls below it the result is empty rather
    /// than padding the prompt with weak context. Never fails for a user
    /// without documents.
    pub async fn retrieve(
        &self,
        user_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        // Query embedding happens before any index lock is taken.
        let query_vector = self.embedder.embed(query).await?;

        let hits = self.store.search(user_id, &query_vector, k).await?;
        let total = hits.len();
        let hits: Vec<SearchHit> = hits
            .into_iter()
            .filter(|h| h.score >= self.similarity_floor)
            .collect();

        debug!(
            "retrieved {}/{total} chunks above floor {} for user {user_id}",
            hits.len(),
            self.similarity_floor
        );
        Ok(hits)
    }
}
