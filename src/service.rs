//! Entry points for the surrounding application.
//!
//! One `StudyService` per process: ingestion and deletion hooks called
//! after the host persists document metadata, and the four query tasks
//! (chat, quiz, puzzle, question bank), each running
//! retrieve → build prompt → generate → parse.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::artifacts::{
    ChatAnswer, PuzzleArtifact, PuzzleKind, QuestionBank, QuestionKind, Quiz,
};
use crate::core::config::AppConfig;
use crate::core::errors::RagError;
use crate::extract::{self, DocumentKind};
use crate::llm::client::GenerationClient;
use crate::llm::gemini::GeminiChat;
use crate::llm::openai_compat::{OpenAiCompatChat, OpenAiCompatEmbedder};
use crate::llm::provider::{ChatBackend, EmbeddingBackend};
use crate::parse::extract_json;
use crate::prompt;
use crate::rag::chunker::split_text;
use crate::rag::index::{ChunkRecord, SearchHit};
use crate::rag::retriever::Retriever;
use crate::rag::store::IndexStore;

const MAX_QUIZ_ITEMS: usize = 10;
const MAX_PUZZLE_ITEMS: usize = 12;
const MAX_QUESTION_ITEMS: usize = 10;

/// Fallback retrieval queries when the task has no user-supplied topic.
const QUIZ_DEFAULT_QUERY: &str = "key concepts and important topics";
const PUZZLE_QUERY: &str = "important concepts and key terms";
const QUESTIONS_QUERY: &str = "key concepts and study material";

/// What the metadata layer hands over for ingestion.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub document_id: String,
    pub owner_user_id: String,
    pub storage_path: PathBuf,
    pub declared_type: DocumentKind,
    /// Original filename, carried into chunk provenance.
    pub original_name: String,
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
    pub ingested_at: DateTime<Utc>,
}

pub struct StudyService {
    config: AppConfig,
    embedder: Arc<dyn EmbeddingBackend>,
    store: Arc<IndexStore>,
    retriever: Retriever,
    generation: GenerationClient,
}

impl StudyService {
    /// Wire up the production backends from configuration. The cloud
    /// fallback is only attached when `GEMINI_API_KEY` is present.
    pub fn new(config: AppConfig) -> Result<Self, RagError> {
        config.validate()?;
        let timeout = Duration::from_secs(config.generation.timeout_secs);

        let embedder: Arc<dyn EmbeddingBackend> = Arc::new(OpenAiCompatEmbedder::new(
            &config.embedding.base_url,
            &config.embedding.model,
            config.embedding.dimensions,
            config.embedding.batch_size,
            timeout,
        )?);

        let primary: Arc<dyn ChatBackend> = Arc::new(OpenAiCompatChat::new(
            &config.generation.primary.base_url,
            &config.generation.primary.model,
            config.generation.max_tokens,
            config.generation.temperature,
            timeout,
        )?);

        let secondary: Option<Arc<dyn ChatBackend>> = match AppConfig::gemini_api_key() {
            Some(key) => Some(Arc::new(GeminiChat::new(
                &config.generation.secondary.model,
                &key,
                config.generation.max_tokens,
                config.generation.temperature,
                timeout,
            )?)),
            None => {
                warn!("no cloud API key configured; generation has no fallback backend");
                None
            }
        };

        Self::with_backends(config, embedder, primary, secondary)
    }

    /// Wire up with injected backends. Used by tests and hosts that
    /// bring their own providers.
    pub fn with_backends(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingBackend>,
        primary: Arc<dyn ChatBackend>,
        secondary: Option<Arc<dyn ChatBackend>>,
    ) -> Result<Self, RagError> {
        config.validate()?;
        if embedder.dimensions() != config.embedding.dimensions {
            return Err(RagError::Config(format!(
                "embedder produces {}-dim vectors but config declares {}",
                embedder.dimensions(),
                config.embedding.dimensions
            )));
        }

        let store = Arc::new(IndexStore::new(
            &config.storage.index_root,
            embedder.dimensions(),
            embedder.model_id(),
        ));
        let retriever = Retriever::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            config.retrieval.similarity_floor,
        );
        let generation = GenerationClient::new(primary, secondary);

        Ok(Self {
            config,
            embedder,
            store,
            retriever,
            generation,
        })
    }

    // ── Ingestion path ──────────────────────────────────────────────

    /// Extract, chunk, embed, and index one uploaded document.
    /// Re-ingesting the same document id replaces its previous chunks.
    pub async fn ingest(&self, document: &DocumentSource) -> Result<IngestReport, RagError> {
        let text =
            extract::extract_text(&document.storage_path, document.declared_type).await?;

        let spans = split_text(
            &text,
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        );
        if spans.is_empty() {
            return Err(RagError::ExtractionFailed(format!(
                "document {} produced no chunks",
                document.document_id
            )));
        }

        let texts: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let records: Vec<ChunkRecord> = spans
            .into_iter()
            .map(|span| ChunkRecord {
                chunk_id: Uuid::new_v4().to_string(),
                document_id: document.document_id.clone(),
                seq: span.seq,
                text: span.text,
                source_name: document.original_name.clone(),
                start: span.start,
                end: span.end,
            })
            .collect();

        let chunk_count = self
            .store
            .replace_document(
                &document.owner_user_id,
                &document.document_id,
                records,
                vectors,
            )
            .await?;

        info!(
            "ingested document {} for user {}: {chunk_count} chunks",
            document.document_id, document.owner_user_id
        );
        Ok(IngestReport {
            document_id: document.document_id.clone(),
            chunk_count,
            ingested_at: Utc::now(),
        })
    }

    /// Drop one document's chunks from its owner's index.
    pub async fn remove(&self, document_id: &str, owner_user_id: &str) -> Result<(), RagError> {
        self.store.remove_document(owner_user_id, document_id).await?;
        Ok(())
    }

    /// Drop a user's entire index, memory and disk. Invoked on account
    /// deletion.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), RagError> {
        self.store.delete_all(user_id).await
    }

    // ── Query path ──────────────────────────────────────────────────

    /// Answer a question from the user's own documents.
    pub async fn answer_chat(
        &self,
        user_id: &str,
        question: &str,
    ) -> Result<ChatAnswer, RagError> {
        let hits = self
            .retriever
            .retrieve(user_id, question, self.config.retrieval.top_k)
            .await?;

        let prompt = prompt::build_chat_prompt(question, &hits);
        let answer = self.generation.generate(&prompt).await?;

        Ok(ChatAnswer {
            answer,
            sources: source_names(&hits),
        })
    }

    /// Generate a multiple-choice quiz, optionally steered by a topic.
    pub async fn generate_quiz(
        &self,
        user_id: &str,
        topic: Option<&str>,
        count: usize,
    ) -> Result<Quiz, RagError> {
        let count = count.clamp(1, MAX_QUIZ_ITEMS);
        let topic = topic.map(str::trim).filter(|t| !t.is_empty());
        let query = topic.unwrap_or(QUIZ_DEFAULT_QUERY);

        let hits = self
            .retriever
            .retrieve(user_id, query, self.config.retrieval.task_top_k)
            .await?;

        let prompt = prompt::build_quiz_prompt(&hits, count, topic);
        let value = self.generate_json(&prompt).await?;
        Quiz::from_value(value)
    }

    /// Generate fill-in-the-blank or word-scramble puzzles.
    pub async fn generate_puzzle(
        &self,
        user_id: &str,
        kind: PuzzleKind,
        count: usize,
    ) -> Result<PuzzleArtifact, RagError> {
        let count = count.clamp(1, MAX_PUZZLE_ITEMS);
        let hits = self
            .retriever
            .retrieve(user_id, PUZZLE_QUERY, self.config.retrieval.task_top_k)
            .await?;

        let prompt = prompt::build_puzzle_prompt(&hits, kind, count);
        let value = self.generate_json(&prompt).await?;
        let (puzzles, note) = crate::artifacts::PuzzleSet::from_value(kind, value)?;
        Ok(PuzzleArtifact { puzzles, note })
    }

    /// Generate short-answer, true/false, or flashcard questions.
    pub async fn generate_questions(
        &self,
        user_id: &str,
        kind: QuestionKind,
        count: usize,
    ) -> Result<QuestionBank, RagError> {
        let count = count.clamp(1, MAX_QUESTION_ITEMS);
        let hits = self
            .retriever
            .retrieve(user_id, QUESTIONS_QUERY, self.config.retrieval.task_top_k)
            .await?;

        let prompt = prompt::build_questions_prompt(&hits, kind, count);
        let value = self.generate_json(&prompt).await?;
        let (questions, note) = crate::artifacts::QuestionSet::from_value(kind, value)?;
        Ok(QuestionBank { questions, note })
    }

    /// Number of chunks currently indexed for a user.
    pub async fn chunk_count(&self, user_id: &str) -> usize {
        self.store.chunk_count(user_id).await
    }

    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value, RagError> {
        let raw = self.generation.generate(prompt).await?;
        extract_json(&raw).ok_or_else(|| {
            warn!("model output carried no parseable JSON object");
            RagError::MalformedOutput("no JSON object found in model output".to_string())
        })
    }
}

fn source_names(hits: &[SearchHit]) -> Vec<String> {
    let mut sources: Vec<String> = hits.iter().map(|h| h.chunk.source_name.clone()).collect();
    sources.sort();
    sources.dedup();
    sources
}
