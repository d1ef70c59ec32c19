//! Multi-tenant retrieval pipeline for personal study documents.
//!
//! Uploaded files are extracted, chunked, embedded, and indexed per
//! user; queries retrieve each user's own chunks and feed them into
//! prompt templates for chat answers, quizzes, word puzzles, and
//! question banks, generated by a local LLM with a cloud fallback.

pub mod artifacts;
pub mod core;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod parse;
pub mod prompt;
pub mod rag;
pub mod service;

pub use artifacts::{
    Artifact, ChatAnswer, PuzzleArtifact, PuzzleKind, PuzzleSet, QuestionBank, QuestionKind,
    QuestionSet, Quiz,
};
pub use crate::core::config::AppConfig;
pub use crate::core::errors::RagError;
pub use extract::DocumentKind;
pub use service::{DocumentSource, IngestReport, StudyService};
