//! Typed shapes for generated study artifacts.
//!
//! Model output is dynamic JSON; each shape is decoded and checked
//! explicitly after parsing, and anything missing a required field is
//! rejected as `MalformedOutput` rather than passed through.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::RagError;

/// Requested puzzle flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleKind {
    FillBlank,
    WordScramble,
}

impl PuzzleKind {
    pub fn from_requested(requested: &str) -> Result<Self, RagError> {
        match requested.trim().to_ascii_lowercase().as_str() {
            "fill_blank" | "fill-blank" | "fillblank" => Ok(PuzzleKind::FillBlank),
            "word_scramble" | "word-scramble" | "scramble" => Ok(PuzzleKind::WordScramble),
            other => Err(RagError::UnsupportedFormat(format!("puzzle type {other}"))),
        }
    }
}

/// Requested question-bank flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    ShortAnswer,
    TrueFalse,
    Flashcard,
}

impl QuestionKind {
    pub fn from_requested(requested: &str) -> Result<Self, RagError> {
        match requested.trim().to_ascii_lowercase().as_str() {
            "short_answer" | "short-answer" => Ok(QuestionKind::ShortAnswer),
            "true_false" | "true-false" => Ok(QuestionKind::TrueFalse),
            "flashcard" | "flashcards" => Ok(QuestionKind::Flashcard),
            other => Err(RagError::UnsupportedFormat(format!("question type {other}"))),
        }
    }
}

// ── Quiz ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizItem {
    pub id: String,
    pub question: String,
    /// Option key → option text.
    pub options: BTreeMap<String, String>,
    /// Key of the correct option.
    pub answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub items: Vec<QuizItem>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Quiz {
    pub fn from_value(value: Value) -> Result<Self, RagError> {
        let quiz: Quiz = serde_json::from_value(value)
            .map_err(|e| RagError::MalformedOutput(format!("quiz: {e}")))?;
        for item in &quiz.items {
            if item.options.len() < 2 {
                return Err(RagError::MalformedOutput(format!(
                    "quiz item {} has fewer than two options",
                    item.id
                )));
            }
            if !item.options.contains_key(&item.answer) {
                return Err(RagError::MalformedOutput(format!(
                    "quiz item {} answer key '{}' not among its options",
                    item.id, item.answer
                )));
            }
        }
        Ok(quiz)
    }
}

// ── Puzzles ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillBlankItem {
    pub id: String,
    /// Sentence with the hidden term replaced by a blank marker.
    pub sentence: String,
    pub answer: String,
    pub hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordScrambleItem {
    pub id: String,
    pub word: String,
    pub hint: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum PuzzleSet {
    FillBlank(Vec<FillBlankItem>),
    WordScramble(Vec<WordScrambleItem>),
}

impl PuzzleSet {
    pub fn from_value(kind: PuzzleKind, value: Value) -> Result<(Self, Option<String>), RagError> {
        let note = extract_note(&value);
        let items = value
            .get("items")
            .cloned()
            .ok_or_else(|| RagError::MalformedOutput("puzzle: missing items".to_string()))?;

        let set = match kind {
            PuzzleKind::FillBlank => {
                let items: Vec<FillBlankItem> = serde_json::from_value(items)
                    .map_err(|e| RagError::MalformedOutput(format!("puzzle: {e}")))?;
                for item in &items {
                    if !item.sentence.contains("___") {
                        return Err(RagError::MalformedOutput(format!(
                            "puzzle item {} has no blank marker",
                            item.id
                        )));
                    }
                }
                PuzzleSet::FillBlank(items)
            }
            PuzzleKind::WordScramble => {
                let items: Vec<WordScrambleItem> = serde_json::from_value(items)
                    .map_err(|e| RagError::MalformedOutput(format!("puzzle: {e}")))?;
                for item in &items {
                    if item.word.trim().is_empty() {
                        return Err(RagError::MalformedOutput(format!(
                            "puzzle item {} has an empty word",
                            item.id
                        )));
                    }
                }
                PuzzleSet::WordScramble(items)
            }
        };
        Ok((set, note))
    }

    pub fn len(&self) -> usize {
        match self {
            PuzzleSet::FillBlank(items) => items.len(),
            PuzzleSet::WordScramble(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Question bank ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortAnswerItem {
    pub id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrueFalseItem {
    pub id: String,
    pub statement: String,
    pub answer: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardItem {
    pub id: String,
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum QuestionSet {
    ShortAnswer(Vec<ShortAnswerItem>),
    TrueFalse(Vec<TrueFalseItem>),
    Flashcard(Vec<FlashcardItem>),
}

impl QuestionSet {
    pub fn from_value(
        kind: QuestionKind,
        value: Value,
    ) -> Result<(Self, Option<String>), RagError> {
        let note = extract_note(&value);
        let items = value
            .get("items")
            .cloned()
            .ok_or_else(|| RagError::MalformedOutput("questions: missing items".to_string()))?;

        let set = match kind {
            QuestionKind::ShortAnswer => QuestionSet::ShortAnswer(
                serde_json::from_value(items)
                    .map_err(|e| RagError::MalformedOutput(format!("questions: {e}")))?,
            ),
            QuestionKind::TrueFalse => QuestionSet::TrueFalse(
                serde_json::from_value(items)
                    .map_err(|e| RagError::MalformedOutput(format!("questions: {e}")))?,
            ),
            QuestionKind::Flashcard => QuestionSet::Flashcard(
                serde_json::from_value(items)
                    .map_err(|e| RagError::MalformedOutput(format!("questions: {e}")))?,
            ),
        };
        Ok((set, note))
    }

    pub fn len(&self) -> usize {
        match self {
            QuestionSet::ShortAnswer(items) => items.len(),
            QuestionSet::TrueFalse(items) => items.len(),
            QuestionSet::Flashcard(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Top-level artifact union ────────────────────────────────────────

/// A chat answer grounded in the user's documents.
#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    /// Source filenames of the context chunks the answer drew on.
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PuzzleArtifact {
    pub puzzles: PuzzleSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionBank {
    pub questions: QuestionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Everything the pipeline can hand back to the caller, tagged for
/// session storage or rendering. Transient; never persisted here.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Artifact {
    Chat(ChatAnswer),
    Quiz(Quiz),
    Puzzle(PuzzleArtifact),
    Questions(QuestionBank),
}

impl From<ChatAnswer> for Artifact {
    fn from(value: ChatAnswer) -> Self {
        Artifact::Chat(value)
    }
}

impl From<Quiz> for Artifact {
    fn from(value: Quiz) -> Self {
        Artifact::Quiz(value)
    }
}

impl From<PuzzleArtifact> for Artifact {
    fn from(value: PuzzleArtifact) -> Self {
        Artifact::Puzzle(value)
    }
}

impl From<QuestionBank> for Artifact {
    fn from(value: QuestionBank) -> Self {
        Artifact::Questions(value)
    }
}

fn extract_note(value: &Value) -> Option<String> {
    value
        .get("note")
        .and_then(|n| n.as_str())
        .filter(|n| !n.trim().is_empty())
        .map(|n| n.to_string())
}
