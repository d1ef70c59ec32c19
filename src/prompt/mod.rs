//! Prompt templates for the four study tasks.
//!
//! Every template concatenates the retrieved chunks with source
//! separators and states the output contract explicitly. When no
//! context was retrieved, the template instructs the model to say so
//! instead of answering from general knowledge.

use std::fmt::Write as _;

use crate::artifacts::{PuzzleKind, QuestionKind};
use crate::rag::index::SearchHit;

/// Exact sentence the chat template tells the model to use when the
/// context does not contain the answer.
pub const NO_ANSWER_SENTENCE: &str = "I don't have that in my notes.";

const EMPTY_CONTEXT_NOTE: &str =
    "No relevant material was found in the student's documents for this request.";

/// Render retrieved chunks with provenance separators.
pub fn format_context(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return EMPTY_CONTEXT_NOTE.to_string();
    }

    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n---\n\n");
        }
        let _ = write!(
            out,
            "[Source: {} | chunk {}]\n{}",
            hit.chunk.source_name, hit.chunk.seq, hit.chunk.text
        );
    }
    out
}

pub fn build_chat_prompt(question: &str, hits: &[SearchHit]) -> String {
    let context = format_context(hits);
    let empty_rule = if hits.is_empty() {
        format!(
            "- The Context below is empty, so you MUST respond exactly: \"{NO_ANSWER_SENTENCE}\"\n"
        )
    } else {
        String::new()
    };

    format!(
        "You are an expert tutor helping a student study from their own notes and documents.\n\
         \n\
         RULES:\n\
         - Answer ONLY using the Context below.\n\
         - If the answer is not in the Context, respond EXACTLY: \"{NO_ANSWER_SENTENCE}\"\n\
         - Do not use your general knowledge, even if you know the answer.\n\
         - Cite which source your answer came from.\n\
         - Use clear formatting with bullet points when appropriate.\n\
         {empty_rule}\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}

pub fn build_quiz_prompt(hits: &[SearchHit], count: usize, topic: Option<&str>) -> String {
    let context = format_context(hits);
    let topic_line = match topic {
        Some(t) if !t.trim().is_empty() => format!("Focus on the topic: {t}.\n"),
        _ => String::new(),
    };

    format!(
        "You are generating a multiple-choice quiz from a student's own study material.\n\
         \n\
         Create exactly {count} multiple-choice questions based ONLY on the Context below.\n\
         {topic_line}\
         {no_context_rule}\
         \n\
         Respond with ONLY a JSON object in exactly this shape (no prose, no markdown fences):\n\
         {{\n\
           \"items\": [\n\
             {{\n\
               \"id\": \"q1\",\n\
               \"question\": \"What does the text say about ...?\",\n\
               \"options\": {{\"a\": \"first option\", \"b\": \"second option\", \"c\": \"third option\", \"d\": \"fourth option\"}},\n\
               \"answer\": \"b\",\n\
               \"explanation\": \"Why this option is correct, citing the context.\"\n\
             }}\n\
           ],\n\
           \"note\": null\n\
         }}\n\
         \n\
         Context:\n\
         {context}",
        no_context_rule = no_context_json_rule(hits),
    )
}

pub fn build_puzzle_prompt(hits: &[SearchHit], kind: PuzzleKind, count: usize) -> String {
    let context = format_context(hits);
    let item_shape = match kind {
        PuzzleKind::FillBlank => {
            "{\n\
               \"id\": \"p1\",\n\
               \"sentence\": \"A sentence from the material with the key term replaced by _____.\",\n\
               \"answer\": \"the hidden term\",\n\
               \"hint\": \"a short hint\"\n\
             }"
        }
        PuzzleKind::WordScramble => {
            "{\n\
               \"id\": \"p1\",\n\
               \"word\": \"keyterm\",\n\
               \"hint\": \"a short hint describing the word\"\n\
             }"
        }
    };
    let task_line = match kind {
        PuzzleKind::FillBlank => format!(
            "Create exactly {count} fill-in-the-blank puzzles. Each sentence must come from the \
             Context with one key term replaced by \"_____\"."
        ),
        PuzzleKind::WordScramble => format!(
            "Pick exactly {count} important single words from the Context for a word-scramble \
             game, each with a hint."
        ),
    };

    format!(
        "You are generating word puzzles from a student's own study material.\n\
         \n\
         {task_line}\n\
         Use ONLY the Context below.\n\
         {no_context_rule}\
         \n\
         Respond with ONLY a JSON object in exactly this shape (no prose, no markdown fences):\n\
         {{\n\
           \"items\": [\n\
             {item_shape}\n\
           ],\n\
           \"note\": null\n\
         }}\n\
         \n\
         Context:\n\
         {context}",
        no_context_rule = no_context_json_rule(hits),
    )
}

pub fn build_questions_prompt(hits: &[SearchHit], kind: QuestionKind, count: usize) -> String {
    let context = format_context(hits);
    let (task_line, item_shape) = match kind {
        QuestionKind::ShortAnswer => (
            format!("Create exactly {count} short-answer study questions with model answers."),
            "{\n\
               \"id\": \"q1\",\n\
               \"question\": \"A question answerable from the context.\",\n\
               \"answer\": \"A concise model answer.\"\n\
             }",
        ),
        QuestionKind::TrueFalse => (
            format!("Create exactly {count} true/false statements about the material."),
            "{\n\
               \"id\": \"q1\",\n\
               \"statement\": \"A statement that is clearly true or false per the context.\",\n\
               \"answer\": true,\n\
               \"explanation\": \"Why, citing the context.\"\n\
             }",
        ),
        QuestionKind::Flashcard => (
            format!("Create exactly {count} flashcards covering key terms and concepts."),
            "{\n\
               \"id\": \"q1\",\n\
               \"front\": \"Term or question on the front of the card.\",\n\
               \"back\": \"Definition or answer on the back.\"\n\
             }",
        ),
    };

    format!(
        "You are building a question bank from a student's own study material.\n\
         \n\
         {task_line}\n\
         Use ONLY the Context below.\n\
         {no_context_rule}\
         \n\
         Respond with ONLY a JSON object in exactly this shape (no prose, no markdown fences):\n\
         {{\n\
           \"items\": [\n\
             {item_shape}\n\
           ],\n\
           \"note\": null\n\
         }}\n\
         \n\
         Context:\n\
         {context}",
        no_context_rule = no_context_json_rule(hits),
    )
}

fn no_context_json_rule(hits: &[SearchHit]) -> &'static str {
    if hits.is_empty() {
        "The Context below is empty: return an empty \"items\" array and set \"note\" to a short \
         sentence telling the student no relevant material was found. Do NOT invent items from \
         general knowledge.\n"
    } else {
        ""
    }
}
