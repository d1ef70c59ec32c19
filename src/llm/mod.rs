pub mod client;
pub mod gemini;
pub mod hash_embedder;
pub mod openai_compat;
pub mod provider;
pub mod types;


pub use client::GenerationClient;
pub use gemini::GeminiChat;
pub use hash_embedder::HashEmbedder;
pub use openai_compat::{OpenAiCompatChat, OpenAiCompatEmbedder};
pub use provider::{ChatBackend, EmbeddingBackend};
pub use types::ChatMessage;
