//! Retrieval pipeline: chunking, per-user vector indexes, and
//! user-scoped semantic search.

pub mod chunker;
pub mod index;
pub mod retriever;
pub mod store;

pub use chunker::{split_text, ChunkSpan};
pub use index::{ChunkRecord, SearchHit};
pub use retriever::Retriever;
pub use store::IndexStore;
