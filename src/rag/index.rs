//! Per-user in-memory vector index with a binary on-disk format.
//!
//! The index pairs a dense row-major vector table with a side mapping of
//! chunk metadata, searched by brute-force cosine similarity. Vectors are
//! serialized as `[u32 count][u32 dim]` + little-endian `f32` rows; the
//! side mapping is serialized as JSON next to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

/// Metadata for one embedded chunk, kept in insertion order parallel to
/// the vector table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub document_id: String,
    /// Position of the chunk within its document.
    pub seq: usize,
    pub text: String,
    /// Original filename of the owning document.
    pub source_name: String,
    /// Char offsets into the extracted document text.
    pub start: usize,
    pub end: usize,
}

/// One search result: a chunk and its similarity to the query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: ChunkRecord,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}

/// Side-mapping file contents (`chunks.json`).
#[derive(Debug, Serialize, Deserialize)]
pub struct SideMapping {
    pub model_id: String,
    pub dimensions: usize,
    pub saved_at: DateTime<Utc>,
    pub records: Vec<ChunkRecord>,
}

/// A single user's searchable chunk collection.
#[derive(Debug)]
pub struct UserIndex {
    dimensions: usize,
    model_id: String,
    /// Row-major, `records.len() * dimensions` entries.
    vectors: Vec<f32>,
    records: Vec<ChunkRecord>,
}

impl UserIndex {
    pub fn new(dimensions: usize, model_id: &str) -> Self {
        Self {
            dimensions,
            model_id: model_id.to_string(),
            vectors: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn contains_document(&self, document_id: &str) -> bool {
        self.records.iter().any(|r| r.document_id == document_id)
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimensions..(i + 1) * self.dimensions]
    }

    /// Append chunks with their vectors. Append-only; rows are never
    /// mutated in place.
    pub fn add(
        &mut self,
        records: Vec<ChunkRecord>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), RagError> {
        if records.len() != vectors.len() {
            return Err(RagError::Internal(format!(
                "{} chunks but {} vectors",
                records.len(),
                vectors.len()
            )));
        }
        for vector in &vectors {
            if vector.len() != self.dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: vector.len(),
                });
            }
        }

        for (record, vector) in records.into_iter().zip(vectors) {
            self.vectors.extend_from_slice(&vector);
            self.records.push(record);
        }
        Ok(())
    }

    /// Drop every chunk belonging to `document_id`, rebuilding the vector
    /// table from the survivors. Returns the number of chunks removed.
    pub fn remove_document(&mut self, document_id: &str) -> usize {
        let keep: Vec<usize> = (0..self.records.len())
            .filter(|&i| self.records[i].document_id != document_id)
            .collect();
        let removed = self.records.len() - keep.len();
        if removed == 0 {
            return 0;
        }

        let mut vectors = Vec::with_capacity(keep.len() * self.dimensions);
        let mut records = Vec::with_capacity(keep.len());
        for i in keep {
            vectors.extend_from_slice(self.row(i));
            records.push(self.records[i].clone());
        }
        self.vectors = vectors;
        self.records = records;
        removed
    }

    /// Return up to `k` chunks most similar to `query`, highest first.
    /// Ties are broken by original chunk sequence (earlier chunk wins).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, RagError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = (0..self.records.len())
            .map(|i| (i, cosine_similarity(query, self.row(i))))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.records[a.0].seq.cmp(&self.records[b.0].seq))
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchHit {
                chunk: self.records[i].clone(),
                score,
            })
            .collect())
    }

    // ── Persistence ─────────────────────────────────────────────────

    pub fn encode_vectors(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.vectors.len() * 4);
        out.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.dimensions as u32).to_le_bytes());
        for value in &self.vectors {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    pub fn to_mapping(&self) -> SideMapping {
        SideMapping {
            model_id: self.model_id.clone(),
            dimensions: self.dimensions,
            saved_at: Utc::now(),
            records: self.records.clone(),
        }
    }

    /// Rebuild an index from its two persisted files, cross-checking the
    /// vector table against the side mapping.
    pub fn from_parts(vector_bytes: &[u8], mapping: SideMapping) -> Result<Self, RagError> {
        if vector_bytes.len() < 8 {
            return Err(RagError::IndexCorrupted(
                "vector file shorter than header".to_string(),
            ));
        }
        let count = u32::from_le_bytes([
            vector_bytes[0],
            vector_bytes[1],
            vector_bytes[2],
            vector_bytes[3],
        ]) as usize;
        let dimensions = u32::from_le_bytes([
            vector_bytes[4],
            vector_bytes[5],
            vector_bytes[6],
            vector_bytes[7],
        ]) as usize;

        let expected_len = 8 + count * dimensions * 4;
        if vector_bytes.len() != expected_len {
            return Err(RagError::IndexCorrupted(format!(
                "vector file is {} bytes, expected {expected_len}",
                vector_bytes.len()
            )));
        }
        if count != mapping.records.len() {
            return Err(RagError::IndexCorrupted(format!(
                "{count} vector rows but {} mapping records",
                mapping.records.len()
            )));
        }
        if dimensions != mapping.dimensions {
            return Err(RagError::IndexCorrupted(format!(
                "vector dim {dimensions} disagrees with mapping dim {}",
                mapping.dimensions
            )));
        }

        let vectors = vector_bytes[8..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self {
            dimensions,
            model_id: mapping.model_id,
            vectors,
            records: mapping.records,
        })
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}
