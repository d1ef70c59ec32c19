//! Process-wide registry of per-user vector indexes.
//!
//! One index directory per user under the configured root, holding the
//! vector table (`vectors.bin`) and the side mapping (`chunks.json`).
//! Files are written to a temporary sibling and renamed into place so a
//! crash mid-write never corrupts an existing index; the loader
//! cross-checks both files and falls back to an empty index on any
//! inconsistency.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::errors::RagError;

use super::index::{ChunkRecord, SearchHit, SideMapping, UserIndex};

const VECTORS_FILE: &str = "vectors.bin";
const MAPPING_FILE: &str = "chunks.json";

/// Live handle to one user's index. Writers (`add`/`remove`/`persist`)
/// take the write lock; searches share the read lock.
pub struct UserIndexHandle {
    user_id: String,
    pub(crate) index: RwLock<UserIndex>,
}

pub struct IndexStore {
    root: PathBuf,
    dimensions: usize,
    model_id: String,
    /// Locked only for handle creation and eviction, never for index
    /// content access.
    handles: Mutex<HashMap<String, Arc<UserIndexHandle>>>,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>, dimensions: usize, model_id: &str) -> Self {
        Self {
            root: root.into(),
            dimensions,
            model_id: model_id.to_string(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.root.join(user_id)
    }

    /// Fetch the live handle for a user, loading the persisted index if
    /// one exists, otherwise starting empty. Exactly one handle exists
    /// per user per process.
    pub async fn get_or_create(&self, user_id: &str) -> Arc<UserIndexHandle> {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get(user_id) {
            return Arc::clone(handle);
        }

        let index = match self.load_from_disk(user_id).await {
            Ok(Some(index)) => {
                info!("loaded index for user {user_id}: {} chunks", index.len());
                index
            }
            Ok(None) => UserIndex::new(self.dimensions, &self.model_id),
            Err(e) => {
                // Recovered, never fatal: the user starts over with an
                // empty index rather than a failed request.
                warn!("index for user {user_id} unreadable ({e}), starting empty");
                UserIndex::new(self.dimensions, &self.model_id)
            }
        };

        let handle = Arc::new(UserIndexHandle {
            user_id: user_id.to_string(),
            index: RwLock::new(index),
        });
        handles.insert(user_id.to_string(), Arc::clone(&handle));
        handle
    }

    /// Insert a document's chunks, replacing any chunks already indexed
    /// for the same document id (re-ingesting is a replace, not a
    /// duplicate). Persists before returning.
    pub async fn replace_document(
        &self,
        user_id: &str,
        document_id: &str,
        records: Vec<ChunkRecord>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<usize, RagError> {
        let handle = self.get_or_create(user_id).await;
        let mut index = handle.index.write().await;

        let replaced = index.remove_document(document_id);
        if replaced > 0 {
            debug!("replacing {replaced} existing chunks of document {document_id}");
        }
        let added = records.len();
        index.add(records, vectors)?;
        self.write_to_disk(&handle.user_id, &index).await?;
        Ok(added)
    }

    /// User-scoped nearest-neighbor search. A user with no index gets an
    /// empty result, not an error.
    pub async fn search(
        &self,
        user_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        let handle = self.get_or_create(user_id).await;
        let index = handle.index.read().await;
        index.search(query, k)
    }

    /// Remove one document's chunks and persist the rebuilt index.
    pub async fn remove_document(
        &self,
        user_id: &str,
        document_id: &str,
    ) -> Result<usize, RagError> {
        let handle = self.get_or_create(user_id).await;
        let mut index = handle.index.write().await;

        let removed = index.remove_document(document_id);
        if removed > 0 {
            self.write_to_disk(&handle.user_id, &index).await?;
            info!("removed {removed} chunks of document {document_id} for user {user_id}");
        }
        Ok(removed)
    }

    /// Drop a user's in-memory handle and persisted files. Invoked on
    /// account deletion.
    pub async fn delete_all(&self, user_id: &str) -> Result<(), RagError> {
        self.handles.lock().await.remove(user_id);

        let dir = self.user_dir(user_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("deleted index directory for user {user_id}");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of chunks currently indexed for a user.
    pub async fn chunk_count(&self, user_id: &str) -> usize {
        let handle = self.get_or_create(user_id).await;
        let index = handle.index.read().await;
        index.len()
    }

    // ── Disk layout ─────────────────────────────────────────────────

    async fn load_from_disk(&self, user_id: &str) -> Result<Option<UserIndex>, RagError> {
        let dir = self.user_dir(user_id);
        let vectors_path = dir.join(VECTORS_FILE);
        let mapping_path = dir.join(MAPPING_FILE);

        match (vectors_path.exists(), mapping_path.exists()) {
            (false, false) => return Ok(None),
            (true, true) => {}
            _ => {
                return Err(RagError::IndexCorrupted(format!(
                    "partial index files in {}",
                    dir.display()
                )))
            }
        }

        let vector_bytes = tokio::fs::read(&vectors_path).await?;
        let mapping_json = tokio::fs::read_to_string(&mapping_path).await?;
        let mapping: SideMapping = serde_json::from_str(&mapping_json)
            .map_err(|e| RagError::IndexCorrupted(format!("side mapping: {e}")))?;

        if mapping.model_id != self.model_id {
            warn!(
                "index for user {user_id} was built with model '{}', configured model is '{}'",
                mapping.model_id, self.model_id
            );
        }

        UserIndex::from_parts(&vector_bytes, mapping).map(Some)
    }

    async fn write_to_disk(&self, user_id: &str, index: &UserIndex) -> Result<(), RagError> {
        let dir = self.user_dir(user_id);
        tokio::fs::create_dir_all(&dir).await?;

        write_atomic(&dir.join(VECTORS_FILE), &index.encode_vectors()).await?;
        let mapping_json = serde_json::to_vec(&index.to_mapping()).map_err(RagError::internal)?;
        write_atomic(&dir.join(MAPPING_FILE), &mapping_json).await?;

        debug!("persisted {} chunks for user {user_id}", index.len());
        Ok(())
    }
}

/// Write to a temporary sibling, then rename over the target. Concurrent
/// readers see either the old file or the new one, never a partial write.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RagError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RagError::internal(format!("bad path {}", path.display())))?;
    let tmp = path.with_file_name(format!("{file_name}.tmp-{}", Uuid::new_v4()));

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
