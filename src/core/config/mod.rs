//! Typed application configuration.
//!
//! Loaded from a YAML file (`STUDYRAG_CONFIG_PATH` overrides the lookup
//! path). Every section carries serde defaults so a missing or partial
//! file still yields a runnable configuration. Secrets are never read
//! from the file; the cloud generation key comes from `GEMINI_API_KEY`.

use std::env;
use std::path::Path;

use serde::Deserialize;

use super::errors::RagError;

pub const CONFIG_PATH_ENV: &str = "STUDYRAG_CONFIG_PATH";
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one index directory per user.
    pub index_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_root: "./data/index".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible embedding server base URL.
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    /// Chunks per embedding request during ingestion.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            model: "nomic-embed-text-v1.5".to_string(),
            dimensions: 768,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks of context for chat answers.
    pub top_k: usize,
    /// Wider net used by quiz/puzzle/question generation.
    pub task_top_k: usize,
    /// Minimum cosine similarity for a chunk to count as context.
    pub similarity_floor: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            task_top_k: 6,
            similarity_floor: 0.25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub primary: PrimaryBackendConfig,
    pub secondary: SecondaryBackendConfig,
    /// Per-request timeout applied to each backend.
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            primary: PrimaryBackendConfig::default(),
            secondary: SecondaryBackendConfig::default(),
            timeout_secs: 60,
            max_tokens: 1024,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrimaryBackendConfig {
    /// OpenAI-compatible chat server base URL (llama.cpp, LM Studio, ...).
    pub base_url: String,
    pub model: String,
}

impl Default for PrimaryBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8088".to_string(),
            model: "local-chat".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecondaryBackendConfig {
    pub model: String,
}

impl Default for SecondaryBackendConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration, preferring `STUDYRAG_CONFIG_PATH`, then the
    /// supplied path. A missing file yields defaults; a file that exists
    /// but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, RagError> {
        let env_path = env::var(CONFIG_PATH_ENV).ok();
        let resolved = env_path
            .as_deref()
            .map(Path::new)
            .or(path);

        let config = match resolved {
            Some(p) if p.exists() => {
                let contents = std::fs::read_to_string(p)?;
                serde_yaml::from_str::<AppConfig>(&contents)
                    .map_err(|e| RagError::Config(format!("{}: {e}", p.display())))?
            }
            _ => AppConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunking.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RagError::Config(
                "chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(RagError::Config("embedding dimensions must be > 0".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(RagError::Config("embedding batch_size must be > 0".to_string()));
        }
        if self.retrieval.top_k == 0 || self.retrieval.task_top_k == 0 {
            return Err(RagError::Config("retrieval top_k must be > 0".to_string()));
        }
        if !(-1.0..=1.0).contains(&self.retrieval.similarity_floor) {
            return Err(RagError::Config(
                "similarity_floor must be within [-1, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// Cloud generation API key, if configured in the environment.
    pub fn gemini_api_key() -> Option<String> {
        env::var(GEMINI_KEY_ENV).ok().filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 4);
        assert!((config.retrieval.similarity_floor - 0.25).abs() < 1e-6);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = r#"
chunking:
  chunk_size: 500
retrieval:
  similarity_floor: 0.4
"#;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(yaml.as_bytes()).unwrap();

        let config = AppConfig::load(Some(tmp.path())).unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        // Untouched sections keep their defaults.
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.embedding.dimensions, 768);
        assert!((config.retrieval.similarity_floor - 0.4).abs() < 1e-6);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/config.yml"))).unwrap();
        assert_eq!(config.embedding.batch_size, 32);
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let mut config = AppConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn rejects_out_of_range_floor() {
        let mut config = AppConfig::default();
        config.retrieval.similarity_floor = 1.5;
        assert!(config.validate().is_err());
    }
}
