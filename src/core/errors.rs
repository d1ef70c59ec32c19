use thiserror::Error;

/// Error type shared across the retrieval pipeline.
///
/// Every failure is scoped to a single request; nothing here should
/// terminate the host process.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Recovered during index load; callers get an empty index instead.
    #[error("index corrupted: {0}")]
    IndexCorrupted(String),
    #[error("generation failed: {0}")]
    GenerationFailed(String),
    /// Model output that could not be parsed into the requested shape.
    /// Retryable from the caller's point of view.
    #[error("malformed model output: {0}")]
    MalformedOutput(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }
}
