//! Error types for the vectorization and retrieval pipeline.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors produced while splitting document text into chunks.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("text produced no usable chunks")]
    Empty,
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding provider: {0}")]
    Connection(String),

    #[error("embedding provider rate limit: {0}")]
    RateLimited(String),

    #[error("embedding provider error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding request timed out")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            // 429s back off and try again; connection drops and timeouts are transient
            EmbeddingError::RateLimited(_)
            | EmbeddingError::Connection(_)
            | EmbeddingError::Timeout => true,
            // Gateway errors in front of the provider are transient too
            EmbeddingError::Provider { status, .. } => matches!(status, 502 | 503 | 504),
            EmbeddingError::Request(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to save chunks for document {document_id}: {message}")]
    Save {
        document_id: String,
        message: String,
    },

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("failed to delete document {document_id}: {message}")]
    Delete {
        document_id: String,
        message: String,
    },
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::Save { message, .. } | VectorStoreError::Delete { message, .. } => {
                let msg = message.to_lowercase();
                msg.contains("timeout") || msg.contains("connection") || msg.contains("unavailable")
            }
            VectorStoreError::NotFound(_) => false,
        }
    }
}

/// Errors related to rerank operations. Never fatal for a query: the search
/// layer falls back to vector-only ranking on any of these.
#[derive(Debug, Error)]
pub enum RerankError {
    #[error("failed to connect to rerank provider: {0}")]
    Connection(String),

    #[error("rerank provider error (status {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("rerank request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid rerank response: {0}")]
    InvalidResponse(String),

    #[error("rerank request timed out")]
    Timeout,
}

/// Errors related to query-path operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    Path(String),
}

/// Pipeline-level errors that wrap the per-stage errors. A document whose
/// vectorization surfaces one of these is marked failed; the queue advances.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
