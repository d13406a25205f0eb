//! Document vectorization and retrieval pipeline.
//!
//! Turns extracted note text into overlapping semantic chunks, generates
//! embeddings through a rate-limited provider, stores chunk+vector records,
//! and serves cosine-similarity search with optional cross-encoder
//! reranking.

pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{
    ChunkError, ConfigError, EmbeddingError, PipelineError, RerankError, SearchError,
    VectorStoreError,
};
pub use models::{
    Config, Document, DocumentChunk, ProcessingProgress, ProcessingTask, SearchQuery, SearchResult,
    TaskState,
};
pub use services::{
    EmbeddingClient, EmbeddingProvider, MemoryVectorStore, RateLimiter, RerankClient,
    RerankProvider, SearchEngine, TextChunker, VectorStore, VectorizationPipeline,
};
