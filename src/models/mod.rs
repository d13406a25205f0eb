mod config;
mod document;
mod search;
mod task;

pub use config::{
    ChunkingConfig, Config, EmbeddingConfig, RateLimitConfig, RerankConfig, SearchConfig,
};
pub use document::{Document, DocumentChunk};
pub use search::{SearchQuery, SearchResult};
pub use task::{ProcessingProgress, ProcessingTask, TaskState};
