mod chunker;
mod embedding;
mod pipeline;
mod rate_limit;
mod rerank;
mod search;
mod vector_store;

pub use chunker::TextChunker;
pub use embedding::{EmbeddingClient, EmbeddingProvider, HttpEmbeddingProvider};
pub use pipeline::VectorizationPipeline;
pub use rate_limit::{RateLimiter, RatePermit};
pub use rerank::{HttpRerankProvider, RerankClient, RerankProvider, RerankedScore, fuse};
pub use search::{SearchEngine, cosine_similarity, rank};
pub use vector_store::{MemoryVectorStore, VectorStore};
