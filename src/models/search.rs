//! Search-related models for queries and results.

use serde::{Deserialize, Serialize};

use super::document::DocumentChunk;

/// User's search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Natural language query text
    pub query: String,

    /// Minimum cosine similarity for a candidate to survive, in [-1, 1]
    pub threshold: f32,

    /// Whether to re-score the top candidates with the rerank provider
    pub rerank: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            threshold: 0.0,
            rerank: false,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_rerank(mut self, rerank: bool) -> Self {
        self.rerank = rerank;
        self
    }
}

/// A single scored candidate. Produced transiently per query; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,

    /// Cosine similarity against the query vector, in [-1, 1]
    pub similarity: f32,

    /// Cross-encoder score when reranking ran and covered this candidate
    pub rerank_score: Option<f32>,
}

impl SearchResult {
    pub fn new(chunk: DocumentChunk, similarity: f32) -> Self {
        Self {
            chunk,
            similarity,
            rerank_score: None,
        }
    }
}
