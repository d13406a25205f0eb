//! Similarity ranking and the query path.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::error::SearchError;
use crate::models::{DocumentChunk, RerankConfig, SearchConfig, SearchQuery, SearchResult};
use crate::services::embedding::EmbeddingClient;
use crate::services::rerank::RerankClient;
use crate::services::vector_store::VectorStore;

/// Cosine similarity between two vectors, in [-1, 1]. Zero when either norm
/// is zero or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Score candidates against the query vector, drop the ones below
/// `threshold` or without an embedding, and return the top `limit` sorted by
/// similarity descending.
pub fn rank(
    query_embedding: &[f32],
    candidates: Vec<DocumentChunk>,
    threshold: f32,
    limit: usize,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter(|chunk| chunk.has_embedding())
        .map(|chunk| {
            let similarity = cosine_similarity(query_embedding, &chunk.embedding);
            SearchResult::new(chunk, similarity)
        })
        .filter(|r| r.similarity >= threshold)
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
    results.truncate(limit);
    results
}

/// The query path: embed the query, rank stored chunks, optionally rerank
/// the widened candidate pool.
#[derive(Clone)]
pub struct SearchEngine {
    embedding: EmbeddingClient,
    store: Arc<dyn VectorStore>,
    reranker: Option<RerankClient>,
    search_config: SearchConfig,
    rerank_config: RerankConfig,
}

impl SearchEngine {
    pub fn new(
        embedding: EmbeddingClient,
        store: Arc<dyn VectorStore>,
        reranker: Option<RerankClient>,
        search_config: SearchConfig,
        rerank_config: RerankConfig,
    ) -> Self {
        Self {
            embedding,
            store,
            reranker,
            search_config,
            rerank_config,
        }
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SearchError> {
        if query.query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("empty query".to_string()));
        }

        let query_embedding = self.embedding.embed_query(&query.query).await?;
        let candidates = self.store.load_all().await?;
        debug!(candidates = candidates.len(), "scoring candidate chunks");

        let rerank_active = query.rerank && self.reranker.is_some();
        let final_top_n = self.search_config.final_top_n;
        // The reranker needs a wider pool than the final cut to pick from
        let pool = if rerank_active {
            self.rerank_config.initial_candidates.max(final_top_n)
        } else {
            final_top_n
        };

        let results = rank(&query_embedding, candidates, query.threshold, pool);

        if rerank_active && let Some(reranker) = &self.reranker {
            return Ok(reranker
                .rerank_results(&query.query, results, final_top_n)
                .await);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    #[test]
    fn similarity_of_identical_vectors_is_one() {
        let v = vec![0.5, -1.0, 2.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_of_opposite_vectors_is_minus_one() {
        let v = vec![0.5, -1.0, 2.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!((cosine_similarity(&v, &neg) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_with_zero_vector_is_zero() {
        let v = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &v), 0.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-2.0, 0.5, 4.0];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn length_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    fn chunk_with_embedding(idx: u32, embedding: Vec<f32>) -> DocumentChunk {
        let doc = Document::new("note.md", "text");
        let mut chunk = DocumentChunk::from_document(&doc, format!("chunk {idx}"), idx);
        chunk.embedding = embedding;
        chunk
    }

    #[test]
    fn rank_sorts_descending_and_filters() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            chunk_with_embedding(0, vec![0.0, 1.0]),  // orthogonal, sim 0
            chunk_with_embedding(1, vec![1.0, 0.0]),  // identical, sim 1
            chunk_with_embedding(2, vec![1.0, 1.0]),  // sim ~0.707
            chunk_with_embedding(3, vec![-1.0, 0.0]), // opposite, sim -1
            chunk_with_embedding(4, vec![]),          // no embedding, skipped
        ];
        let results = rank(&query, candidates, 0.0, 10);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.chunk_index, 1);
        assert_eq!(results[1].chunk.chunk_index, 2);
        assert_eq!(results[2].chunk.chunk_index, 0);
    }

    #[test]
    fn rank_applies_threshold_and_limit() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            chunk_with_embedding(0, vec![1.0, 0.0]),
            chunk_with_embedding(1, vec![1.0, 0.2]),
            chunk_with_embedding(2, vec![0.0, 1.0]),
        ];
        let results = rank(&query, candidates, 0.5, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_index, 0);
    }
}
