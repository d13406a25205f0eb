//! Cross-encoder reranking of top vector-search candidates.
//!
//! A rerank failure is never surfaced to the querying user: the client logs
//! it and falls back to the vector-similarity ordering.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RerankError;
use crate::models::{RerankConfig, SearchResult};
use crate::services::rate_limit::RateLimiter;

/// A relevance score the provider assigned to one input document, addressed
/// by its position in the request.
#[derive(Debug, Clone, Copy)]
pub struct RerankedScore {
    pub index: usize,
    pub score: f32,
}

/// One round trip to a rerank backend. Scores come back unordered and are
/// not guaranteed to cover every input index.
#[async_trait]
pub trait RerankProvider: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
    ) -> Result<Vec<RerankedScore>, RerankError>;
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankEntry>,
}

#[derive(Debug, Deserialize)]
struct RerankEntry {
    index: usize,
    relevance_score: f32,
}

/// HTTP rerank provider.
#[derive(Debug, Clone)]
pub struct HttpRerankProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl HttpRerankProvider {
    pub fn new(config: &RerankConfig) -> Result<Self, RerankError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RerankError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl RerankProvider for HttpRerankProvider {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
    ) -> Result<Vec<RerankedScore>, RerankError> {
        let url = format!("{}/rerank", self.base_url);
        let request = RerankRequest {
            model: &self.model,
            query,
            documents,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RerankError::Timeout
                } else if e.is_connect() {
                    RerankError::Connection(e.to_string())
                } else {
                    RerankError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RerankError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| RerankError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|entry| RerankedScore {
                index: entry.index,
                score: entry.relevance_score,
            })
            .collect())
    }
}

/// Re-scores the top vector-search candidates, falling back to the original
/// ordering when the provider fails.
#[derive(Clone)]
pub struct RerankClient {
    provider: Arc<dyn RerankProvider>,
    limiter: Arc<RateLimiter>,
    call_timeout: Duration,
}

impl RerankClient {
    pub fn new(
        provider: Arc<dyn RerankProvider>,
        limiter: Arc<RateLimiter>,
        config: &RerankConfig,
    ) -> Self {
        Self {
            provider,
            limiter,
            call_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Re-score `results` against `query` and return the top `final_top_n`
    /// by rerank score. On provider failure the vector-similarity order is
    /// returned instead, truncated to the same length.
    pub async fn rerank_results(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        final_top_n: usize,
    ) -> Vec<SearchResult> {
        if results.is_empty() {
            return results;
        }

        let documents: Vec<String> = results.iter().map(|r| r.chunk.content.clone()).collect();

        let outcome = {
            let _permit = self.limiter.acquire().await;
            match tokio::time::timeout(self.call_timeout, self.provider.rerank(query, &documents))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(RerankError::Timeout),
            }
        };

        match outcome {
            Ok(scores) => fuse(results, &scores, final_top_n),
            Err(err) => {
                warn!("rerank failed, falling back to vector ranking: {err}");
                let mut results = results;
                results.truncate(final_top_n);
                results
            }
        }
    }
}

/// Map provider scores back onto the candidates by input index and re-sort.
/// Candidates the provider skipped get `NEG_INFINITY` so they sort last;
/// the sort is stable, so the unscored tail keeps its similarity order.
pub fn fuse(
    mut results: Vec<SearchResult>,
    scores: &[RerankedScore],
    final_top_n: usize,
) -> Vec<SearchResult> {
    for score in scores {
        if let Some(result) = results.get_mut(score.index) {
            result.rerank_score = Some(score.score);
        }
    }

    results.sort_by(|a, b| {
        let sa = a.rerank_score.unwrap_or(f32::NEG_INFINITY);
        let sb = b.rerank_score.unwrap_or(f32::NEG_INFINITY);
        sb.partial_cmp(&sa).unwrap_or(Ordering::Equal)
    });
    results.truncate(final_top_n);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentChunk};

    fn result(idx: u32, similarity: f32) -> SearchResult {
        let doc = Document::new("note.md", "text");
        let chunk = DocumentChunk::from_document(&doc, format!("chunk {idx}"), idx);
        SearchResult::new(chunk, similarity)
    }

    #[test]
    fn fuse_reorders_by_rerank_score() {
        let results = vec![result(0, 0.9), result(1, 0.8), result(2, 0.7)];
        let scores = [
            RerankedScore { index: 0, score: 0.1 },
            RerankedScore { index: 1, score: 0.9 },
            RerankedScore { index: 2, score: 0.5 },
        ];
        let fused = fuse(results, &scores, 3);
        assert_eq!(fused[0].chunk.chunk_index, 1);
        assert_eq!(fused[1].chunk.chunk_index, 2);
        assert_eq!(fused[2].chunk.chunk_index, 0);
    }

    #[test]
    fn fuse_missing_scores_sort_last_in_similarity_order() {
        let results = vec![result(0, 0.9), result(1, 0.8), result(2, 0.7)];
        // Only the worst vector match gets a rerank score
        let scores = [RerankedScore { index: 2, score: 0.4 }];
        let fused = fuse(results, &scores, 3);
        assert_eq!(fused[0].chunk.chunk_index, 2);
        assert_eq!(fused[0].rerank_score, Some(0.4));
        // Unscored candidates trail, preserving their vector order
        assert_eq!(fused[1].chunk.chunk_index, 0);
        assert!(fused[1].rerank_score.is_none());
        assert_eq!(fused[2].chunk.chunk_index, 1);
    }

    #[test]
    fn fuse_truncates_to_final_top_n() {
        let results = vec![result(0, 0.9), result(1, 0.8), result(2, 0.7)];
        let scores = [
            RerankedScore { index: 1, score: 0.9 },
            RerankedScore { index: 0, score: 0.8 },
        ];
        let fused = fuse(results, &scores, 2);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].chunk.chunk_index, 1);
        assert_eq!(fused[1].chunk.chunk_index, 0);
    }

    #[test]
    fn fuse_ignores_out_of_range_indices() {
        let results = vec![result(0, 0.9)];
        let scores = [RerankedScore { index: 7, score: 0.9 }];
        let fused = fuse(results, &scores, 1);
        assert_eq!(fused.len(), 1);
        assert!(fused[0].rerank_score.is_none());
    }

    struct AlwaysFailing;

    #[async_trait]
    impl RerankProvider for AlwaysFailing {
        async fn rerank(
            &self,
            _query: &str,
            _documents: &[String],
        ) -> Result<Vec<RerankedScore>, RerankError> {
            Err(RerankError::Connection("refused".to_string()))
        }
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_vector_order() {
        let limiter = Arc::new(RateLimiter::new(&crate::models::RateLimitConfig {
            max_concurrent_requests: 1,
            min_interval_ms: 0,
        }));
        let client = RerankClient::new(Arc::new(AlwaysFailing), limiter, &RerankConfig::default());

        let results = vec![result(0, 0.9), result(1, 0.8), result(2, 0.7)];
        let ranked = client.rerank_results("query", results, 2).await;

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].chunk.chunk_index, 0);
        assert_eq!(ranked[1].chunk.chunk_index, 1);
        assert!(ranked.iter().all(|r| r.rerank_score.is_none()));
    }
}
