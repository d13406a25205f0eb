//! Embedding client: batches chunk texts and calls the provider through the
//! rate limiter.
//!
//! The client deliberately performs no retry of its own. Errors propagate
//! unmodified so the pipeline, which knows the document and batch at hand,
//! can decide whether to back off and try again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::services::rate_limit::RateLimiter;

/// Outbound embedding request, OpenAI-compatible.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// One round trip to an embedding backend. Implemented over HTTP in
/// production; tests substitute stubs.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. Output length and order match the input.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// HTTP embedding provider speaking the OpenAI embeddings wire format.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    client: Client,
    base_url: String,
    model: String,
    encoding_format: String,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            encoding_format: config.encoding_format.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
            encoding_format: &self.encoding_format,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else if e.is_connect() {
                    EmbeddingError::Connection(e.to_string())
                } else {
                    EmbeddingError::Request(e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Batches texts, serializes provider calls through the rate limiter, and
/// bounds each call with a timeout.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    limiter: Arc<RateLimiter>,
    batch_size: usize,
    call_timeout: Duration,
}

impl EmbeddingClient {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        limiter: Arc<RateLimiter>,
        config: &EmbeddingConfig,
    ) -> Self {
        Self {
            provider,
            limiter,
            batch_size: config.batch_size.max(1),
            call_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed texts in input order. Inputs beyond `batch_size` are split into
    /// multiple provider calls, each individually rate limited.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embeddings = self.embed_batch(batch).await?;
            all_embeddings.extend(embeddings);
        }
        Ok(all_embeddings)
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    /// One rate-limited, timeout-bounded provider call. The permit is held
    /// for the whole call and released on every exit path.
    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let _permit = self.limiter.acquire().await;
        match tokio::time::timeout(self.call_timeout, self.provider.embed(batch)).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::Timeout),
        }
    }
}
