//! End-to-end tests over the whole pipeline with stub providers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use notevec::error::{EmbeddingError, RerankError};
use notevec::models::{
    ChunkingConfig, EmbeddingConfig, RateLimitConfig, RerankConfig, SearchConfig,
};
use notevec::services::{RerankedScore, rank};
use notevec::utils::RetryConfig;
use notevec::{
    Document, EmbeddingClient, EmbeddingProvider, MemoryVectorStore, RateLimiter, RerankClient,
    RerankProvider, SearchEngine, SearchQuery, TaskState, TextChunker, VectorStore,
    VectorizationPipeline,
};

/// Deterministic embedding derived from text bytes, so identical texts get
/// identical vectors and query-to-chunk matching is exact.
fn stub_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 8];
    for (i, b) in text.bytes().enumerate() {
        v[i % 8] += f32::from(b) / 255.0;
    }
    v
}

struct StubEmbedder {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubEmbedder {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| stub_vector(t)).collect())
    }
}

struct FailingReranker;

#[async_trait]
impl RerankProvider for FailingReranker {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[String],
    ) -> Result<Vec<RerankedScore>, RerankError> {
        Err(RerankError::Provider {
            status: 500,
            body: "boom".to_string(),
        })
    }
}

fn build_pipeline(
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<MemoryVectorStore>,
) -> VectorizationPipeline {
    let limiter = Arc::new(RateLimiter::new(&RateLimitConfig {
        max_concurrent_requests: 1,
        min_interval_ms: 0,
    }));
    let embedding = EmbeddingClient::new(provider, limiter, &EmbeddingConfig::default());
    let chunker = TextChunker::new(&ChunkingConfig {
        max_chunk_size: 200,
        overlap_size: 40,
    });
    VectorizationPipeline::new(
        chunker,
        embedding,
        store as Arc<dyn VectorStore>,
        RetryConfig::new(2).with_initial_delay(Duration::from_millis(5)),
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn concurrent_submissions_process_one_at_a_time() {
    init_tracing();
    let store = Arc::new(MemoryVectorStore::new());
    let pipeline = Arc::new(build_pipeline(Arc::new(StubEmbedder::new()), store));

    let docs = vec![
        Document::new("alpha.md", "First note with enough text to chunk and embed."),
        Document::new("beta.md", "   \n   "), // soft failure: no chunks
        Document::new("gamma.md", "Third note, also perfectly embeddable content."),
    ];
    for doc in docs {
        assert!(pipeline.enqueue(doc).await);
    }

    // Three workers race to drain the queue while a sampler watches for
    // overlapping processing.
    let mut workers = Vec::new();
    for _ in 0..3 {
        let pipeline = Arc::clone(&pipeline);
        workers.push(tokio::spawn(async move {
            pipeline.run_until_idle().await;
        }));
    }

    let sampler = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            let mut max_processing = 0usize;
            loop {
                let tasks = pipeline.tasks().await;
                let processing = tasks
                    .iter()
                    .filter(|t| t.state == TaskState::Processing)
                    .count();
                max_processing = max_processing.max(processing);
                if tasks.len() == 3 && tasks.iter().all(|t| t.is_terminal()) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            max_processing
        })
    };

    for worker in workers {
        worker.await.unwrap();
    }
    let max_processing = sampler.await.unwrap();
    assert!(max_processing <= 1, "documents processed concurrently");

    let progress = pipeline.progress().await;
    assert_eq!(progress.processed + progress.failed, 3);
    assert_eq!(progress.processed, 2);
    assert_eq!(progress.failed, 1);

    let tasks = pipeline.tasks().await;
    assert!(tasks.iter().all(|t| t.is_terminal()));
}

#[tokio::test]
async fn provider_calls_never_overlap_across_documents() {
    let provider = Arc::new(StubEmbedder::new());
    let store = Arc::new(MemoryVectorStore::new());
    let pipeline = build_pipeline(provider.clone(), store);

    for i in 0..3 {
        let body = format!("Note number {i} with some body text. ").repeat(20);
        pipeline.enqueue(Document::new(format!("n{i}.md"), body)).await;
    }
    pipeline.run_until_idle().await;

    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rerank_outage_matches_vector_only_ordering() {
    let store = Arc::new(MemoryVectorStore::new());
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(StubEmbedder::new());
    let pipeline = build_pipeline(provider.clone(), store.clone());

    pipeline
        .enqueue(Document::new("a.md", "Apples grow on trees in the orchard."))
        .await;
    pipeline
        .enqueue(Document::new("b.md", "Bananas are yellow and sweet to eat."))
        .await;
    pipeline
        .enqueue(Document::new("c.md", "Compilers turn source code into machine code."))
        .await;
    pipeline.run_until_idle().await;

    let limiter = Arc::new(RateLimiter::new(&RateLimitConfig {
        max_concurrent_requests: 1,
        min_interval_ms: 0,
    }));
    let embedding = EmbeddingClient::new(provider, limiter.clone(), &EmbeddingConfig::default());
    let search_config = SearchConfig {
        final_top_n: 2,
        similarity_threshold: -1.0,
    };
    let rerank_config = RerankConfig {
        enabled: true,
        ..Default::default()
    };

    let with_broken_reranker = SearchEngine::new(
        embedding.clone(),
        store.clone() as Arc<dyn VectorStore>,
        Some(RerankClient::new(
            Arc::new(FailingReranker),
            limiter.clone(),
            &rerank_config,
        )),
        search_config.clone(),
        rerank_config.clone(),
    );
    let vector_only = SearchEngine::new(
        embedding,
        store as Arc<dyn VectorStore>,
        None,
        search_config,
        rerank_config,
    );

    let query = SearchQuery::new("Apples grow on trees in the orchard.").with_threshold(-1.0);
    let fallback = with_broken_reranker
        .search(&query.clone().with_rerank(true))
        .await
        .unwrap();
    let baseline = vector_only.search(&query).await.unwrap();

    assert_eq!(fallback.len(), baseline.len());
    for (a, b) in fallback.iter().zip(baseline.iter()) {
        assert_eq!(a.chunk.id, b.chunk.id);
        assert!(a.rerank_score.is_none());
    }
    // The self-match ranks first
    assert!(fallback[0].chunk.document_name == "a.md");
}

#[tokio::test]
async fn search_finds_the_matching_document() {
    let store = Arc::new(MemoryVectorStore::new());
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(StubEmbedder::new());
    let pipeline = build_pipeline(provider.clone(), store.clone());

    pipeline
        .enqueue(Document::new("recipes.md", "Sourdough needs a mature starter."))
        .await;
    pipeline
        .enqueue(Document::new("infra.md", "The staging cluster runs three nodes."))
        .await;
    pipeline.run_until_idle().await;

    // Rank directly against the stored candidates using the same stub vectors
    let candidates = store.load_all().await.unwrap();
    let query_vec = stub_vector("Sourdough needs a mature starter.");
    let results = rank(&query_vec, candidates, -1.0, 5);

    assert!(!results.is_empty());
    assert_eq!(results[0].chunk.document_name, "recipes.md");
    assert!((results[0].similarity - 1.0).abs() < 1e-5);
}
