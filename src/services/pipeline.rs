//! The vectorization pipeline: a per-document FIFO queue and state machine
//! driving chunking, embedding, and storage.
//!
//! Two gates bound concurrency. The rate limiter serializes individual
//! provider calls; the processing lock here is the coarser one, letting a
//! single document's entire chunk-embed-store job run at a time. The queue,
//! processing set, task map, and counters are only touched while holding the
//! state lock, so a reactive watcher and a manual retry firing together
//! cannot double-queue a document.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{ChunkError, PipelineError};
use crate::models::{Document, ProcessingProgress, ProcessingTask, TaskState};
use crate::services::chunker::TextChunker;
use crate::services::embedding::EmbeddingClient;
use crate::services::vector_store::VectorStore;
use crate::utils::retry::{RetryConfig, with_retry};

#[derive(Default)]
struct QueueState {
    queue: VecDeque<String>,
    processing: HashSet<String>,
    tasks: HashMap<String, ProcessingTask>,
    pending_documents: HashMap<String, Document>,
    vectorized: HashSet<String>,
    progress: ProcessingProgress,
}

pub struct VectorizationPipeline {
    chunker: TextChunker,
    embedding: EmbeddingClient,
    store: Arc<dyn VectorStore>,
    retry: RetryConfig,
    state: Mutex<QueueState>,
    /// One document's vectorization job at a time, queue order preserved.
    processing_lock: Mutex<()>,
}

impl VectorizationPipeline {
    pub fn new(
        chunker: TextChunker,
        embedding: EmbeddingClient,
        store: Arc<dyn VectorStore>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            chunker,
            embedding,
            store,
            retry,
            state: Mutex::new(QueueState::default()),
            processing_lock: Mutex::new(()),
        }
    }

    /// Queue a document for vectorization. Returns false when the document
    /// is already vectorized, queued, or currently processing.
    pub async fn enqueue(&self, document: Document) -> bool {
        let mut state = self.state.lock().await;
        let id = document.id.clone();

        if state.vectorized.contains(&id)
            || state.processing.contains(&id)
            || state.pending_documents.contains_key(&id)
        {
            return false;
        }

        // A fresh batch arriving at an idle pipeline restarts the counters
        if state.queue.is_empty() && state.processing.is_empty() && state.progress.is_done() {
            state.progress = ProcessingProgress::default();
        }

        state.queue.push_back(id.clone());
        state.pending_documents.insert(id.clone(), document);
        let task = state
            .tasks
            .entry(id.clone())
            .or_insert_with(|| ProcessingTask::new(id.clone()));
        task.state = TaskState::Queued;
        task.error = None;
        state.progress.total += 1;
        true
    }

    /// Process the next queued document, if any. Returns its final state.
    pub async fn process_next(&self) -> Option<TaskState> {
        let _gate = self.processing_lock.lock().await;

        let (id, document) = {
            let mut state = self.state.lock().await;
            let id = state.queue.pop_front()?;
            let document = state.pending_documents.remove(&id)?;
            state.processing.insert(id.clone());
            if let Some(task) = state.tasks.get_mut(&id) {
                task.state = TaskState::Processing;
            }
            (id, document)
        };

        let outcome = self.vectorize(&document).await;

        // The id leaves the processing set on every outcome, so a failure
        // never wedges the document against future reprocessing.
        let mut state = self.state.lock().await;
        state.processing.remove(&id);

        let final_state = match outcome {
            Ok((chunk_count, retries)) => {
                state.vectorized.insert(id.clone());
                state.progress.processed += 1;
                if let Some(task) = state.tasks.get_mut(&id) {
                    task.state = TaskState::Completed;
                    task.retry_count += retries;
                    task.error = None;
                }
                info!(document = %document.name, chunks = chunk_count, "vectorization completed");
                TaskState::Completed
            }
            Err(err) => {
                state.progress.failed += 1;
                if let Some(task) = state.tasks.get_mut(&id) {
                    task.state = TaskState::Failed;
                    task.error = Some(err.to_string());
                }
                warn!(document = %document.name, "vectorization failed: {err}");
                TaskState::Failed
            }
        };
        Some(final_state)
    }

    /// Drain the queue. One document's failure never stalls the rest.
    pub async fn run_until_idle(&self) {
        while self.process_next().await.is_some() {}
    }

    /// Explicit retry of a failed document: resets its task to pending and
    /// re-queues it. Returns false unless the task is currently failed.
    pub async fn reprocess(&self, document: Document) -> bool {
        {
            let mut state = self.state.lock().await;
            match state.tasks.get_mut(&document.id) {
                Some(task) if task.state == TaskState::Failed => {
                    task.state = TaskState::Pending;
                    task.error = None;
                }
                _ => return false,
            }
            state.vectorized.remove(&document.id);
        }
        self.enqueue(document).await
    }

    /// Remove a document's chunks from the store. Cleanup failures are
    /// logged, never fatal.
    pub async fn delete_document(&self, document_id: &str) {
        if let Err(err) = self.store.delete(document_id).await {
            warn!(document_id, "vector cleanup failed (ignored): {err}");
        }
        let mut state = self.state.lock().await;
        state.vectorized.remove(document_id);
        state.tasks.remove(document_id);
    }

    /// Progress snapshot for polling.
    pub async fn progress(&self) -> ProcessingProgress {
        self.state.lock().await.progress
    }

    pub async fn task(&self, document_id: &str) -> Option<ProcessingTask> {
        self.state.lock().await.tasks.get(document_id).cloned()
    }

    /// Snapshot of every known task, for status polling.
    pub async fn tasks(&self) -> Vec<ProcessingTask> {
        self.state.lock().await.tasks.values().cloned().collect()
    }

    pub async fn is_processing(&self, document_id: &str) -> bool {
        self.state.lock().await.processing.contains(document_id)
    }

    /// Chunk, embed (batch by batch, with backoff on transient provider
    /// errors), and persist one document. Returns the chunk count and how
    /// many retries the embedding step needed.
    async fn vectorize(&self, document: &Document) -> Result<(usize, u32), PipelineError> {
        let mut chunks = self.chunker.chunk_document(document);
        if chunks.is_empty() {
            return Err(ChunkError::Empty.into());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let mut retries = 0u32;
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.embedding.batch_size()) {
            let result = with_retry(&self.retry, || self.embedding.embed(batch)).await;
            retries += result.attempts().saturating_sub(1);
            embeddings.extend(result.into_result()?);
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let chunk_count = chunks.len();
        self.store.save(&document.id, chunks).await?;
        Ok((chunk_count, retries))
    }
}
