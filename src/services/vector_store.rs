//! Vector store boundary.
//!
//! Durable storage of chunk+embedding records is an external collaborator;
//! this module fixes its interface and ships an in-memory reference backend
//! used by tests and by deployments that keep the candidate set in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::VectorStoreError;
use crate::models::DocumentChunk;

/// Durable key-value storage of chunk records, keyed by document id.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist all chunks of a document. Overwrites any previous record for
    /// the same document id (idempotent).
    async fn save(
        &self,
        document_id: &str,
        chunks: Vec<DocumentChunk>,
    ) -> Result<(), VectorStoreError>;

    /// Load the chunks of one document, or None if it was never saved.
    async fn load(&self, document_id: &str)
    -> Result<Option<Vec<DocumentChunk>>, VectorStoreError>;

    /// Load every stored chunk, the candidate set for a similarity search.
    async fn load_all(&self) -> Result<Vec<DocumentChunk>, VectorStoreError>;

    /// Remove a document's chunks. Callers treat failures as non-fatal
    /// cleanup; implementations should still report them.
    async fn delete(&self, document_id: &str) -> Result<(), VectorStoreError>;
}

/// In-memory reference backend.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    chunks: RwLock<HashMap<String, Vec<DocumentChunk>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn document_count(&self) -> usize {
        self.chunks.read().await.len()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn save(
        &self,
        document_id: &str,
        chunks: Vec<DocumentChunk>,
    ) -> Result<(), VectorStoreError> {
        self.chunks
            .write()
            .await
            .insert(document_id.to_string(), chunks);
        Ok(())
    }

    async fn load(
        &self,
        document_id: &str,
    ) -> Result<Option<Vec<DocumentChunk>>, VectorStoreError> {
        Ok(self.chunks.read().await.get(document_id).cloned())
    }

    async fn load_all(&self) -> Result<Vec<DocumentChunk>, VectorStoreError> {
        Ok(self
            .chunks
            .read()
            .await
            .values()
            .flatten()
            .cloned()
            .collect())
    }

    async fn delete(&self, document_id: &str) -> Result<(), VectorStoreError> {
        self.chunks.write().await.remove(document_id);
        Ok(())
    }
}
