use serde::{Deserialize, Serialize};

/// A note whose extracted text is ready for vectorization. Text extraction
/// itself happens upstream; this pipeline only reads `content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: String,
}

impl Document {
    pub fn generate_id(name: &str) -> String {
        use sha2::{Digest, Sha256};
        let hash = Sha256::digest(name.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let id = Self::generate_id(&name);
        Self {
            id,
            name,
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A contiguous slice of a document's text, the unit over which embeddings
/// are computed. Created without a vector, filled in by the embedding client,
/// then persisted and read-only until the owning document is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: u32,
    pub content: String,
    /// Empty until the embedding client attaches a vector.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    pub created_at: String,
}

impl DocumentChunk {
    /// Deterministic chunk id, stable across reprocessing of the same
    /// document/index pair.
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(document: &Document, content: String, chunk_index: u32) -> Self {
        let id = Self::generate_id(&document.id, chunk_index);
        Self {
            id,
            document_id: document.id.clone(),
            document_name: document.name.clone(),
            chunk_index,
            content,
            embedding: Vec::new(),
            created_at: document.created_at.clone(),
        }
    }

    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }
}
