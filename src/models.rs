use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded PDF tracked in the document registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub filename: String,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
    pub indexed_at: Option<DateTime<Utc>>,
    pub page_count: usize,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Extracting,
    Embedding,
    Ready,
    Error(String),
}

impl DocumentStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Extracting | Self::Embedding)
    }
}

/// Identifying metadata attached to everything extracted from one upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMeta {
    pub document_id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Text of a single PDF page.
#[derive(Debug, Clone)]
pub struct PageText {
    pub meta: DocumentMeta,
    /// 1-based page number.
    pub page: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub document_id: Uuid,
    pub filename: String,
    pub page: usize,
    /// 0-based position of the chunk within its page.
    pub chunk_index: usize,
    pub uploaded_at: DateTime<Utc>,
}

/// A bounded slice of page text, the unit of embedding and retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A persisted (vector, chunk, metadata) triple in the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// A chunk returned by the retriever, with its cosine similarity to the query
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Top-k chunks for one query, ordered by descending score.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }
}

/// Source attribution for an answer, one per distinct filename
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    pub document_id: Uuid,
    pub filename: String,
    pub pages: Vec<usize>,
    /// Start of the first retrieved chunk, shortened for display.
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(alias = "question")]
    pub message: String,
    /// Number of chunks to retrieve (defaults to the configured top_k)
    pub k: Option<usize>,
    /// Restrict retrieval to these documents
    pub document_ids: Option<Vec<Uuid>>,
}

/// Upload response
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub filename: String,
    pub pages: usize,
    pub chunks_indexed: usize,
}
