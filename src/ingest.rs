//! Ingestion pipeline: extraction, chunking, embedding and indexing of one PDF.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::chunking::{chunk_page, ChunkerConfig};
use crate::extract::{ExtractError, PdfExtractor};
use crate::llm::Embedder;
use crate::models::{Chunk, DocumentMeta, IndexedRecord, PageText};
use crate::search::VectorIndex;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),
    #[error("embedder returned {got} vectors for {expected} chunks")]
    EmbeddingCountMismatch { expected: usize, got: usize },
    #[error("indexing failed: {0:#}")]
    Index(anyhow::Error),
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: usize,
    /// Records written to the index.
    pub chunks: usize,
}

#[derive(Clone)]
pub struct Ingestor {
    extractor: Arc<dyn PdfExtractor>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunker: ChunkerConfig,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        extractor: Arc<dyn PdfExtractor>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chunker: ChunkerConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            extractor,
            embedder,
            index,
            chunker,
            batch_size: batch_size.max(1),
        }
    }

    /// Run the whole pipeline for the PDF stored at `path`.
    pub async fn ingest(
        &self,
        path: &Path,
        meta: DocumentMeta,
    ) -> Result<IngestReport, IngestError> {
        let pages = self.extract(path, meta).await?;
        self.index_pages(&pages).await
    }

    /// Extract page texts on the blocking pool. Nothing is written to the index.
    pub async fn extract(
        &self,
        path: &Path,
        meta: DocumentMeta,
    ) -> Result<Vec<PageText>, IngestError> {
        let extractor = Arc::clone(&self.extractor);
        let path: PathBuf = path.to_path_buf();

        let texts = tokio::task::spawn_blocking(move || extractor.extract_pages(&path))
            .await
            .map_err(|e| {
                ExtractError::Malformed(if e.is_panic() {
                    "PDF parser panicked".to_string()
                } else {
                    format!("extraction task failed: {e}")
                })
            })??;

        tracing::debug!(
            document.id = %meta.document_id,
            page_count = texts.len(),
            "extracted pages"
        );

        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText {
                meta: meta.clone(),
                page: i + 1,
                text,
            })
            .collect())
    }

    /// Chunk the pages, embed them batch by batch, and append each batch to
    /// the index as soon as it is embedded.
    ///
    /// A failure part-way leaves earlier batches in the index.
    pub async fn index_pages(&self, pages: &[PageText]) -> Result<IngestReport, IngestError> {
        let chunks: Vec<Chunk> = pages
            .iter()
            .flat_map(|page| chunk_page(page, &self.chunker))
            .collect();

        let document_id = pages.first().map(|p| p.meta.document_id);
        tracing::info!(
            document.id = ?document_id,
            page_count = pages.len(),
            chunk_count = chunks.len(),
            "chunked document"
        );

        let mut written = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(IngestError::Embedding)?;

            if embeddings.len() != batch.len() {
                return Err(IngestError::EmbeddingCountMismatch {
                    expected: batch.len(),
                    got: embeddings.len(),
                });
            }

            let records: Vec<IndexedRecord> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| IndexedRecord {
                    content: chunk.content.clone(),
                    metadata: chunk.metadata.clone(),
                    embedding,
                })
                .collect();

            self.index.append(records).map_err(IngestError::Index)?;
            written += batch.len();
        }

        tracing::info!(
            document.id = ?document_id,
            chunk_count = written,
            "indexed document"
        );

        Ok(IngestReport {
            pages: pages.len(),
            chunks: written,
        })
    }
}
