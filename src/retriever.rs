use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::llm::Embedder;
use crate::models::RetrievalResult;
use crate::search::VectorIndex;

/// Top-k semantic lookup over the vector index.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed `query` and return the `k` most similar chunks, best first.
    ///
    /// An empty index yields an empty result without calling the embedder.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        document_ids: Option<&[Uuid]>,
    ) -> Result<RetrievalResult> {
        if k == 0 || self.index.is_empty() {
            return Ok(RetrievalResult::default());
        }

        let query_embedding = self
            .embedder
            .embed_one(query)
            .await
            .context("Failed to embed query")?;

        let chunks = self.index.search(&query_embedding, k, document_ids);
        tracing::debug!(k, hits = chunks.len(), "retrieved chunks");

        Ok(RetrievalResult { chunks })
    }
}
