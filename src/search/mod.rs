//! Vector index capability and its default in-process implementation.

pub mod vector;

use std::collections::HashMap;

use anyhow::Result;
use uuid::Uuid;

use crate::models::{IndexedRecord, RetrievedChunk};

pub use vector::VectorStore;

/// Append-only store of embedded chunks supporting nearest-neighbour search.
///
/// Implementations synchronize internally: appends from concurrent ingestions
/// and searches from concurrent questions may interleave freely.
pub trait VectorIndex: Send + Sync {
    /// Append records. Existing records are never modified.
    fn append(&self, records: Vec<IndexedRecord>) -> Result<()>;

    /// The `limit` records closest to `query`, best first, optionally
    /// restricted to the given documents.
    fn search(
        &self,
        query: &[f32],
        limit: usize,
        document_ids: Option<&[Uuid]>,
    ) -> Vec<RetrievedChunk>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record counts grouped by document id.
    fn document_counts(&self) -> HashMap<Uuid, usize>;
}
