use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::VectorIndex;
use crate::models::{IndexedRecord, RetrievedChunk};

const RECORDS_FILE: &str = "records.jsonl";

/// In-memory vector store with append-only JSON Lines persistence and
/// cosine similarity search.
pub struct VectorStore {
    records: RwLock<Vec<IndexedRecord>>,
    persist_path: Option<PathBuf>,
    max_entries: usize,
}

impl VectorStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            persist_path: None,
            max_entries: 0,
        }
    }

    pub fn open_or_create(vector_dir: &Path) -> Result<Self> {
        Self::open_or_create_with_limit(vector_dir, 0)
    }

    /// Open the store in `vector_dir`, refusing appends beyond `max_entries`
    /// records (0 = unlimited).
    pub fn open_or_create_with_limit(vector_dir: &Path, max_entries: usize) -> Result<Self> {
        std::fs::create_dir_all(vector_dir)?;
        let persist_path = vector_dir.join(RECORDS_FILE);

        let records = if persist_path.exists() {
            load_records(&persist_path)?
        } else {
            Vec::new()
        };

        tracing::info!(
            "Loaded {} vector records from {}",
            records.len(),
            persist_path.display()
        );

        Ok(Self {
            records: RwLock::new(records),
            persist_path: Some(persist_path),
            max_entries,
        })
    }
}

impl VectorIndex for VectorStore {
    fn append(&self, new_records: Vec<IndexedRecord>) -> Result<()> {
        if new_records.is_empty() {
            return Ok(());
        }

        let mut records = self.records.write();

        if self.max_entries > 0 && records.len() + new_records.len() > self.max_entries {
            anyhow::bail!(
                "Vector store is full ({} of {} entries used)",
                records.len(),
                self.max_entries
            );
        }

        // Disk first, so memory never holds records that were not persisted
        if let Some(path) = &self.persist_path {
            let mut buf = Vec::new();
            for record in &new_records {
                serde_json::to_writer(&mut buf, record)?;
                buf.push(b'\n');
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            file.write_all(&buf)
                .with_context(|| format!("Failed to append to {}", path.display()))?;
            file.flush()?;
        }

        records.extend(new_records);
        Ok(())
    }

    fn search(
        &self,
        query: &[f32],
        limit: usize,
        document_ids: Option<&[Uuid]>,
    ) -> Vec<RetrievedChunk> {
        let records = self.records.read();

        let mut scored: Vec<(f32, &IndexedRecord)> = records
            .iter()
            .filter(|r| r.embedding.len() == query.len())
            .filter(|r| match document_ids {
                Some(ids) => ids.contains(&r.metadata.document_id),
                None => true,
            })
            .map(|r| (cosine_similarity(query, &r.embedding), r))
            .collect();

        // Stable sort: ties keep insertion order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(score, r)| RetrievedChunk {
                content: r.content.clone(),
                metadata: r.metadata.clone(),
                score,
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }

    fn document_counts(&self) -> HashMap<Uuid, usize> {
        let records = self.records.read();
        let mut counts = HashMap::new();
        for r in records.iter() {
            *counts.entry(r.metadata.document_id).or_insert(0) += 1;
        }
        counts
    }
}

/// Read a JSON Lines file, skipping lines that do not parse (e.g. a torn
/// final write after a crash).
fn load_records(path: &Path) -> Result<Vec<IndexedRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to read vector store {}", path.display()))?;

    let mut records = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<IndexedRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping malformed vector record on line {}: {e}", i + 1),
        }
    }
    Ok(records)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
