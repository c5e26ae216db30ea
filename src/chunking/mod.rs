//! Page chunking: overlapping, boundary-aware windows over extracted PDF text.

pub mod splitter;

use thiserror::Error;

use crate::models::{Chunk, ChunkMetadata, PageText};

pub use splitter::split_text;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkerConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Validated window size and overlap, both measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkerConfigError> {
        if chunk_size == 0 {
            return Err(ChunkerConfigError::ZeroSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkerConfigError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

/// Split one page into chunks that carry the page's document metadata.
pub fn chunk_page(page: &PageText, config: &ChunkerConfig) -> Vec<Chunk> {
    split_text(&page.text, config)
        .into_iter()
        .enumerate()
        .map(|(i, content)| Chunk {
            content,
            metadata: ChunkMetadata {
                document_id: page.meta.document_id,
                filename: page.meta.filename.clone(),
                page: page.page,
                chunk_index: i,
                uploaded_at: page.meta.uploaded_at,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMeta;
    use chrono::Utc;
    use uuid::Uuid;

    fn page(text: &str, number: usize) -> PageText {
        PageText {
            meta: DocumentMeta {
                document_id: Uuid::new_v4(),
                filename: "report.pdf".to_string(),
                uploaded_at: Utc::now(),
            },
            page: number,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(ChunkerConfig::new(0, 0), Err(ChunkerConfigError::ZeroSize));
        assert_eq!(
            ChunkerConfig::new(10, 10),
            Err(ChunkerConfigError::OverlapTooLarge {
                size: 10,
                overlap: 10
            })
        );
        assert!(ChunkerConfig::new(10, 9).is_ok());
        assert!(ChunkerConfig::new(1, 0).is_ok());
    }

    #[test]
    fn test_chunk_page_empty() {
        let cfg = ChunkerConfig::new(100, 10).unwrap();
        assert!(chunk_page(&page("", 1), &cfg).is_empty());
    }

    #[test]
    fn test_chunk_page_attaches_metadata() {
        let cfg = ChunkerConfig::new(1000, 200).unwrap();
        let p = page("The sky is blue.", 3);
        let chunks = chunk_page(&p, &cfg);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "The sky is blue.");
        assert_eq!(chunks[0].metadata.document_id, p.meta.document_id);
        assert_eq!(chunks[0].metadata.filename, "report.pdf");
        assert_eq!(chunks[0].metadata.page, 3);
        assert_eq!(chunks[0].metadata.chunk_index, 0);
    }

    #[test]
    fn test_chunk_page_sequential_indices() {
        let cfg = ChunkerConfig::new(50, 10).unwrap();
        let text = "Sentence number one goes here. ".repeat(20);
        let chunks = chunk_page(&page(&text, 1), &cfg);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata.chunk_index, i);
            assert!(chunk.content.chars().count() <= 50);
        }
    }
}
