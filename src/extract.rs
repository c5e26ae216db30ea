//! PDF text extraction, delegated to the `pdf-extract` crate.

use std::path::Path;

use thiserror::Error;

/// PDF readers tolerate junk before the header within the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("file is not a PDF")]
    NotPdf,
    #[error("could not extract text from PDF: {0}")]
    Malformed(String),
}

/// Turns a stored PDF into its page texts, in page order.
pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError>;
}

/// Default extractor backed by `pdf_extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtract;

impl PdfExtractor for PdfExtract {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if !looks_like_pdf(&bytes) {
            return Err(ExtractError::NotPdf);
        }

        let mut pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| ExtractError::Malformed(e.to_string()))?;
        if pages.is_empty() {
            return Err(ExtractError::Malformed("PDF has no pages".to_string()));
        }
        for page in &mut pages {
            // Some producers end every page with a form feed
            if page.ends_with('\x0c') {
                page.pop();
            }
        }

        Ok(pages)
    }
}

/// Whether the bytes carry a PDF header.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|w| w == PDF_MAGIC)
}
