use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::extract::{PdfExtract, PdfExtractor};
use crate::ingest::Ingestor;
use crate::llm::{ChatModel, Embedder, HttpChatModel, HttpEmbedder};
use crate::models::{DocumentRecord, DocumentStatus};
use crate::retriever::Retriever;
use crate::search::{VectorIndex, VectorStore};

/// Concurrent chat requests allowed to reach the model provider.
const CHAT_PERMITS: usize = 3;

const INTERRUPTED: &str = "interrupted before indexing finished";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub documents: Arc<RwLock<Vec<DocumentRecord>>>,
    pub index: Arc<dyn VectorIndex>,
    pub ingestor: Ingestor,
    pub retriever: Retriever,
    pub chat_model: Arc<dyn ChatModel>,
    pub ingest_semaphore: Arc<tokio::sync::Semaphore>,
    pub chat_semaphore: Arc<tokio::sync::Semaphore>,
    /// Documents with an ingestion running in this process.
    ingesting: Arc<Mutex<HashSet<Uuid>>>,
}

/// Marks a document as being ingested until dropped.
pub struct IngestGuard {
    id: Uuid,
    ingesting: Arc<Mutex<HashSet<Uuid>>>,
}

impl Drop for IngestGuard {
    fn drop(&mut self) {
        self.ingesting.lock().remove(&self.id);
    }
}

impl AppState {
    /// Production wiring: `pdf-extract`, HTTP model clients and the on-disk vector store.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(config.vector_dir())?;
        let index = VectorStore::open_or_create_with_limit(
            &config.vector_dir(),
            config.max_vector_entries,
        )?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let embedder = HttpEmbedder::new(http_client.clone(), config.llm.clone());
        let chat_model = HttpChatModel::new(http_client, config.llm.clone());

        Self::with_components(
            config,
            Arc::new(PdfExtract),
            Arc::new(embedder),
            Arc::new(chat_model),
            Arc::new(index),
        )
    }

    /// Wire the state from explicit capabilities.
    pub fn with_components(
        config: Config,
        extractor: Arc<dyn PdfExtractor>,
        embedder: Arc<dyn Embedder>,
        chat_model: Arc<dyn ChatModel>,
        index: Arc<dyn VectorIndex>,
    ) -> anyhow::Result<Self> {
        let chunker = config.chunker()?;

        // Ensure data directories exist
        std::fs::create_dir_all(config.uploads_dir())?;

        // Load persisted document registry
        let mut documents: Vec<DocumentRecord> = if config.db_path().exists() {
            let data = std::fs::read_to_string(config.db_path())?;
            serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable {}: {e}", config.db_path().display());
                Vec::new()
            })
        } else {
            Vec::new()
        };

        // A run that was in progress when the process stopped will never finish
        let mut interrupted = 0;
        for doc in documents.iter_mut().filter(|d| d.status.is_in_progress()) {
            doc.status = DocumentStatus::Error(INTERRUPTED.to_string());
            interrupted += 1;
        }
        if interrupted > 0 {
            tracing::warn!(count = interrupted, "marked interrupted ingestions as failed");
        }

        let ingestor = Ingestor::new(
            extractor,
            Arc::clone(&embedder),
            Arc::clone(&index),
            chunker,
            config.embed_batch_size,
        );
        let retriever = Retriever::new(embedder, Arc::clone(&index));
        let max_concurrent_ingests = config.max_concurrent_ingests.max(1);

        let state = Self {
            config,
            documents: Arc::new(RwLock::new(documents)),
            index,
            ingestor,
            retriever,
            chat_model,
            ingest_semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent_ingests)),
            chat_semaphore: Arc::new(tokio::sync::Semaphore::new(CHAT_PERMITS)),
            ingesting: Arc::new(Mutex::new(HashSet::new())),
        };
        if interrupted > 0 {
            state.persist_documents();
        }
        Ok(state)
    }

    /// Claim `id` for ingestion. Returns `None` while another run holds it.
    pub fn begin_ingest(&self, id: Uuid) -> Option<IngestGuard> {
        if !self.ingesting.lock().insert(id) {
            return None;
        }
        Some(IngestGuard {
            id,
            ingesting: Arc::clone(&self.ingesting),
        })
    }

    /// Persist the document registry to disk (atomic write via temp file + rename).
    pub fn persist_documents(&self) {
        let documents = self.documents.read();
        match serde_json::to_string_pretty(&*documents) {
            Ok(data) => {
                let db_path = self.config.db_path();
                let tmp_path = db_path.with_extension("json.tmp");
                let written = std::fs::write(&tmp_path, &data)
                    .and_then(|_| std::fs::rename(&tmp_path, &db_path));
                if let Err(e) = written {
                    tracing::warn!("Failed to persist {}: {e}", db_path.display());
                }
            }
            Err(e) => tracing::warn!("Failed to serialize document registry: {e}"),
        }
    }

    pub fn document(&self, id: Uuid) -> Option<DocumentRecord> {
        self.documents.read().iter().find(|d| d.id == id).cloned()
    }

    /// Apply `f` to the record with `id` and persist the registry.
    pub fn update_document(&self, id: Uuid, f: impl FnOnce(&mut DocumentRecord)) {
        {
            let mut documents = self.documents.write();
            match documents.iter_mut().find(|d| d.id == id) {
                Some(doc) => f(doc),
                None => return,
            }
        }
        self.persist_documents();
    }

    /// Drop the record with `id` from the registry and persist it.
    pub fn remove_document(&self, id: Uuid) {
        {
            let mut documents = self.documents.write();
            let before = documents.len();
            documents.retain(|d| d.id != id);
            if documents.len() == before {
                return;
            }
        }
        self.persist_documents();
    }

    pub fn set_status(&self, id: Uuid, status: DocumentStatus) {
        self.update_document(id, |doc| doc.status = status);
    }
}
