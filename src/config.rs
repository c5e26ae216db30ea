use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::chunking::{ChunkerConfig, ChunkerConfigError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where uploaded PDFs, the document registry and vectors are stored
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
    /// Default number of chunks retrieved per question
    pub top_k: usize,
    /// Maximum accepted upload size in MB
    pub max_upload_mb: usize,
    /// Maximum concurrent ingestions
    pub max_concurrent_ingests: usize,
    /// Chunks sent to the embedding API per request
    pub embed_batch_size: usize,
    /// Maximum total vector entries (0 = unlimited)
    pub max_vector_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for answering questions
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Sampling temperature for answers
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9000".to_string(),
            llm: LlmConfig::default(),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            max_upload_mb: 25,
            max_concurrent_ingests: 2,
            embed_batch_size: 32,
            max_vector_entries: 500_000,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            temperature: 0.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("PDF_RAG_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("PDF_RAG_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            config.llm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Some(model) = lookup("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Some(key) = lookup("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Some(Ok(t)) = lookup("LLM_TEMPERATURE").map(|v| v.parse::<f32>()) {
            config.llm.temperature = t;
        }

        let numeric = |key: &str| lookup(key).and_then(|v| v.parse::<usize>().ok());

        if let Some(v) = numeric("PDF_RAG_CHUNK_SIZE") {
            config.chunk_size = v;
        }
        if let Some(v) = numeric("PDF_RAG_CHUNK_OVERLAP") {
            config.chunk_overlap = v;
        }
        if let Some(v) = numeric("PDF_RAG_TOP_K") {
            config.top_k = v;
        }
        if let Some(v) = numeric("PDF_RAG_MAX_UPLOAD_MB") {
            config.max_upload_mb = v;
        }
        if let Some(v) = numeric("PDF_RAG_MAX_CONCURRENT_INGESTS") {
            config.max_concurrent_ingests = v.max(1);
        }
        if let Some(v) = numeric("PDF_RAG_EMBED_BATCH_SIZE") {
            config.embed_batch_size = v.max(1);
        }
        if let Some(v) = numeric("PDF_RAG_MAX_VECTOR_ENTRIES") {
            config.max_vector_entries = v;
        }

        config
    }

    /// Validated chunking settings.
    pub fn chunker(&self) -> Result<ChunkerConfig, ChunkerConfigError> {
        ChunkerConfig::new(self.chunk_size, self.chunk_overlap)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn vector_dir(&self) -> PathBuf {
        self.data_dir.join("vectors")
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("documents.json")
    }

    /// Where the raw bytes of an uploaded document live.
    pub fn upload_path(&self, document_id: &uuid::Uuid) -> PathBuf {
        self.uploads_dir().join(format!("{document_id}.pdf"))
    }
}
