//! Language-model capabilities: embeddings and chat completion.
//!
//! Both are reached over HTTP (Ollama or any OpenAI-compatible API) and sit
//! behind traits so the pipeline can be driven by other backends.

pub mod chat;
pub mod embeddings;

use anyhow::{Context, Result};
use async_trait::async_trait;

pub use chat::HttpChatModel;
pub use embeddings::HttpEmbedder;

/// Turns text into fixed-dimension vectors. Ingestion and retrieval must use
/// the same instance so stored and query vectors are comparable.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in the same order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .context("No embedding returned")
    }
}

/// Single-turn completion: prompt in, model text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
