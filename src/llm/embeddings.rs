use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::config::LlmConfig;

/// Maximum bytes sent per text to the embedding API, for chunk sizes raised
/// past what small embedding models accept.
const MAX_EMBED_CHARS: usize = 3_000;

/// Truncate `text` to at most `MAX_EMBED_CHARS` bytes on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Embedder calling the configured provider's HTTP API.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    config: LlmConfig,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        embed_batch(&self.client, &self.config, texts).await
    }
}

/// Generate embeddings for a batch of texts using the configured LLM provider.
pub async fn embed_batch(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let truncated: Vec<String> = texts
        .iter()
        .map(|t| truncate_for_embedding(t).to_string())
        .collect();

    let max_per_request = match config.provider.as_str() {
        "ollama" => OLLAMA_MAX_INPUTS,
        "openai" => OPENAI_MAX_INPUTS,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    };

    let mut vectors = Vec::with_capacity(texts.len());
    for group in truncated.chunks(max_per_request) {
        let group_vectors = if config.provider == "ollama" {
            embed_ollama(client, config, group).await?
        } else {
            embed_openai(client, config, group).await?
        };
        vectors.extend(group_vectors);
    }
    Ok(vectors)
}

/// Send `body` and decode the JSON reply, turning non-2xx statuses into errors.
async fn post_embed<Req: Serialize, Resp: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    body: &Req,
    provider: &str,
) -> Result<Resp> {
    let resp = request
        .json(body)
        .send()
        .await
        .with_context(|| format!("{provider} embedding request failed"))?;

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        anyhow::bail!("{provider} embedding API returned {status}: {detail}");
    }

    resp.json()
        .await
        .with_context(|| format!("Malformed {provider} embedding response"))
}

// ─── Ollama ──────────────────────────────────────────────

const OLLAMA_MAX_INPUTS: usize = 32;

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let request = client.post(format!("{}/api/embed", config.base_url));
    let body = OllamaEmbedRequest {
        model: &config.embedding_model,
        input: texts,
        truncate: true,
    };
    let reply: OllamaEmbedResponse = post_embed(request, &body, "Ollama").await?;
    Ok(reply.embeddings)
}

// ─── OpenAI-compatible ───────────────────────────────────

const OPENAI_MAX_INPUTS: usize = 64;

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    index: Option<usize>,
    embedding: Vec<f32>,
}

async fn embed_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let request = client
        .post(format!("{}/v1/embeddings", config.base_url))
        .bearer_auth(config.api_key.as_deref().unwrap_or_default());
    let body = OpenAiEmbedRequest {
        model: &config.embedding_model,
        input: texts,
    };
    let reply: OpenAiEmbedResponse = post_embed(request, &body, "OpenAI").await?;
    Ok(order_openai_embeddings(reply.data))
}

/// The API documents `index` per item; honor it rather than trusting array order.
fn order_openai_embeddings(mut data: Vec<OpenAiEmbedData>) -> Vec<Vec<f32>> {
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    data.into_iter().map(|d| d.embedding).collect()
}
