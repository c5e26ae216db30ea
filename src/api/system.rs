use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Config response with API key redacted
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub provider: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub has_api_key: bool,
    pub temperature: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_upload_mb: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub documents: usize,
    pub records: usize,
}

/// GET /api/config - Current LLM and chunking settings (API key redacted)
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let config = &state.config;
    Json(ConfigResponse {
        provider: config.llm.provider.clone(),
        base_url: config.llm.base_url.clone(),
        chat_model: config.llm.chat_model.clone(),
        embedding_model: config.llm.embedding_model.clone(),
        has_api_key: config.llm.api_key.is_some(),
        temperature: config.llm.temperature,
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
        top_k: config.top_k,
        max_upload_mb: config.max_upload_mb,
    })
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        documents: state.documents.read().len(),
        records: state.index.len(),
    })
}
