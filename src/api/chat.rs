use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::composer::compose;
use crate::error::ApiError;
use crate::models::{Answer, ChatRequest};
use crate::state::AppState;

const MAX_CHAT_MESSAGE_LEN: usize = 2000;
const MAX_K: usize = 20;

/// POST /api/chat - Answer a question from the indexed documents
pub async fn chat(
    State(state): State<AppState>,
    req: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(req) = req.map_err(|e| ApiError::new(e.status(), e.body_text()))?;

    // ── Validate input ────────────────────────────────────
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }
    let message = truncate_to_char_boundary(message, MAX_CHAT_MESSAGE_LEN);
    let k = req.k.unwrap_or(state.config.top_k).clamp(1, MAX_K);
    let document_ids = req.document_ids.filter(|ids| !ids.is_empty());

    // ── Acquire semaphore ─────────────────────────────────
    let _permit = state
        .chat_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::unavailable("Chat service at capacity"))?;

    // ── Retrieve and answer ───────────────────────────────
    let retrieval = state
        .retriever
        .retrieve(&message, k, document_ids.as_deref())
        .await
        .map_err(|e| ApiError::internal("Failed to search documents", e))?;

    tracing::info!(k, hits = retrieval.len(), "answering question");

    let answer = compose(state.chat_model.as_ref(), &message, &retrieval)
        .await
        .map_err(|e| ApiError::internal("Failed to generate an answer", e))?;

    Ok(Json(answer))
}

fn truncate_to_char_boundary(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    s.char_indices()
        .take_while(|(i, _)| *i < max_len)
        .map(|(_, c)| c)
        .collect()
}
