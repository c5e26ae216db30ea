//! HTTP surface: document upload and management, chat, and the bundled UI.

pub mod chat;
pub mod documents;
pub mod system;

use axum::extract::DefaultBodyLimit;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
///
/// No CORS layer: the UI is served from the same origin.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes() + MULTIPART_OVERHEAD;

    Router::new()
        // Serve frontend
        .route("/", get(serve_index))
        // API routes
        .route(
            "/api/admin/upload",
            post(documents::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/documents", get(documents::list_documents))
        .route("/api/documents/{id}/reingest", post(documents::reingest_document))
        .route("/api/chat", post(chat::chat))
        .route("/api/config", get(system::get_config))
        .route("/api/health", get(system::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}
