//! Integration tests for the upload -> ingest -> chat pipeline.
//!
//! These drive the real router end to end, with the PDF parser and the model
//! provider replaced by deterministic stand-ins so no LLM needs to be running.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use pdf_rag::api;
use pdf_rag::composer::NOT_FOUND_ANSWER;
use pdf_rag::config::Config;
use pdf_rag::extract::{ExtractError, PdfExtractor};
use pdf_rag::llm::{ChatModel, Embedder};
use pdf_rag::search::VectorStore;
use pdf_rag::state::AppState;

const BOUNDARY: &str = "pdfragtestboundary";
const DIMS: usize = 64;

/// Treats everything after the `%PDF-` header line as text, with form feeds
/// separating pages.
struct PlainTextExtractor;

impl PdfExtractor for PlainTextExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let body = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        if body.contains("CORRUPT") {
            return Err(ExtractError::Malformed("broken xref table".into()));
        }
        let mut pages: Vec<String> = body.split('\x0c').map(str::to_string).collect();
        if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
            pages.pop();
        }
        Ok(pages)
    }
}

/// Hashes lowercase words into a fixed number of buckets.
struct BagOfWordsEmbedder;

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
        v[bucket % DIMS] += 1.0;
    }
    v
}

/// Answers from the prompt's context the way an obedient model would.
struct ScriptedChat {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains("The sky is blue.") {
            Ok("The sky is blue [1].".to_string())
        } else {
            Ok(NOT_FOUND_ANSWER.to_string())
        }
    }
}

struct TestApp {
    _dir: TempDir,
    data_dir: std::path::PathBuf,
    router: Router,
    chat: Arc<ScriptedChat>,
}

fn test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    test_app_in(tempfile::tempdir().unwrap(), configure)
}

/// Build the app over a data directory that may already hold state.
fn test_app_in(dir: TempDir, configure: impl FnOnce(&mut Config)) -> TestApp {
    let mut config = Config {
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    configure(&mut config);

    let chat = Arc::new(ScriptedChat {
        calls: AtomicUsize::new(0),
    });
    let state = AppState::with_components(
        config,
        Arc::new(PlainTextExtractor),
        Arc::new(BagOfWordsEmbedder),
        chat.clone(),
        Arc::new(VectorStore::in_memory()),
    )
    .unwrap();

    TestApp {
        data_dir: dir.path().to_path_buf(),
        _dir: dir,
        router: api::router(state),
        chat,
    }
}

fn test_app() -> TestApp {
    test_app_with(|_| {})
}

fn fake_pdf(text: &str) -> Vec<u8> {
    format!("%PDF-1.4\n{text}").into_bytes()
}

fn multipart_request(
    field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/admin/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

async fn upload_pdf(app: &TestApp, filename: &str, text: &str) -> (StatusCode, Value) {
    send(
        app,
        multipart_request("file", filename, "application/pdf", &fake_pdf(text)),
    )
    .await
}

async fn ask(app: &TestApp, message: &str) -> (StatusCode, Value) {
    send(app, json_request("POST", "/api/chat", json!({ "message": message }))).await
}

async fn record_count(app: &TestApp) -> u64 {
    let (_, health) = send(app, get("/api/health")).await;
    health["records"].as_u64().unwrap()
}

// ─── End to end ──────────────────────────────────────

#[tokio::test]
async fn test_upload_then_answer_with_source() {
    let app = test_app();

    let (status, upload) = upload_pdf(&app, "sky.pdf", "The sky is blue.").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(upload["filename"], "sky.pdf");
    assert_eq!(upload["pages"], 1);
    assert_eq!(upload["chunks_indexed"], 1);

    let (status, answer) = ask(&app, "What color is the sky?").await;
    assert_eq!(status, StatusCode::OK);
    assert!(answer["answer"].as_str().unwrap().contains("blue"));

    let sources = answer["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["filename"], "sky.pdf");
    assert_eq!(sources[0]["pages"], json!([1]));
    assert_eq!(sources[0]["document_id"], upload["document_id"]);
    assert_eq!(sources[0]["preview"], "The sky is blue.");
}

#[tokio::test]
async fn test_no_documents_yields_not_found_without_model_call() {
    let app = test_app();

    let (status, answer) = ask(&app, "What color is the sky?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["answer"], NOT_FOUND_ANSWER);
    assert_eq!(answer["sources"], json!([]));
    assert_eq!(app.chat.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_question_field_is_accepted() {
    let app = test_app();
    upload_pdf(&app, "sky.pdf", "The sky is blue.").await;

    let (status, answer) = send(
        &app,
        json_request("POST", "/api/chat", json!({ "question": "Is the sky blue?", "k": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(answer["answer"].as_str().unwrap().contains("blue"));
}

#[tokio::test]
async fn test_multi_page_document_reports_pages() {
    let app = test_app();

    let (status, upload) = upload_pdf(
        &app,
        "guide.pdf",
        "Chapter one covers setup.\x0cChapter two covers usage.\x0cChapter three covers FAQ.\x0c",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(upload["pages"], 3);
    assert_eq!(upload["chunks_indexed"], 3);
    assert_eq!(record_count(&app).await, 3);
}

#[tokio::test]
async fn test_uploaded_file_is_stored_by_document_id() {
    let app = test_app();
    let (_, upload) = upload_pdf(&app, "sky.pdf", "The sky is blue.").await;

    let id = upload["document_id"].as_str().unwrap();
    let stored = app.data_dir.join("uploads").join(format!("{id}.pdf"));
    assert_eq!(std::fs::read(stored).unwrap(), fake_pdf("The sky is blue."));
}

// ─── Upload validation ──────────────────────────────

#[tokio::test]
async fn test_non_pdf_upload_is_rejected_and_index_unchanged() {
    let app = test_app();

    let (status, body) = send(
        &app,
        multipart_request("file", "notes.txt", "text/plain", b"The sky is blue."),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("PDF"));
    assert_eq!(record_count(&app).await, 0);

    let (_, documents) = send(&app, get("/api/documents")).await;
    assert_eq!(documents, json!([]));
}

#[tokio::test]
async fn test_pdf_named_file_without_pdf_header_is_rejected() {
    let app = test_app();

    let (status, body) = send(
        &app,
        multipart_request("file", "fake.pdf", "application/pdf", b"just some text"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File is not a valid PDF");
    assert_eq!(record_count(&app).await, 0);
}

#[tokio::test]
async fn test_non_multipart_upload_is_rejected_as_json() {
    let app = test_app();

    let (status, body) = send(
        &app,
        json_request("POST", "/api/admin/upload", json!({ "file": "sky.pdf" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_file_field_is_rejected() {
    let app = test_app();

    let (status, body) = send(
        &app,
        multipart_request("attachment", "sky.pdf", "application/pdf", &fake_pdf("x")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("No file uploaded"));
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let app = test_app_with(|c| c.max_upload_mb = 1);

    let mut bytes = fake_pdf("big");
    bytes.resize(1024 * 1024 + 1000, b' ');
    let (status, body) = send(
        &app,
        multipart_request("file", "big.pdf", "application/pdf", &bytes),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().unwrap().contains("1 MB"));
    assert_eq!(record_count(&app).await, 0);
}

#[tokio::test]
async fn test_unreadable_pdf_is_unprocessable() {
    let app = test_app();

    let (status, body) = upload_pdf(&app, "broken.pdf", "CORRUPT").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("broken xref table"));
    assert_eq!(record_count(&app).await, 0);

    let (_, documents) = send(&app, get("/api/documents")).await;
    assert_eq!(documents, json!([]));

    let uploads = std::fs::read_dir(app.data_dir.join("uploads")).unwrap();
    assert_eq!(uploads.count(), 0);

    let persisted = std::fs::read_to_string(app.data_dir.join("documents.json")).unwrap();
    assert!(!persisted.contains("broken.pdf"));
}

// ─── Chat validation ────────────────────────────────

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let app = test_app();

    let (status, body) = ask(&app, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message is required");
}

#[tokio::test]
async fn test_malformed_chat_body_returns_json_error() {
    let app = test_app();

    let (status, body) = send(
        &app,
        json_request("POST", "/api/chat", json!({ "text": "wrong field" })),
    )
    .await;
    assert!(status.is_client_error());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_document_filter_excludes_other_documents() {
    let app = test_app();
    let (_, sky) = upload_pdf(&app, "sky.pdf", "The sky is blue.").await;
    let (_, grass) = upload_pdf(&app, "grass.pdf", "Grass is green.").await;
    assert_ne!(sky["document_id"], grass["document_id"]);

    let (status, answer) = send(
        &app,
        json_request(
            "POST",
            "/api/chat",
            json!({ "message": "What color is the sky?", "document_ids": [grass["document_id"]] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["answer"], NOT_FOUND_ANSWER);
    let sources = answer["sources"].as_array().unwrap();
    assert!(sources.iter().all(|s| s["filename"] == "grass.pdf"));
}

// ─── Documents ──────────────────────────────────────

#[tokio::test]
async fn test_documents_listed_newest_first_and_ready() {
    let app = test_app();
    upload_pdf(&app, "first.pdf", "Alpha.").await;
    upload_pdf(&app, "second.pdf", "Beta.").await;

    let (status, documents) = send(&app, get("/api/documents")).await;
    assert_eq!(status, StatusCode::OK);
    let documents = documents.as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["filename"], "second.pdf");
    assert_eq!(documents[1]["filename"], "first.pdf");
    assert!(documents.iter().all(|d| d["status"] == "ready"));
    assert_eq!(documents[0]["chunk_count"], 1);
}

#[tokio::test]
async fn test_reingest_appends_records_again() {
    let app = test_app();
    let (_, upload) = upload_pdf(&app, "sky.pdf", "The sky is blue.").await;
    let id = upload["document_id"].as_str().unwrap();

    let (status, doc) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri(format!("/api/documents/{id}/reingest"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["status"], "ready");
    assert_eq!(record_count(&app).await, 2);
}

#[tokio::test]
async fn test_reingest_after_restart_mid_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let id = uuid::Uuid::new_v4();
    std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
    std::fs::write(
        dir.path().join("uploads").join(format!("{id}.pdf")),
        fake_pdf("The sky is blue."),
    )
    .unwrap();
    let registry = json!([{
        "id": id,
        "filename": "sky.pdf",
        "status": "embedding",
        "uploaded_at": "2024-05-01T12:00:00Z",
        "indexed_at": null,
        "page_count": 0,
        "chunk_count": 0
    }]);
    std::fs::write(dir.path().join("documents.json"), registry.to_string()).unwrap();

    let app = test_app_in(dir, |_| {});

    let (_, documents) = send(&app, get("/api/documents")).await;
    assert!(documents[0]["status"]["error"].is_string());

    let (status, doc) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri(format!("/api/documents/{id}/reingest"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["status"], "ready");
    assert_eq!(doc["chunk_count"], 1);
    assert_eq!(record_count(&app).await, 1);
}

#[tokio::test]
async fn test_reingest_unknown_document_is_not_found() {
    let app = test_app();

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri(format!("/api/documents/{}/reingest", uuid::Uuid::new_v4()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Document not found");
}

// ─── System ─────────────────────────────────────────

#[tokio::test]
async fn test_config_redacts_api_key() {
    let app = test_app_with(|c| c.llm.api_key = Some("sk-secret".to_string()));

    let (status, config) = send(&app, get("/api/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["has_api_key"], true);
    assert_eq!(config["chunk_size"], 1000);
    assert_eq!(config["chunk_overlap"], 200);
    assert!(!config.to_string().contains("sk-secret"));
}

#[tokio::test]
async fn test_index_page_is_served() {
    let app = test_app();
    let response = app.router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let page = String::from_utf8_lossy(&bytes);
    assert!(page.contains("/api/admin/upload"));
    assert!(page.contains("Network error, please retry."));
    assert!(page.contains("s.preview"));
}
