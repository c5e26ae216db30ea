use std::path::Path as FsPath;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::looks_like_pdf;
use crate::ingest::{IngestError, IngestReport};
use crate::models::{DocumentMeta, DocumentRecord, DocumentStatus, UploadResponse};
use crate::state::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const FALLBACK_FILENAME: &str = "document.pdf";

/// A file part pulled out of the multipart body.
struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// GET /api/documents - List uploaded documents, newest first
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentRecord>> {
    let mut documents = state.documents.read().clone();
    // Registry is in upload order; reversing first keeps timestamp ties newest first
    documents.reverse();
    documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    Json(documents)
}

/// POST /api/admin/upload - Store a PDF and index it before responding
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let multipart = multipart.map_err(|e| ApiError::new(e.status(), e.body_text()))?;
    let file = read_file_field(multipart)
        .await?
        .ok_or_else(|| ApiError::bad_request("No file uploaded (expected a `file` field)"))?;

    validate_pdf(&file, state.config.max_upload_bytes())?;

    let _permit = state
        .ingest_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::unavailable("Ingestion service is shutting down"))?;

    let record = DocumentRecord {
        id: Uuid::new_v4(),
        filename: file.filename,
        status: DocumentStatus::Extracting,
        uploaded_at: Utc::now(),
        indexed_at: None,
        page_count: 0,
        chunk_count: 0,
    };
    let meta = DocumentMeta {
        document_id: record.id,
        filename: record.filename.clone(),
        uploaded_at: record.uploaded_at,
    };

    let path = state.config.upload_path(&record.id);
    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(|e| ApiError::internal("Failed to store upload", e))?;

    let _claim = state.begin_ingest(record.id);
    {
        let mut documents = state.documents.write();
        documents.push(record);
    }
    state.persist_documents();

    tracing::info!(
        document.id = %meta.document_id,
        filename = %meta.filename,
        bytes = file.bytes.len(),
        "stored upload"
    );

    let report = match run_ingestion(&state, meta.clone(), &path).await {
        Ok(report) => report,
        Err(e) => {
            if matches!(e, IngestError::Extraction(_)) {
                // Nothing was indexed from it and it cannot be re-ingested
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("Failed to remove {}: {rm}", path.display());
                }
                state.remove_document(meta.document_id);
            }
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            document_id: meta.document_id,
            filename: meta.filename,
            pages: report.pages,
            chunks_indexed: report.chunks,
        }),
    ))
}

/// POST /api/documents/{id}/reingest - Run ingestion again on the stored file
pub async fn reingest_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentRecord>, ApiError> {
    let record = state
        .document(id)
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    let _claim = state.begin_ingest(id).ok_or_else(|| {
        ApiError::new(StatusCode::CONFLICT, "Document is already being processed")
    })?;

    let path = state.config.upload_path(&id);
    if !path.exists() {
        return Err(ApiError::not_found(
            "Stored file not found. Upload the document again.",
        ));
    }

    let _permit = state
        .ingest_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::unavailable("Ingestion service is shutting down"))?;

    let meta = DocumentMeta {
        document_id: record.id,
        filename: record.filename,
        uploaded_at: record.uploaded_at,
    };
    run_ingestion(&state, meta, &path).await?;

    state
        .document(id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Document not found"))
}

/// Extract, chunk, embed and index one stored PDF, tracking progress in the
/// document registry.
async fn run_ingestion(
    state: &AppState,
    meta: DocumentMeta,
    path: &FsPath,
) -> Result<IngestReport, IngestError> {
    let id = meta.document_id;
    state.set_status(id, DocumentStatus::Extracting);

    let result = async {
        let pages = state.ingestor.extract(path, meta).await?;
        state.set_status(id, DocumentStatus::Embedding);
        state.ingestor.index_pages(&pages).await
    }
    .await;

    match &result {
        Ok(report) => {
            let report = *report;
            state.update_document(id, |doc| {
                doc.status = DocumentStatus::Ready;
                doc.page_count = report.pages;
                doc.chunk_count = report.chunks;
                doc.indexed_at = Some(Utc::now());
            });
            tracing::info!(
                document.id = %id,
                page_count = report.pages,
                chunk_count = report.chunks,
                "document ready"
            );
        }
        Err(e) => {
            tracing::warn!(document.id = %id, "ingestion failed: {e}");
            state.set_status(id, DocumentStatus::Error(e.to_string()));
        }
    }

    result
}

async fn read_file_field(mut multipart: Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = sanitize_filename(field.file_name());
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;

        return Ok(Some(UploadedFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

fn validate_pdf(file: &UploadedFile, max_bytes: usize) -> Result<(), ApiError> {
    let declared_pdf = file
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.eq_ignore_ascii_case(PDF_CONTENT_TYPE));
    let named_pdf = file.filename.to_ascii_lowercase().ends_with(".pdf");

    if !declared_pdf && !named_pdf {
        return Err(ApiError::bad_request("Only PDF files are accepted"));
    }
    if file.bytes.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if file.bytes.len() > max_bytes {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("File exceeds the {} MB limit", max_bytes / (1024 * 1024)),
        ));
    }
    if !looks_like_pdf(&file.bytes) {
        return Err(ApiError::bad_request("File is not a valid PDF"));
    }
    Ok(())
}

/// Keep only the final path component of a client-supplied name.
fn sanitize_filename(name: Option<&str>) -> String {
    name.and_then(|n| n.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or(FALLBACK_FILENAME)
        .to_string()
}
