use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode},
    response::Response,
};
use rag_base::errors::rag_base_error::RagBaseError;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    core::{app_state::AppState, http::response_envelope::ApiResponse},
    middleware_layer::request_id::request_id,
};

pub const PDF_FIELD: &str = "pdf";

const MSG_STORED: &str = "PDF processed & stored successfully.";
const MSG_NO_FILE: &str = "No PDF file provided";
const MSG_NO_TEXT: &str = "No extractable text found.";
const MSG_FAILED: &str = "Failed to process PDF";
const MSG_TOO_LARGE: &str = "PDF file is too large";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub chunks: usize,
}

/// `POST /api/upload`: multipart field `pdf` → extract → chunk → embed → store.
pub async fn upload_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = request_id(&headers).to_string();

    let pdf = match read_pdf_field(multipart).await {
        Ok(Some(pdf)) => pdf,
        Ok(None) => {
            warn!(request_id = %request_id, "upload_route: no pdf field");
            return ApiResponse::<()>::error(MSG_NO_FILE)
                .into_response_with_status(StatusCode::BAD_REQUEST);
        }
        Err(FormError::TooLarge(details)) => {
            warn!(
                request_id = %request_id,
                limit_bytes = state.upload_max_bytes,
                %details,
                "upload_route: body over limit"
            );
            return ApiResponse::<()>::error(MSG_TOO_LARGE)
                .with_details(format!(
                    "upload limit is {} bytes",
                    state.upload_max_bytes
                ))
                .into_response_with_status(StatusCode::PAYLOAD_TOO_LARGE);
        }
        Err(FormError::Malformed(details)) => {
            warn!(request_id = %request_id, %details, "upload_route: bad multipart");
            return ApiResponse::<()>::error(MSG_NO_FILE)
                .with_details(details)
                .into_response_with_status(StatusCode::BAD_REQUEST);
        }
    };

    info!(
        request_id = %request_id,
        file = pdf.file_name.as_deref().unwrap_or("-"),
        bytes = pdf.bytes.len(),
        "upload_route: received"
    );

    let text = match extract_text(pdf.bytes).await {
        Ok(text) => text,
        Err(details) => {
            error!(request_id = %request_id, %details, "upload_route: extraction failed");
            return ApiResponse::<()>::error(MSG_FAILED)
                .with_details(details)
                .into_response_with_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    match state.rag.ingest_text(&text).await {
        Ok(stats) => {
            info!(
                request_id = %request_id,
                chunks = stats.chunks,
                took_ms = stats.took_ms,
                "upload_route: stored"
            );
            ApiResponse::success(UploadResponse {
                message: MSG_STORED,
                chunks: stats.chunks,
            })
            .into_response_with_status(StatusCode::OK)
        }
        Err(RagBaseError::NoExtractableText) => {
            info!(request_id = %request_id, "upload_route: no extractable text");
            ApiResponse::<()>::error(MSG_NO_TEXT).into_response_with_status(StatusCode::OK)
        }
        Err(err) => {
            error!(request_id = %request_id, error = %err, "upload_route: ingest failed");
            ApiResponse::<()>::error(MSG_FAILED)
                .with_details(err.to_string())
                .into_response_with_status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

struct PdfUpload {
    file_name: Option<String>,
    bytes: Bytes,
}

enum FormError {
    /// Body exceeded the upload limit.
    TooLarge(String),
    Malformed(String),
}

impl From<MultipartError> for FormError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            FormError::TooLarge(e.body_text())
        } else {
            FormError::Malformed(e.body_text())
        }
    }
}

/// First `pdf` field of the form, other fields are skipped.
async fn read_pdf_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Option<PdfUpload>, FormError> {
    let mut multipart = multipart.map_err(|e| FormError::Malformed(e.body_text()))?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PDF_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(PdfUpload { file_name, bytes }));
    }
    Ok(None)
}

/// PDF parsing is CPU-bound and may panic on malformed input; both are contained here.
async fn extract_text(bytes: Bytes) -> Result<String, String> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| format!("pdf extraction aborted: {e}"))?
        .map_err(|e| format!("pdf extraction failed: {e}"))
}
