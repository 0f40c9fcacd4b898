use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::ContextorError;
use rag_base::errors::rag_base_error::RagBaseError;
use serde::Serialize;
use thiserror::Error;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("configuration error: {0}")]
    Config(String),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("{0}")]
    BadRequest(String),

    /// Embedding or LLM provider failed.
    #[error("{context}")]
    Upstream {
        context: &'static str,
        details: String,
    },

    /// Vector store failed.
    #[error("{context}")]
    Storage {
        context: &'static str,
        details: String,
    },
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Bind(_)
            | AppError::Server(_)
            | AppError::Upstream { .. }
            | AppError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Upstream { .. } => "UPSTREAM_ERROR",
            AppError::Storage { .. } => "STORAGE_ERROR",
        }
    }

    fn details(&self) -> Option<&str> {
        match self {
            AppError::Upstream { details, .. } | AppError::Storage { details, .. } => {
                Some(details.as_str())
            }
            _ => None,
        }
    }

    /// Maps a retrieval failure; `context` becomes the client-facing `error`.
    pub fn from_rag(context: &'static str, err: RagBaseError) -> Self {
        let details = err.to_string();
        match err {
            RagBaseError::Validation(msg) => AppError::BadRequest(msg),
            RagBaseError::NoExtractableText => AppError::BadRequest(details),
            RagBaseError::StorageFailed(_) => AppError::Storage { context, details },
            RagBaseError::EmbeddingFailed(_) => AppError::Upstream { context, details },
            RagBaseError::EnvMissing { .. }
            | RagBaseError::EnvParse { .. }
            | RagBaseError::InvalidConfig(_) => AppError::Config(details),
        }
    }

    /// Maps a chat pipeline failure; `context` becomes the client-facing `error`.
    pub fn from_chat(context: &'static str, err: ContextorError) -> Self {
        match err {
            ContextorError::Validation(msg) => AppError::BadRequest(msg),
            ContextorError::Rag(e) => AppError::from_rag(context, e),
            ContextorError::Llm(e) => AppError::Upstream {
                context,
                details: e.to_string(),
            },
        }
    }
}

/// Error body: `{ "error": ..., "code": ..., "details"?: ... }`.
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
            code: self.error_code(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_400_with_message() {
        let (status, body) = body_json(AppError::from_chat(
            "RAG processing failed",
            ContextorError::Validation("No user message found".into()),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No user message found");
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn upstream_and_storage_map_to_500_with_details() {
        let (status, body) = body_json(AppError::from_rag(
            "RAG processing failed",
            RagBaseError::EmbeddingFailed("HTTP 401".into()),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "RAG processing failed");
        assert_eq!(body["code"], "UPSTREAM_ERROR");
        assert_eq!(body["details"], "embedding generation failed: HTTP 401");

        let (_, body) = body_json(AppError::from_rag(
            "Search failed",
            RagBaseError::StorageFailed("pool timed out".into()),
        ))
        .await;
        assert_eq!(body["code"], "STORAGE_ERROR");
    }
}
