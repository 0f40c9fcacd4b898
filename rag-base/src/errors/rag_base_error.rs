//! Unified error type for the rag-base crate.

use thiserror::Error;

/// Errors produced by the RAG base module.
#[derive(Debug, Error)]
pub enum RagBaseError {
    // ── Configuration / environment ──────────────────────────────────────────
    /// Required environment variable is missing.
    #[error("missing env variable: {key}")]
    EnvMissing { key: String },

    /// Failed to parse an environment variable into the expected type.
    #[error("failed to parse env variable: {key} = '{value}'")]
    EnvParse { key: String, value: String },

    /// Configuration combination is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input ───────────────────────────────────────────────────────────────
    /// Extracted text was empty or whitespace-only.
    #[error("no extractable text")]
    NoExtractableText,

    /// Caller input rejected before any I/O (e.g. empty query).
    #[error("{0}")]
    Validation(String),

    // ── Embeddings backend ──────────────────────────────────────────────────
    /// Embedding backend failed, or returned the wrong count/dimension.
    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    // ── Vector store ────────────────────────────────────────────────────────
    /// Database / store error.
    #[error("storage failed: {0}")]
    StorageFailed(String),
}

impl From<sqlx::Error> for RagBaseError {
    fn from(e: sqlx::Error) -> Self {
        RagBaseError::StorageFailed(e.to_string())
    }
}
