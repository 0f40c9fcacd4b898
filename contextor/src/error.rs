//! Typed error for the contextor crate.

use ai_llm_service::error_handler::AiLlmError;
use rag_base::errors::rag_base_error::RagBaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Request rejected before any I/O.
    #[error("{0}")]
    Validation(String),

    /// Errors from the retrieval layer (embedding, storage).
    #[error("RAG error: {0}")]
    Rag(#[from] RagBaseError),

    /// Errors from the chat model backend.
    #[error("LLM error: {0}")]
    Llm(#[from] AiLlmError),
}

impl ContextorError {
    pub(crate) fn validation(msg: &str) -> Self {
        ContextorError::Validation(msg.to_string())
    }
}
