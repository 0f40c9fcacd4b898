use std::{env, sync::Arc};

use ai_llm_service::service_profiles::LlmServiceProfiles;
use contextor::{ChatModel, ChatPipeline, ContextorConfig};
use rag_base::{
    RagService, embedding::EmbeddingsProvider, structs::rag_base_config::RagConfig,
};
use tracing::info;

use crate::error_handler::AppError;

/// Default multipart body limit (20 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 20 * 1024 * 1024;

/// Shared state for all HTTP handlers.
///
/// Everything here is built once at startup and only read afterwards.
pub struct AppState {
    /// Knowledge base (chunker, embedder, vector store).
    pub rag: Arc<RagService>,
    /// Chat orchestration over `rag` and the chat model.
    pub pipeline: ChatPipeline,
    /// Hosted LLM profiles; `None` when running on injected fakes.
    pub llm: Option<Arc<LlmServiceProfiles>>,
    /// Maximum accepted request body for uploads.
    pub upload_max_bytes: usize,
}

impl AppState {
    /// Assembles state from pre-built parts (no provider health probes).
    pub fn new(rag: Arc<RagService>, chat: Arc<dyn ChatModel>, cfg: ContextorConfig) -> Self {
        Self {
            pipeline: ChatPipeline::new(chat, rag.clone(), cfg),
            rag,
            llm: None,
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
        }
    }

    /// Load shared state from environment variables.
    pub async fn from_env() -> Result<Self, AppError> {
        let llm = Arc::new(
            LlmServiceProfiles::from_env(None).map_err(|e| AppError::Config(e.to_string()))?,
        );

        let rag_cfg = RagConfig::from_env().map_err(|e| AppError::Config(e.to_string()))?;
        let search = rag_cfg.search;
        let embedder: Arc<dyn EmbeddingsProvider> = llm.clone();
        let rag = Arc::new(
            RagService::from_config(rag_cfg, embedder)
                .await
                .map_err(|e| AppError::Config(e.to_string()))?,
        );

        let chat_cfg =
            ContextorConfig::from_env(search).map_err(|e| AppError::Config(e.to_string()))?;
        let upload_max_bytes = upload_limit_from(env::var("UPLOAD_MAX_BYTES").ok())?;

        let (chat, embedding) = llm.profiles();
        info!(
            chat_model = %chat.model,
            embedding_model = %embedding.model,
            store = rag.backend(),
            mode = ?chat_cfg.mode,
            upload_max_bytes,
            "app state ready"
        );

        let chat_model: Arc<dyn ChatModel> = llm.clone();
        Ok(Self {
            pipeline: ChatPipeline::new(chat_model, rag.clone(), chat_cfg),
            rag,
            llm: Some(llm),
            upload_max_bytes,
        })
    }
}

fn upload_limit_from(raw: Option<String>) -> Result<usize, AppError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(DEFAULT_UPLOAD_MAX_BYTES),
        Some(v) => v
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| AppError::Config(format!("UPLOAD_MAX_BYTES: invalid value '{v}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_limit_parsing() {
        assert_eq!(upload_limit_from(None).unwrap(), DEFAULT_UPLOAD_MAX_BYTES);
        assert_eq!(upload_limit_from(Some(" ".into())).unwrap(), DEFAULT_UPLOAD_MAX_BYTES);
        assert_eq!(upload_limit_from(Some("1024".into())).unwrap(), 1024);
        assert!(upload_limit_from(Some("0".into())).is_err());
        assert!(upload_limit_from(Some("lots".into())).is_err());
    }
}
