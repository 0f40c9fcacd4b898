//! Shared LLM service with two active profiles: `chat` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::chat_types::{ChatRequest, LlmMessage};
//! use ai_llm_service::service_profiles::LlmServiceProfiles;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let svc = Arc::new(LlmServiceProfiles::from_env(Some(10))?);
//!
//!     let req = ChatRequest {
//!         messages: vec![LlmMessage::user("Hello")],
//!         ..Default::default()
//!     };
//!     let mut stream = svc.chat_stream(req).await?;
//!     while let Some(delta) = stream.next().await {
//!         println!("{:?}", delta?);
//!     }
//!
//!     let emb = svc.embed_batch(&["Ferris".to_string()]).await?;
//!     println!("Embedding dim = {}", emb[0].len());
//!     Ok(())
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    chat_types::{ChatRequest, ChatStream},
    config::{
        default_config::{config_chat, config_embedding},
        llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::open_ai_service::OpenAiService,
};

/// Shared service managing the **chat** and **embedding** profiles.
pub struct LlmServiceProfiles {
    chat: LlmModelConfig,
    embedding: LlmModelConfig,

    clients: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service from explicit profiles.
    pub fn new(
        chat: LlmModelConfig,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        Ok(Self {
            chat,
            embedding,
            clients: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Creates a new service from `config_chat()` / `config_embedding()`.
    pub fn from_env(health_timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        Self::new(config_chat()?, config_embedding()?, health_timeout_secs)
    }

    /// Opens a streaming completion on the **chat** profile.
    ///
    /// `req.model` overrides the profile model for this call only.
    pub async fn chat_stream(&self, req: ChatRequest) -> Result<ChatStream, AiLlmError> {
        let cli = self.client_for(&self.chat).await?;
        cli.chat_stream(req).await
    }

    /// Computes embeddings for a batch using the **embedding** profile.
    ///
    /// Output is parallel to `inputs`.
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        let cli = self.client_for(&self.embedding).await?;
        cli.embed_batch(inputs).await
    }

    /// Health snapshot for all distinct profiles.
    ///
    /// Chat and embedding sharing endpoint and model are checked once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = Vec::<LlmModelConfig>::with_capacity(2);
        list.push(self.chat.clone());
        if ClientKey::from(&self.embedding) != ClientKey::from(&self.chat) {
            list.push(self.embedding.clone());
        }
        self.health.check_many(&list).await
    }

    /// Returns references to the current profiles `(chat, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (&self.chat, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn client_for(&self, cfg: &LlmModelConfig) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.clients.read().await.get(&key).cloned() {
            return Ok(cli);
        }

        let mut w = self.clients.write().await;
        if let Some(cli) = w.get(&key).cloned() {
            return Ok(cli);
        }

        debug!(provider = %cfg.provider.tag(), model = %cfg.model, "creating LLM client");
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Cache key identifying unique client configs.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(model: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenRouter,
            model: model.into(),
            endpoint: "https://openrouter.ai/api/v1".into(),
            api_key: Some("k".into()),
            max_tokens: None,
            temperature: Some(0.7),
            top_p: None,
            timeout_secs: Some(30),
        }
    }

    #[tokio::test]
    async fn clients_are_cached_per_profile() {
        let svc = LlmServiceProfiles::new(profile("chat"), profile("embed"), Some(1)).unwrap();
        let a = svc.client_for(&svc.chat).await.unwrap();
        let b = svc.client_for(&svc.chat).await.unwrap();
        let c = svc.client_for(&svc.embedding).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(svc.clients.read().await.len(), 2);
    }

    #[tokio::test]
    async fn empty_batch_needs_no_network() {
        let svc = LlmServiceProfiles::new(profile("chat"), profile("embed"), Some(1)).unwrap();
        assert!(svc.embed_batch(&[]).await.unwrap().is_empty());
    }
}
