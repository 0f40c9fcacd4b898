//! Fakes shared by the unit tests of this crate.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use ai_llm_service::chat_types::{ChatDelta, ChatRequest, ChatStream};
use ai_llm_service::error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind};
use futures::stream;
use rag_base::RagService;
use rag_base::embedding::EmbeddingsProvider;
use rag_base::errors::rag_base_error::RagBaseError;
use rag_base::inmemory::InMemoryVectorStore;
use rag_base::structs::rag_base_config::{EmbeddingConfig, RagConfig, StoreBackend, StoreConfig};

use crate::llm::ChatModel;

pub const DIM: usize = 64;

/// Letter-bucket embedder: texts sharing characters land close together.
pub struct CharEmbedder;

impl EmbeddingsProvider for CharEmbedder {
    fn embed_batch<'a>(
        &'a self,
        inputs: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, RagBaseError>> + Send + 'a>> {
        Box::pin(async move {
            Ok(inputs
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; DIM];
                    for c in t.to_lowercase().chars().filter(|c| c.is_alphanumeric()) {
                        v[(c as usize) % DIM] += 1.0;
                    }
                    v
                })
                .collect())
        })
    }
}

/// In-memory knowledge base seeded with `docs` (one chunk each).
pub async fn rag_with(docs: &[&str]) -> RagService {
    let cfg = RagConfig {
        embedding: EmbeddingConfig { dim: DIM },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        },
        ..RagConfig::default()
    };
    let rag = RagService::new(
        cfg,
        Arc::new(CharEmbedder),
        Arc::new(InMemoryVectorStore::new(DIM)),
    )
    .unwrap();
    for d in docs {
        rag.ingest_text(d).await.unwrap();
    }
    rag
}

/// Chat model replaying one scripted delta list per call.
pub struct FakeChat {
    scripts: Mutex<Vec<Vec<ChatDelta>>>,
    seen: Mutex<Vec<ChatRequest>>,
    fail_setup: bool,
    trailing_error: bool,
}

impl FakeChat {
    pub fn scripted(scripts: Vec<Vec<ChatDelta>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().rev().collect()),
            seen: Mutex::new(Vec::new()),
            fail_setup: false,
            trailing_error: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_setup: true,
            ..Self::scripted(Vec::new())
        }
    }

    pub fn with_trailing_error(mut self) -> Self {
        self.trailing_error = true;
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.seen.lock().unwrap().clone()
    }
}

fn upstream_error(msg: &str) -> AiLlmError {
    ProviderError::new(Provider::OpenRouter, ProviderErrorKind::Stream(msg.into())).into()
}

impl ChatModel for FakeChat {
    fn stream_chat<'a>(
        &'a self,
        req: ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatStream, AiLlmError>> + Send + 'a>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(req);
            if self.fail_setup {
                return Err(upstream_error("HTTP 401"));
            }
            let script = self.scripts.lock().unwrap().pop().unwrap_or_default();
            let mut items: Vec<Result<ChatDelta, AiLlmError>> =
                script.into_iter().map(Ok).collect();
            if self.trailing_error {
                items.push(Err(upstream_error("connection reset")));
            }
            let s: ChatStream = Box::pin(stream::iter(items));
            Ok(s)
        })
    }

    fn default_model(&self) -> &str {
        "fake-model"
    }
}
