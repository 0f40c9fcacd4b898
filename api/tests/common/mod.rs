#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use ai_llm_service::chat_types::{ChatDelta, ChatRequest, ChatStream, FinishReason};
use ai_llm_service::error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind};
use api::{core::app_state::AppState, router};
use contextor::{ChatModel, ContextorConfig};
use futures::stream;
use rag_base::RagService;
use rag_base::embedding::EmbeddingsProvider;
use rag_base::errors::rag_base_error::RagBaseError;
use rag_base::inmemory::InMemoryVectorStore;
use rag_base::structs::rag_base_config::{EmbeddingConfig, RagConfig, StoreBackend, StoreConfig};

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

/// Chat model that streams the same text for every call, or fails up front.
pub struct FakeChat {
    reply: Vec<String>,
    fail: bool,
    seen: Mutex<Vec<ChatRequest>>,
}

impl FakeChat {
    pub fn replying(parts: &[&str]) -> Self {
        Self {
            reply: parts.iter().map(|s| s.to_string()).collect(),
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying(&[])
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl ChatModel for FakeChat {
    fn stream_chat<'a>(
        &'a self,
        req: ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatStream, AiLlmError>> + Send + 'a>> {
        Box::pin(async move {
            self.seen.lock().unwrap().push(req);
            if self.fail {
                return Err(ProviderError::new(
                    Provider::OpenRouter,
                    ProviderErrorKind::Stream("HTTP 401 unauthorized".into()),
                )
                .into());
            }
            let mut items: Vec<Result<ChatDelta, AiLlmError>> = self
                .reply
                .iter()
                .map(|t| Ok(ChatDelta::Text(t.clone())))
                .collect();
            items.push(Ok(ChatDelta::Finish(FinishReason::Stop)));
            let s: ChatStream = Box::pin(stream::iter(items));
            Ok(s)
        })
    }

    fn default_model(&self) -> &str {
        "fake-model"
    }
}

pub struct TestServer {
    pub base: String,
    pub rag: Arc<RagService>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Memory-backed knowledge base seeded with `docs`, served on an ephemeral port.
pub async fn spawn_server(docs: &[&str], chat: Arc<FakeChat>) -> TestServer {
    spawn_server_with_limit(docs, chat, None).await
}

/// Like [`spawn_server`], with an optional upload body limit.
pub async fn spawn_server_with_limit(
    docs: &[&str],
    chat: Arc<FakeChat>,
    upload_max_bytes: Option<usize>,
) -> TestServer {
    let cfg = RagConfig {
        embedding: EmbeddingConfig { dim: DIM },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        },
        ..RagConfig::default()
    };
    let rag = Arc::new(
        RagService::new(
            cfg,
            Arc::new(CharEmbedder),
            Arc::new(InMemoryVectorStore::new(DIM)),
        )
        .expect("rag service"),
    );
    for d in docs {
        rag.ingest_text(d).await.expect("seed document");
    }

    let chat_cfg = ContextorConfig {
        search: rag.config().search,
        ..ContextorConfig::default()
    };
    let mut state = AppState::new(rag.clone(), chat, chat_cfg);
    if let Some(limit) = upload_max_bytes {
        state.upload_max_bytes = limit;
    }
    let state = Arc::new(state);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    TestServer {
        base: format!("http://{addr}"),
        rag,
        handle,
    }
}

/// JSON payloads of all `data:` lines; `[DONE]` is returned as a string value.
pub fn sse_payloads(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|l| l.strip_prefix("data:"))
        .map(str::trim_start)
        .map(|d| {
            serde_json::from_str(d).unwrap_or_else(|_| serde_json::Value::String(d.to_string()))
        })
        .collect()
}
