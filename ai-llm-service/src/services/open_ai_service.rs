//! OpenAI-dialect service (OpenRouter / OpenAI) for streaming chat and embeddings.
//!
//! Endpoints are derived from `LlmModelConfig::endpoint` (an API base URL):
//! - POST {endpoint}/chat/completions: chat completion with `stream: true` (SSE)
//! - POST {endpoint}/embeddings: batched embeddings retrieval
//!
//! Constructor validation:
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://
//!
//! Errors are normalized via unified error types in `error_handler`.

use std::time::{Duration, Instant};

use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    chat_types::{
        ChatDelta, ChatRequest, ChatStream, FinishReason, LlmMessage, ToolCallDelta,
        ToolDefinition,
    },
    config::llm_model_config::LlmModelConfig,
    error_handler::{AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet},
};

/// Upper bound for establishing the TCP/TLS connection.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Thin client for an OpenAI-compatible REST API.
///
/// Constructed from a complete [`LlmModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (connect timeout and default headers) that
/// is reused for every call.
///
/// `timeout_secs` bounds an embeddings call end to end, but only the
/// request/response-headers phase of a chat stream: a generation that keeps
/// sending tokens is never cut off.
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    timeout: Duration,
    provider: Provider,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `MissingApiKey` if `cfg.api_key` is `None`
    /// - [`AiLlmError::Provider`] with `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let provider = cfg.provider.tag();

        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::new(provider, ProviderErrorKind::MissingApiKey))?;

        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ProviderError::new(
                provider,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                ProviderError::new(
                    provider,
                    ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
                )
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(CONNECT_TIMEOUT_SECS)))
            .default_headers(headers)
            .build()?;

        let base = endpoint.trim_end_matches('/').to_string();
        let url_chat = format!("{}/chat/completions", base);
        let url_embeddings = format!("{}/embeddings", base);

        info!(
            provider = %provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            timeout,
            provider,
            url_chat,
            url_embeddings,
        })
    }

    /// Starts a **streaming** chat completion (`/chat/completions`, `stream: true`).
    ///
    /// The HTTP request is sent and its status checked before returning, so
    /// upstream rejections surface here rather than mid-stream. The returned
    /// stream yields text and tool-call deltas as the provider emits them and
    /// ends after `[DONE]`.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::Timeout`] when the response headers do not arrive in time
    /// - [`AiLlmError::HttpTransport`] for client/network failures
    pub async fn chat_stream(&self, req: ChatRequest) -> Result<ChatStream, AiLlmError> {
        let started = Instant::now();
        let model = req.model.as_deref().unwrap_or(&self.cfg.model).to_string();
        let body = ChatCompletionRequest::from_cfg(&self.cfg, &model, &req.messages, &req.tools);

        debug!(
            model = %model,
            endpoint = %self.cfg.endpoint,
            messages = req.messages.len(),
            tools = req.tools.len(),
            "POST {}", self.url_chat
        );

        let send = self.client.post(&self.url_chat).json(&body).send();
        let resp = match tokio::time::timeout(self.timeout, send).await {
            Ok(res) => res?,
            Err(_) => {
                error!(
                    model = %model,
                    timeout_secs = self.timeout.as_secs(),
                    "/chat/completions did not answer in time"
                );
                return Err(AiLlmError::Timeout(self.timeout));
            }
        };

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %model,
                latency_ms = started.elapsed().as_millis(),
                "/chat/completions returned non-success status"
            );

            return Err(ProviderError::new(
                self.provider,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url,
                    snippet,
                }),
            )
            .into());
        }

        info!(
            model = %model,
            latency_ms = started.elapsed().as_millis(),
            "chat stream opened"
        );

        let provider = self.provider;
        let mut events = resp.bytes_stream().eventsource();

        let stream = async_stream::stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(ev) => ev,
                    Err(e) => {
                        warn!(error = %e, "chat stream broke off");
                        yield Err(ProviderError::new(
                            provider,
                            ProviderErrorKind::Stream(e.to_string()),
                        )
                        .into());
                        break;
                    }
                };

                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    break;
                }

                match decode_chunk(provider, data) {
                    Ok(deltas) => {
                        for d in deltas {
                            yield Ok(d);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    /// Retrieves embeddings for a batch of inputs via `/embeddings`.
    ///
    /// Items are re-ordered by their `index` so the output is parallel to
    /// `inputs`. Empty input returns an empty vector without a network call.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::Provider`] with `EmbeddingCount` if the batch sizes differ
    /// - [`AiLlmError::Provider`] with `Decode` if the JSON cannot be parsed
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input: inputs,
        };

        debug!(
            model = %self.cfg.model,
            batch = inputs.len(),
            "POST {}", self.url_embeddings
        );

        let resp = self
            .client
            .post(&self.url_embeddings)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_embeddings.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "/embeddings returned non-success status"
            );

            return Err(ProviderError::new(
                self.provider,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url,
                    snippet,
                }),
            )
            .into());
        }

        let text = resp.text().await?;
        let vectors = decode_embeddings(self.provider, &text, inputs.len())?;

        info!(
            model = %self.cfg.model,
            batch = inputs.len(),
            dim = vectors.first().map(Vec::len).unwrap_or(0),
            latency_ms = started.elapsed().as_millis(),
            "embeddings completed"
        );

        Ok(vectors)
    }
}

/* ===========================================================================
Decoding
======================================================================== */

/// Decodes one SSE `data:` payload into deltas.
///
/// An `error` object in the payload (OpenRouter reports mid-stream failures
/// this way) becomes a `Stream` error.
pub(crate) fn decode_chunk(provider: Provider, data: &str) -> Result<Vec<ChatDelta>, AiLlmError> {
    let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
        ProviderError::new(
            provider,
            ProviderErrorKind::Decode(format!("stream chunk: {e}; data: {}", make_snippet(data))),
        )
    })?;

    if let Some(err) = chunk.error {
        return Err(ProviderError::new(provider, ProviderErrorKind::Stream(err.message)).into());
    }

    let mut out = Vec::new();
    for choice in chunk.choices {
        if let Some(delta) = choice.delta {
            if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
                out.push(ChatDelta::Text(text));
            }
            for (pos, tc) in delta.tool_calls.unwrap_or_default().into_iter().enumerate() {
                let (name, arguments) = match tc.function {
                    Some(f) => (f.name, f.arguments.unwrap_or_default()),
                    None => (None, String::new()),
                };
                out.push(ChatDelta::ToolCall(ToolCallDelta {
                    index: tc.index.unwrap_or(pos),
                    id: tc.id,
                    name,
                    arguments,
                }));
            }
        }
        if let Some(reason) = choice.finish_reason {
            out.push(ChatDelta::Finish(FinishReason::from(reason.as_str())));
        }
    }
    Ok(out)
}

/// Decodes an `/embeddings` body into vectors ordered by `index`.
pub(crate) fn decode_embeddings(
    provider: Provider,
    body: &str,
    want: usize,
) -> Result<Vec<Vec<f32>>, AiLlmError> {
    let mut out: EmbeddingsResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::new(
            provider,
            ProviderErrorKind::Decode(format!("serde error: {e}; expected `data[].embedding`")),
        )
    })?;

    if out.data.len() != want {
        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::EmbeddingCount {
                got: out.data.len(),
                want,
            },
        )
        .into());
    }

    out.data.sort_by_key(|item| item.index);
    Ok(out.data.into_iter().map(|item| item.embedding).collect())
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Request body for `/chat/completions` (always streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [LlmMessage],
    stream: bool,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_cfg(
        cfg: &'a LlmModelConfig,
        model: &'a str,
        messages: &'a [LlmMessage],
        tools: &'a [ToolDefinition],
    ) -> Self {
        Self {
            model,
            messages,
            stream: true,
            tools,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunction>,
}

#[derive(Debug, Deserialize)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Request body for `/embeddings`.
#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response body for `/embeddings`.
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::llm_provider::LlmProvider;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenRouter,
            model: "m".into(),
            endpoint: "https://openrouter.ai/api/v1/".into(),
            api_key: Some("k".into()),
            max_tokens: None,
            temperature: Some(0.7),
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn new_rejects_missing_key_and_bad_endpoint() {
        let mut c = cfg();
        c.api_key = None;
        assert!(OpenAiService::new(c).is_err());

        let mut c = cfg();
        c.endpoint = "ftp://x".into();
        assert!(OpenAiService::new(c).is_err());
    }

    #[test]
    fn new_derives_urls_from_base() {
        let svc = OpenAiService::new(cfg()).unwrap();
        assert_eq!(svc.url_chat, "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(svc.url_embeddings, "https://openrouter.ai/api/v1/embeddings");
    }

    #[test]
    fn decode_text_and_finish() {
        let d = decode_chunk(
            Provider::OpenRouter,
            r#"{"choices":[{"delta":{"content":"30 days"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(d, vec![ChatDelta::Text("30 days".into())]);

        let d = decode_chunk(
            Provider::OpenRouter,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(d, vec![ChatDelta::Finish(FinishReason::Stop)]);
    }

    #[test]
    fn decode_tool_call_fragment() {
        let d = decode_chunk(
            Provider::OpenAI,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"searchKnowledgeBase","arguments":"{\"q"}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            d,
            vec![ChatDelta::ToolCall(ToolCallDelta {
                index: 0,
                id: Some("call_1".into()),
                name: Some("searchKnowledgeBase".into()),
                arguments: "{\"q".into(),
            })]
        );
    }

    #[test]
    fn decode_error_payload_is_stream_error() {
        let err = decode_chunk(
            Provider::OpenRouter,
            r#"{"error":{"message":"rate limited","code":429}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn embeddings_are_reordered_by_index() {
        let body = r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#;
        let v = decode_embeddings(Provider::OpenRouter, body, 2).unwrap();
        assert_eq!(v, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn embeddings_count_mismatch_is_rejected() {
        let body = r#"{"data":[{"index":0,"embedding":[1.0]}]}"#;
        let err = decode_embeddings(Provider::OpenRouter, body, 2).unwrap_err();
        assert!(err.to_string().contains("got 1, want 2"));
    }

    /// One-shot HTTP server: reads a request, then writes `head` and each
    /// `chunks` item `gap_ms` apart before closing.
    async fn slow_server(head: &'static str, chunks: Vec<String>, gap_ms: u64) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut tmp = [0u8; 4096];
            loop {
                let n = sock.read(&mut tmp).await.unwrap();
                buf.extend_from_slice(&tmp[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let len = text
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + len {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            if head.is_empty() {
                tokio::time::sleep(Duration::from_secs(30)).await;
                return;
            }
            sock.write_all(head.as_bytes()).await.unwrap();
            for c in chunks {
                tokio::time::sleep(Duration::from_millis(gap_ms)).await;
                sock.write_all(c.as_bytes()).await.unwrap();
                sock.flush().await.unwrap();
            }
            sock.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    const SSE_HEAD: &str =
        "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";

    #[tokio::test]
    async fn active_stream_outlives_the_request_timeout() {
        let mut chunks: Vec<String> = (0..4)
            .map(|i| format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"tok{i} \"}}}}]}}\n\n"))
            .collect();
        chunks.push("data: [DONE]\n\n".to_string());
        let endpoint = slow_server(SSE_HEAD, chunks, 700).await;

        let mut c = cfg();
        c.endpoint = endpoint;
        c.timeout_secs = Some(1);
        let svc = OpenAiService::new(c).unwrap();

        let mut stream = svc
            .chat_stream(ChatRequest {
                messages: vec![LlmMessage::user("hi")],
                ..Default::default()
            })
            .await
            .unwrap();

        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            match delta.unwrap() {
                ChatDelta::Text(t) => text.push_str(&t),
                other => panic!("unexpected delta {other:?}"),
            }
        }
        assert_eq!(text, "tok0 tok1 tok2 tok3 ");
    }

    #[tokio::test]
    async fn silent_upstream_times_out_before_streaming() {
        let endpoint = slow_server("", Vec::new(), 0).await;

        let mut c = cfg();
        c.endpoint = endpoint;
        c.timeout_secs = Some(1);
        let svc = OpenAiService::new(c).unwrap();

        let err = svc
            .chat_stream(ChatRequest {
                messages: vec![LlmMessage::user("hi")],
                ..Default::default()
            })
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AiLlmError::Timeout(d) if d == Duration::from_secs(1)));
    }

    #[test]
    fn request_body_omits_empty_tools() {
        let c = cfg();
        let msgs = vec![LlmMessage::user("hi")];
        let body = ChatCompletionRequest::from_cfg(&c, "m", &msgs, &[]);
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["stream"], true);
        assert!(v.get("tools").is_none());
        assert_eq!(v["messages"][0]["role"], "user");
    }
}
