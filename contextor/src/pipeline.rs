//! Chat orchestration.
//!
//! Single mode: validate → extract query → search → assemble prompt →
//! open upstream stream → forward text deltas.
//!
//! Tool mode: the model gets the history plus `searchKnowledgeBase`; each
//! tool call re-runs the search and feeds the context back, for at most
//! `max_steps` model calls. Tools are withheld on the last step so the
//! model has to answer.

use std::sync::Arc;

use ai_llm_service::chat_types::{
    ChatDelta, ChatRequest, ChatStream, LlmMessage, ToolCallAccumulator, ToolDefinition,
};
use futures::StreamExt;
use rag_base::RagService;
use tracing::{debug, info, warn};

use crate::api_types::{ChatEvent, ChatEventStream, ChatTurn};
use crate::cfg::{ChatMode, ContextorConfig};
use crate::error::ContextorError;
use crate::knowledge_tool::{execute_tool, parse_tool_input, search_tool_definition};
use crate::llm::ChatModel;
use crate::message::{ChatMessage, Role};
use crate::prompt::{build_system_prompt, build_tool_system_prompt, format_context};

pub const ERR_EMPTY_MESSAGES: &str = "Messages array is required and must not be empty";
pub const ERR_NO_USER_MESSAGE: &str = "No user message found";

/// Request-scoped orchestrator; cheap to share behind `Arc`.
pub struct ChatPipeline {
    llm: Arc<dyn ChatModel>,
    rag: Arc<RagService>,
    cfg: ContextorConfig,
}

impl ChatPipeline {
    pub fn new(llm: Arc<dyn ChatModel>, rag: Arc<RagService>, cfg: ContextorConfig) -> Self {
        Self { llm, rag, cfg }
    }

    /// Runs one chat turn.
    ///
    /// Returns once the upstream model accepted the first request; everything
    /// after that is delivered through the stream, including mid-stream
    /// failures as [`ChatEvent::Error`].
    ///
    /// # Errors
    /// - `Validation` for an empty history or a missing user question
    /// - `Rag` / `Llm` when retrieval or the first upstream call fails
    pub async fn run(&self, turn: ChatTurn) -> Result<ChatEventStream, ContextorError> {
        let query = extract_query(&turn.messages)?;
        let model = turn
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.llm.default_model().to_string());

        info!(
            target: "contextor::chat",
            mode = ?self.cfg.mode,
            model = %model,
            messages = turn.messages.len(),
            query_len = query.len(),
            "chat turn"
        );

        match self.cfg.mode {
            ChatMode::Single => self.run_single(query, model).await,
            ChatMode::Tools => self.run_tools(&turn.messages, model).await,
        }
    }

    async fn run_single(
        &self,
        query: String,
        model: String,
    ) -> Result<ChatEventStream, ContextorError> {
        let results = self
            .rag
            .search(
                &query,
                Some(self.cfg.search.top_k),
                Some(self.cfg.search.min_similarity),
            )
            .await?;

        info!(
            target: "contextor::chat",
            results = results.len(),
            "retrieved context"
        );

        let system = build_system_prompt(&format_context(&results), &model);
        let req = ChatRequest {
            model: Some(model),
            messages: vec![LlmMessage::system(system), LlmMessage::user(query)],
            tools: Vec::new(),
        };

        let upstream = self.llm.stream_chat(req).await?;
        Ok(text_events(upstream))
    }

    async fn run_tools(
        &self,
        messages: &[ChatMessage],
        model: String,
    ) -> Result<ChatEventStream, ContextorError> {
        let mut history = vec![LlmMessage::system(build_tool_system_prompt(&model))];
        history.extend(messages.iter().filter_map(to_llm_message));

        let max_steps = self.cfg.max_steps.max(1);
        let tools = vec![search_tool_definition()];

        let first = self
            .llm
            .stream_chat(ChatRequest {
                model: Some(model.clone()),
                messages: history.clone(),
                tools: tools_for_step(&tools, 0, max_steps),
            })
            .await?;

        let llm = Arc::clone(&self.llm);
        let rag = Arc::clone(&self.rag);
        let search = self.cfg.search;

        let stream = async_stream::stream! {
            let mut pending = Some(first);

            for step in 0..max_steps {
                let mut upstream = match pending.take() {
                    Some(s) => s,
                    None => {
                        let req = ChatRequest {
                            model: Some(model.clone()),
                            messages: history.clone(),
                            tools: tools_for_step(&tools, step, max_steps),
                        };
                        match llm.stream_chat(req).await {
                            Ok(s) => s,
                            Err(e) => {
                                warn!(target: "contextor::chat", step, error = %e, "follow-up model call failed");
                                yield ChatEvent::Error(e.to_string());
                                break;
                            }
                        }
                    }
                };

                let mut text = String::new();
                let mut calls = ToolCallAccumulator::default();
                let mut failed = false;

                while let Some(item) = upstream.next().await {
                    match item {
                        Ok(ChatDelta::Text(t)) => {
                            text.push_str(&t);
                            yield ChatEvent::TextDelta(t);
                        }
                        Ok(ChatDelta::ToolCall(d)) => calls.push(d),
                        Ok(ChatDelta::Finish(reason)) => {
                            debug!(target: "contextor::chat", step, ?reason, "step finished");
                        }
                        Err(e) => {
                            warn!(target: "contextor::chat", step, error = %e, "upstream stream failed");
                            yield ChatEvent::Error(e.to_string());
                            failed = true;
                            break;
                        }
                    }
                }

                if failed || calls.is_empty() {
                    break;
                }
                if step + 1 == max_steps {
                    warn!(target: "contextor::chat", max_steps, "step limit reached with pending tool calls");
                    break;
                }

                let calls = calls.finish();
                history.push(LlmMessage::assistant_tool_calls(Some(text), calls.clone()));

                for call in calls {
                    let input = parse_tool_input(&call.function.arguments);
                    yield ChatEvent::ToolInput {
                        call_id: call.id.clone(),
                        tool_name: call.function.name.clone(),
                        input: input.clone(),
                    };

                    let outcome = execute_tool(&rag, &search, &call.function.name, &input).await;
                    yield ChatEvent::ToolOutput {
                        call_id: call.id.clone(),
                        output: outcome.output,
                    };
                    history.push(LlmMessage::tool_result(call.id, outcome.content));
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Validates the history and returns the last user message's text.
///
/// # Errors
/// `Validation` with the client-facing message.
pub fn extract_query(messages: &[ChatMessage]) -> Result<String, ContextorError> {
    if messages.is_empty() {
        return Err(ContextorError::validation(ERR_EMPTY_MESSAGES));
    }
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .filter(|m| m.has_text())
        .map(ChatMessage::text)
        .ok_or_else(|| ContextorError::validation(ERR_NO_USER_MESSAGE))
}

fn tools_for_step(tools: &[ToolDefinition], step: usize, max_steps: usize) -> Vec<ToolDefinition> {
    if step + 1 < max_steps {
        tools.to_vec()
    } else {
        Vec::new()
    }
}

fn to_llm_message(m: &ChatMessage) -> Option<LlmMessage> {
    if !m.has_text() {
        return None;
    }
    match m.role {
        Role::User => Some(LlmMessage::user(m.text())),
        Role::Assistant => Some(LlmMessage::assistant(m.text())),
        Role::System => Some(LlmMessage::system(m.text())),
        // Tool results need the originating call id, which clients do not send back.
        Role::Tool => None,
    }
}

/// Forwards text deltas; the first upstream error ends the stream.
fn text_events(mut upstream: ChatStream) -> ChatEventStream {
    Box::pin(async_stream::stream! {
        while let Some(item) = upstream.next().await {
            match item {
                Ok(ChatDelta::Text(t)) => yield ChatEvent::TextDelta(t),
                Ok(_) => {}
                Err(e) => {
                    warn!(target: "contextor::chat", error = %e, "upstream stream failed");
                    yield ChatEvent::Error(e.to_string());
                    break;
                }
            }
        }
    })
}
