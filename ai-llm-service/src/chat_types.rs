//! Provider-neutral chat types: messages, tool definitions, and stream deltas.
//!
//! These map 1:1 onto the OpenAI chat-completions dialect that both OpenRouter
//! and OpenAI accept, so they are serialized as-is into request bodies.

use std::collections::BTreeMap;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error_handler::AiLlmError;

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One message sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmMessage {
    pub role: ChatRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl LlmMessage {
    fn plain(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(ChatRole::Assistant, content)
    }

    /// Assistant turn that requested tool invocations (text may be empty).
    pub fn assistant_tool_calls(text: Option<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: text.filter(|t| !t.is_empty()),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// Result of a tool invocation, linked by `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// A completed tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// Function tool advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            kind: "function",
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// A streaming chat request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Model override; the profile default is used when `None`.
    pub model: Option<String>,
    pub messages: Vec<LlmMessage>,
    /// Tools offered for this call; empty means plain completion.
    pub tools: Vec<ToolDefinition>,
}

/// Why the model stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(s: &str) -> Self {
        match s {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// Fragment of a tool call as it arrives over the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

/// Incremental piece of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatDelta {
    Text(String),
    ToolCall(ToolCallDelta),
    Finish(FinishReason),
}

/// Stream of deltas; dropping it closes the upstream HTTP body.
pub type ChatStream = BoxStream<'static, Result<ChatDelta, AiLlmError>>;

/// Assembles [`ToolCallDelta`] fragments into complete [`ToolCall`]s.
///
/// Fragments are keyed by their stream `index`; `id` and `name` arrive once,
/// `arguments` arrive as string pieces that are concatenated in order.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    parts: BTreeMap<usize, (Option<String>, String, String)>,
}

impl ToolCallAccumulator {
    pub fn push(&mut self, delta: ToolCallDelta) {
        let entry = self
            .parts
            .entry(delta.index)
            .or_insert_with(|| (None, String::new(), String::new()));
        if let Some(id) = delta.id {
            entry.0 = Some(id);
        }
        if let Some(name) = delta.name {
            entry.1.push_str(&name);
        }
        entry.2.push_str(&delta.arguments);
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns the assembled calls ordered by stream index.
    ///
    /// Calls without an id get a synthetic `call_<index>` id.
    pub fn finish(self) -> Vec<ToolCall> {
        self.parts
            .into_iter()
            .map(|(index, (id, name, arguments))| ToolCall {
                id: id.unwrap_or_else(|| format!("call_{index}")),
                kind: "function",
                function: FunctionCall {
                    name,
                    arguments: if arguments.trim().is_empty() {
                        "{}".to_string()
                    } else {
                        arguments
                    },
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_serialize_in_openai_shape() {
        let m = LlmMessage::tool_result("call_1", "[Document 1] x");
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(
            v,
            json!({"role": "tool", "content": "[Document 1] x", "tool_call_id": "call_1"})
        );

        let sys = serde_json::to_value(LlmMessage::system("hi")).unwrap();
        assert_eq!(sys, json!({"role": "system", "content": "hi"}));
    }

    #[test]
    fn accumulator_joins_fragments_by_index() {
        let mut acc = ToolCallAccumulator::default();
        acc.push(ToolCallDelta {
            index: 0,
            id: Some("call_a".into()),
            name: Some("searchKnowledgeBase".into()),
            arguments: "{\"que".into(),
        });
        acc.push(ToolCallDelta {
            index: 1,
            id: None,
            name: Some("other".into()),
            arguments: String::new(),
        });
        acc.push(ToolCallDelta {
            index: 0,
            id: None,
            name: None,
            arguments: "ry\":\"refunds\"}".into(),
        });

        let calls = acc.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].function.arguments, "{\"query\":\"refunds\"}");
        assert_eq!(calls[1].id, "call_1");
        assert_eq!(calls[1].function.arguments, "{}");
    }

    #[test]
    fn finish_reason_maps_known_values() {
        assert_eq!(FinishReason::from("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::from("stop"), FinishReason::Stop);
        assert_eq!(
            FinishReason::from("error"),
            FinishReason::Other("error".into())
        );
    }
}
