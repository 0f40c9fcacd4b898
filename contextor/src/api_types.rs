//! Public API types re-used by external crates (e.g., the HTTP API layer).

use futures::stream::BoxStream;
use serde_json::Value;

use crate::message::ChatMessage;

/// One chat request as received from a client.
///
/// # Example
/// ```
/// use contextor::{ChatTurn, message::ChatMessage};
/// let turn = ChatTurn {
///     messages: vec![ChatMessage::user("What is the return policy?")],
///     model: None,
/// };
/// assert_eq!(turn.messages.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ChatTurn {
    pub messages: Vec<ChatMessage>,
    /// Caller-selected model; the backend default is used when `None`.
    pub model: Option<String>,
}

/// Incremental output of a chat turn, in emission order.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    /// Piece of assistant text.
    TextDelta(String),
    /// The model invoked a tool with these (parsed) arguments.
    ToolInput {
        call_id: String,
        tool_name: String,
        input: Value,
    },
    /// Result fed back to the model for `call_id`.
    ToolOutput { call_id: String, output: Value },
    /// Upstream failed mid-stream; nothing follows.
    Error(String),
}

/// Stream of [`ChatEvent`]s; dropping it aborts upstream generation.
pub type ChatEventStream = BoxStream<'static, ChatEvent>;
