//! UI-message-stream framing of [`ChatEvent`]s.
//!
//! Frame order: `start`, then per text block `text-start` / `text-delta`* /
//! `text-end`, tool frames in between, optional `error`, `finish` and the
//! literal `[DONE]`.

use std::convert::Infallible;

use async_stream::stream;
use axum::response::sse::Event;
use contextor::{ChatEvent, ChatEventStream};
use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use uuid::Uuid;

pub const UI_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";
pub const UI_STREAM_VERSION: &str = "v1";
pub const DONE_MARKER: &str = "[DONE]";

/// Turns chat events into UI-message-stream JSON frames.
#[derive(Debug)]
pub struct UiMessageEncoder {
    message_id: String,
    open_text: Option<String>,
    blocks: usize,
}

impl UiMessageEncoder {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            open_text: None,
            blocks: 0,
        }
    }

    pub fn start(&self) -> Value {
        json!({ "type": "start", "messageId": self.message_id })
    }

    pub fn push(&mut self, event: ChatEvent) -> Vec<Value> {
        let mut out = Vec::new();
        match event {
            ChatEvent::TextDelta(delta) => {
                if delta.is_empty() {
                    return out;
                }
                let id = match &self.open_text {
                    Some(id) => id.clone(),
                    None => {
                        let id = format!("{}-text-{}", self.message_id, self.blocks);
                        self.blocks += 1;
                        out.push(json!({ "type": "text-start", "id": id }));
                        self.open_text = Some(id.clone());
                        id
                    }
                };
                out.push(json!({ "type": "text-delta", "id": id, "delta": delta }));
            }
            ChatEvent::ToolInput {
                call_id,
                tool_name,
                input,
            } => {
                self.close_text(&mut out);
                out.push(json!({
                    "type": "tool-input-available",
                    "toolCallId": call_id,
                    "toolName": tool_name,
                    "input": input,
                }));
            }
            ChatEvent::ToolOutput { call_id, output } => {
                out.push(json!({
                    "type": "tool-output-available",
                    "toolCallId": call_id,
                    "output": output,
                }));
            }
            ChatEvent::Error(text) => {
                self.close_text(&mut out);
                out.push(json!({ "type": "error", "errorText": text }));
            }
        }
        out
    }

    pub fn finish(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        self.close_text(&mut out);
        out.push(json!({ "type": "finish" }));
        out
    }

    fn close_text(&mut self, out: &mut Vec<Value>) {
        if let Some(id) = self.open_text.take() {
            out.push(json!({ "type": "text-end", "id": id }));
        }
    }
}

fn frame(v: Value) -> Result<Event, Infallible> {
    Ok(Event::default().data(v.to_string()))
}

/// SSE body for one assistant message.
///
/// Dropping the returned stream drops `events` and with it the upstream body.
pub fn ui_message_stream(
    mut events: ChatEventStream,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let mut enc = UiMessageEncoder::new(format!("msg-{}", Uuid::new_v4().simple()));
    stream! {
        yield frame(enc.start());
        while let Some(ev) = events.next().await {
            for v in enc.push(ev) {
                yield frame(v);
            }
        }
        for v in enc.finish() {
            yield frame(v);
        }
        yield Ok(Event::default().data(DONE_MARKER));
    }
}
