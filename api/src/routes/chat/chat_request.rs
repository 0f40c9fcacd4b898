use contextor::{ChatTurn, message::ChatMessage};
use serde::Deserialize;

/// `POST /api/chat` body.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    /// Missing and empty are both rejected by the pipeline.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub data: Option<ChatRequestData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequestData {
    #[serde(default)]
    pub model: Option<String>,
}

impl ChatRequest {
    /// `data.model` wins over `model`; blank names count as unset.
    pub fn into_turn(self) -> ChatTurn {
        let model = self
            .data
            .and_then(|d| d.model)
            .filter(|m| !m.trim().is_empty())
            .or(self.model.filter(|m| !m.trim().is_empty()));
        ChatTurn {
            messages: self.messages,
            model,
        }
    }
}
