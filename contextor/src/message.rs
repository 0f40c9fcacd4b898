//! Chat message model.
//!
//! Every incoming shape (plain string content, arrays of strings, `parts`
//! lists, legacy `attachments`) is normalized at deserialization into one
//! tagged union, so the pipeline never inspects raw JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Attachment {
        name: String,
        #[serde(rename = "contentType")]
        content_type: String,
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireMessage")]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<MessagePart>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![MessagePart::Text { text: text.into() }],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![MessagePart::Text { text: text.into() }],
        }
    }

    /// Text parts joined with a single space; attachments contribute nothing.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                MessagePart::Attachment { .. } => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True when at least one text part has non-whitespace content.
    pub fn has_text(&self) -> bool {
        self.content
            .iter()
            .any(|p| matches!(p, MessagePart::Text { text } if !text.trim().is_empty()))
    }
}

/* ----------------------------- wire shapes ----------------------------- */

#[derive(Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    parts: Option<Vec<WireItem>>,
    #[serde(default, alias = "experimental_attachments")]
    attachments: Vec<WirePart>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Items(Vec<WireItem>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireItem {
    Text(String),
    Part(WirePart),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "filename")]
    name: Option<String>,
    #[serde(default, alias = "contentType")]
    media_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl WirePart {
    fn into_part(self) -> Option<MessagePart> {
        match self.kind.as_deref() {
            Some("text") | None if self.text.is_some() => Some(MessagePart::Text {
                text: self.text.unwrap_or_default(),
            }),
            Some("file" | "attachment" | "image") | None => {
                let url = self.url?;
                Some(MessagePart::Attachment {
                    name: self.name.unwrap_or_default(),
                    content_type: self
                        .media_type
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                    url,
                })
            }
            // step markers, reasoning, tool parts, ...
            _ => None,
        }
    }
}

impl WireItem {
    fn into_part(self) -> Option<MessagePart> {
        match self {
            WireItem::Text(text) => Some(MessagePart::Text { text }),
            WireItem::Part(p) => p.into_part(),
        }
    }
}

impl From<WireMessage> for ChatMessage {
    fn from(w: WireMessage) -> Self {
        // `parts` is authoritative when present; older clients mirror it in `content`.
        let mut content: Vec<MessagePart> = match (w.parts, w.content) {
            (Some(parts), _) if !parts.is_empty() => {
                parts.into_iter().filter_map(WireItem::into_part).collect()
            }
            (_, Some(WireContent::Text(text))) => vec![MessagePart::Text { text }],
            (_, Some(WireContent::Items(items))) => {
                items.into_iter().filter_map(WireItem::into_part).collect()
            }
            _ => Vec::new(),
        };

        content.extend(w.attachments.into_iter().filter_map(|mut a| {
            a.kind = Some("attachment".into());
            a.into_part()
        }));

        ChatMessage {
            role: w.role,
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> ChatMessage {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn string_content_is_one_text_part() {
        let m = parse(json!({"role": "user", "content": "What is the return policy?"}));
        assert_eq!(m.role, Role::User);
        assert_eq!(m.text(), "What is the return policy?");
    }

    #[test]
    fn array_content_is_joined_with_spaces() {
        let m = parse(json!({"role": "user", "content": ["return", {"type": "text", "text": "policy"}]}));
        assert_eq!(m.text(), "return policy");
    }

    #[test]
    fn parts_win_over_content_and_unknown_parts_are_dropped() {
        let m = parse(json!({
            "role": "user",
            "content": "dup",
            "parts": [
                {"type": "step-start"},
                {"type": "text", "text": "hello"},
                {"type": "file", "mediaType": "application/pdf", "filename": "a.pdf", "url": "data:x"}
            ]
        }));
        assert_eq!(m.content.len(), 2);
        assert_eq!(m.text(), "hello");
        assert_eq!(
            m.content[1],
            MessagePart::Attachment {
                name: "a.pdf".into(),
                content_type: "application/pdf".into(),
                url: "data:x".into()
            }
        );
    }

    #[test]
    fn legacy_attachments_are_appended() {
        let m = parse(json!({
            "role": "user",
            "content": "see file",
            "experimental_attachments": [{"name": "p.png", "contentType": "image/png", "url": "https://x/p.png"}]
        }));
        assert_eq!(m.content.len(), 2);
        assert!(matches!(m.content[1], MessagePart::Attachment { ref content_type, .. } if content_type == "image/png"));
    }

    #[test]
    fn attachment_only_message_has_no_text() {
        let m = parse(json!({
            "role": "user",
            "attachments": [{"name": "p.png", "contentType": "image/png", "url": "u"}]
        }));
        assert!(!m.has_text());
        assert_eq!(m.text(), "");

        let empty = parse(json!({"role": "user", "content": "   "}));
        assert!(!empty.has_text());
    }

    #[test]
    fn serializes_as_tagged_union() {
        let v = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(v, json!({"role": "user", "content": [{"type": "text", "text": "hi"}]}));
    }
}
