//! RAG chat orchestration.
//!
//! Public API: [`ChatPipeline::run`]. It validates the conversation, pulls
//! context from `rag-base` (up front, or through the `searchKnowledgeBase`
//! tool), builds the system prompt, opens a streaming completion and hands
//! back a stream of [`ChatEvent`]s.

pub mod cfg;
mod error;
pub mod knowledge_tool;
pub mod llm;
pub mod message;
pub mod pipeline;
pub mod prompt;

mod api_types;

#[cfg(test)]
mod test_support;

pub use api_types::{ChatEvent, ChatEventStream, ChatTurn};

pub use error::ContextorError;

pub use cfg::{ChatMode, ContextorConfig};
pub use llm::ChatModel;
pub use pipeline::ChatPipeline;
