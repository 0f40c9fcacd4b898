//! Chat model seam used by the pipeline.

use std::{future::Future, pin::Pin};

use ai_llm_service::chat_types::{ChatRequest, ChatStream};
use ai_llm_service::error_handler::AiLlmError;
use ai_llm_service::service_profiles::LlmServiceProfiles;

/// Streaming chat backend.
///
/// The returned future resolves once the upstream accepted the request
/// (connection + status), so setup failures surface before any output.
pub trait ChatModel: Send + Sync {
    fn stream_chat<'a>(
        &'a self,
        req: ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatStream, AiLlmError>> + Send + 'a>>;

    /// Model used when the request does not name one.
    fn default_model(&self) -> &str;
}

impl ChatModel for LlmServiceProfiles {
    fn stream_chat<'a>(
        &'a self,
        req: ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatStream, AiLlmError>> + Send + 'a>> {
        Box::pin(self.chat_stream(req))
    }

    fn default_model(&self) -> &str {
        &self.profiles().0.model
    }
}
