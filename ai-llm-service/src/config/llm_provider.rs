use std::str::FromStr;

use crate::error_handler::{ConfigError, Provider};

/// Hosted backend used for chat completions and embeddings.
///
/// Both speak the OpenAI REST dialect (`/chat/completions`, `/embeddings`,
/// `/models`); they differ in the default base URL and the API-key variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// OpenRouter gateway (`https://openrouter.ai/api/v1`).
    OpenRouter,
    /// OpenAI API (`https://api.openai.com/v1`).
    OpenAI,
}

impl LlmProvider {
    /// Base URL used when `LLM_BASE_URL` is not set.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => "https://openrouter.ai/api/v1",
            LlmProvider::OpenAI => "https://api.openai.com/v1",
        }
    }

    /// Environment variable holding the API key for this provider.
    pub fn api_key_var(self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Tag used in errors and logs.
    pub fn tag(self) -> Provider {
        match self {
            LlmProvider::OpenRouter => Provider::OpenRouter,
            LlmProvider::OpenAI => Provider::OpenAI,
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openrouter" | "open_router" => Ok(LlmProvider::OpenRouter),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
