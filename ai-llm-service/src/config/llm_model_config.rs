use crate::config::llm_provider::LlmProvider;

/// Configuration for one hosted model profile (chat or embedding).
///
/// # Fields
///
/// - `provider`: which backend to talk to (OpenRouter, OpenAI).
/// - `model`: default model identifier; chat callers may override it per request.
/// - `endpoint`: API base URL, e.g. `https://openrouter.ai/api/v1`.
/// - `api_key`: bearer token for the provider.
/// - `max_tokens`: maximum number of tokens to generate (if supported).
/// - `temperature`: sampling temperature (0.0 = deterministic).
/// - `top_p`: nucleus sampling cutoff.
/// - `timeout_secs`: optional request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::OpenRouter,
///     model: "nvidia/nemotron-nano-12b-v2-vl:free".to_string(),
///     endpoint: "https://openrouter.ai/api/v1".to_string(),
///     api_key: Some("sk-or-...".to_string()),
///     max_tokens: None,
///     temperature: Some(0.7),
///     top_p: None,
///     timeout_secs: Some(120),
/// };
/// assert_eq!(cfg.provider, LlmProvider::OpenRouter);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The hosted backend.
    pub provider: LlmProvider,

    /// Model identifier string (e.g., `"thenlper/gte-base"`).
    pub model: String,

    /// API base URL.
    pub endpoint: String,

    /// API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature (controls creativity).
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}
