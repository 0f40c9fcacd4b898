//! Default LLM configs loaded from environment variables.
//!
//! Two roles are supported:
//!
//! - **Chat**      → streaming chat completions (answers, tool calls)
//! - **Embedding** → embedding generator for chunk and query vectors
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_PROVIDER`      = `openrouter` (default) or `openai`
//! - `OPENROUTER_API_KEY` / `OPENAI_API_KEY` = bearer token (mandatory)
//! - `LLM_BASE_URL`      = API base URL (defaults per provider)
//! - `LLM_TIMEOUT_SECS`  = request timeout (default 120 for chat, 30 for embeddings)
//!
//! Chat:
//! - `LLM_CHAT_MODEL`    = default chat model (`nvidia/nemotron-nano-12b-v2-vl:free`)
//! - `LLM_TEMPERATURE`   = sampling temperature (default 0.7)
//! - `LLM_MAX_TOKENS`    = optional max tokens (u32)
//!
//! Embedding:
//! - `EMBEDDING_MODEL`   = embedding model (`thenlper/gte-base`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, env_opt_u64, must_env, opt_env,
        validate_http_endpoint, validate_range_f32,
    },
};

/// Default chat model when neither the request nor `LLM_CHAT_MODEL` names one.
pub const DEFAULT_CHAT_MODEL: &str = "nvidia/nemotron-nano-12b-v2-vl:free";

/// Default embedding model (768-dimensional).
pub const DEFAULT_EMBEDDING_MODEL: &str = "thenlper/gte-base";

/// Resolves provider, endpoint and API key shared by both roles.
fn provider_endpoint_key() -> Result<(LlmProvider, String, String), AiLlmError> {
    let provider = match opt_env("LLM_PROVIDER") {
        Some(v) => v.parse::<LlmProvider>()?,
        None => LlmProvider::OpenRouter,
    };

    let endpoint =
        opt_env("LLM_BASE_URL").unwrap_or_else(|| provider.default_endpoint().to_string());
    validate_http_endpoint("LLM_BASE_URL", &endpoint)?;

    let api_key = must_env(provider.api_key_var()).map_err(|_| {
        AiLlmError::from(ConfigError::MissingVar(provider.api_key_var()))
    })?;

    Ok((provider, endpoint, api_key))
}

/// Constructs the **chat** profile.
///
/// # Defaults
/// - `model = DEFAULT_CHAT_MODEL`
/// - `temperature = Some(0.7)`
/// - `timeout_secs = Some(120)`
///
/// # Errors
/// - [`ConfigError::MissingVar`] if the provider API key is missing
/// - [`ConfigError::InvalidNumber`] / [`ConfigError::OutOfRange`] on bad numbers
pub fn config_chat() -> Result<LlmModelConfig, AiLlmError> {
    let (provider, endpoint, api_key) = provider_endpoint_key()?;

    let model = opt_env("LLM_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());
    let temperature = env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(0.7);
    validate_range_f32("temperature", temperature, 0.0, 2.0)?;

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(120)),
    })
}

/// Constructs the **embedding** profile.
///
/// # Defaults
/// - `model = DEFAULT_EMBEDDING_MODEL`
/// - `timeout_secs = Some(30)`
pub fn config_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let (provider, endpoint, api_key) = provider_endpoint_key()?;

    let model =
        opt_env("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
    if model.trim().is_empty() {
        return Err(ConfigError::EmptyModel.into());
    }

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens: None,
        temperature: None,
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(30)),
    })
}
