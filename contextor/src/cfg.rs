//! Runtime configuration loaded from environment variables.

use rag_base::structs::rag_base_config::SearchConfig;

use crate::error::ContextorError;

/// How the chat pipeline obtains context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Retrieve once up front and inline the context in the system prompt.
    Single,
    /// Offer `searchKnowledgeBase` as a tool and let the model call it.
    Tools,
}

/// Config bag for the chat pipeline. All fields have defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextorConfig {
    pub mode: ChatMode,
    /// Upper bound on model calls per request in tool mode.
    pub max_steps: usize,
    pub search: SearchConfig,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            mode: ChatMode::Single,
            max_steps: 5,
            search: SearchConfig::default(),
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables.
    ///
    /// - `CHAT_MODE` = `single` (default) | `tools`
    /// - `CHAT_MAX_STEPS` = model calls per tool-mode request (default 5, min 1)
    ///
    /// Search knobs are taken from the already-loaded rag-base config.
    ///
    /// # Example
    /// ```
    /// # use contextor::cfg::ContextorConfig;
    /// # use rag_base::structs::rag_base_config::SearchConfig;
    /// let cfg = ContextorConfig::from_env(SearchConfig::default()).unwrap();
    /// assert!(cfg.max_steps >= 1);
    /// ```
    pub fn from_env(search: SearchConfig) -> Result<Self, ContextorError> {
        Self::from_lookup(search, |k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(search: SearchConfig, get: F) -> Result<Self, ContextorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match get("CHAT_MODE").map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("single") | Some("rag") => ChatMode::Single,
            Some("tools") | Some("tool") | Some("agent") => ChatMode::Tools,
            Some(other) => {
                return Err(ContextorError::Validation(format!(
                    "unsupported CHAT_MODE: {other}"
                )));
            }
        };

        let max_steps = match get("CHAT_MAX_STEPS").filter(|v| !v.trim().is_empty()) {
            None => 5,
            Some(v) => v.trim().parse::<usize>().map_err(|_| {
                ContextorError::Validation(format!("CHAT_MAX_STEPS must be a number, got '{v}'"))
            })?,
        }
        .max(1);

        Ok(Self {
            mode,
            max_steps,
            search,
        })
    }
}
