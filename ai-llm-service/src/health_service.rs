//! Health probes for hosted LLM backends (OpenRouter, OpenAI).
//!
//! Both providers speak the same dialect, so a single probe is used:
//! `GET {endpoint}/models` with Bearer auth, followed by a best-effort check
//! that the configured model is listed.
//!
//! [`HealthService::check`] never fails; errors become `ok = false`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for a single profile.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Backend name ("OpenRouter", "OpenAI").
    pub provider: String,
    pub endpoint: String,
    pub model: Option<String>,
    pub ok: bool,
    /// Latency of the main probe in milliseconds.
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: cfg.provider.tag().to_string(),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Health checker reusing one HTTP client for all probes.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a health service with an optional client timeout (seconds, default 10).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        info!(
            default_timeout_secs = timeout.as_secs(),
            "HealthService initialized"
        );

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Checks one profile. Failures are reported in the returned status.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            warn!(
                provider = %cfg.provider.tag(),
                endpoint = %cfg.endpoint,
                "invalid endpoint (empty or missing http/https)"
            );
            return HealthStatus::new(cfg, false, 0, "endpoint is empty or missing http/https");
        }

        let start = Instant::now();
        match self.try_probe_models(cfg).await {
            Ok(status) => {
                info!(
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    model = %status.model.as_deref().unwrap_or("n/a"),
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status =
                    HealthStatus::new(cfg, false, start.elapsed().as_millis(), err.to_string());
                warn!(
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    latency_ms = status.latency_ms,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    /// Checks several profiles sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        debug!(count = configs.len(), "running batch health probes");
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    /// Strict probe: `GET {endpoint}/models`, 2xx required.
    async fn try_probe_models(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let url = format!("{}/models", cfg.endpoint.trim_end_matches('/'));
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
            .min(self.default_timeout);

        let api_key = cfg
            .api_key
            .as_ref()
            .ok_or_else(|| AiLlmError::Health(HealthError::Decode("missing API key".into())))?;

        let auth_header =
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                AiLlmError::Health(HealthError::Decode(format!("invalid API key header: {e}")))
            })?;

        let start = Instant::now();
        debug!(
            provider = %cfg.provider.tag(),
            model = %cfg.model,
            "GET {}", url
        );

        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .header(header::AUTHORIZATION, auth_header)
            .send()
            .await?;

        let latency = start.elapsed().as_millis();

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                provider = %cfg.provider.tag(),
                %url,
                %status,
                %snippet,
                latency_ms = latency,
                "health GET /models returned non-success status"
            );

            return Err(AiLlmError::Health(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })));
        }

        match resp.json::<Models>().await {
            Ok(models) => Ok(status_for_listing(cfg, &models, latency)),
            Err(e) => {
                warn!(
                    provider = %cfg.provider.tag(),
                    error = %e,
                    latency_ms = latency,
                    "failed to decode /models; treating server as reachable"
                );
                Ok(HealthStatus::new(
                    cfg,
                    true,
                    latency,
                    format!("reachable; failed to decode /models: {e}"),
                ))
            }
        }
    }
}

// Expected minimal JSON: { "data": [ { "id": "<model>" }, ... ] }
#[derive(Debug, serde::Deserialize)]
struct Models {
    data: Vec<ModelItem>,
}

#[derive(Debug, serde::Deserialize)]
struct ModelItem {
    id: String,
}

fn status_for_listing(cfg: &LlmModelConfig, models: &Models, latency: u128) -> HealthStatus {
    if models.data.iter().any(|m| m.id == cfg.model) {
        HealthStatus::new(cfg, true, latency, "healthy; model is available")
    } else {
        HealthStatus::new(cfg, false, latency, "up, but model not found in /models")
    }
}
