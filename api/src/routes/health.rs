use std::sync::Arc;

use ai_llm_service::health_service::HealthStatus;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::warn;

use crate::core::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub backend: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: StoreHealth,
    pub llm: Vec<HealthStatus>,
}

/// `GET /health`: vector store ping plus provider probes; 503 when anything is down.
pub async fn health_route(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let store = match state.rag.ping().await {
        Ok(()) => StoreHealth {
            backend: state.rag.backend(),
            ok: true,
            error: None,
        },
        Err(err) => {
            warn!(error = %err, "health_route: store ping failed");
            StoreHealth {
                backend: state.rag.backend(),
                ok: false,
                error: Some(err.to_string()),
            }
        }
    };

    let llm = match &state.llm {
        Some(llm) => llm.health_all().await,
        None => Vec::new(),
    };

    let ok = store.ok && llm.iter().all(|s| s.ok);
    let (status, code) = if ok {
        ("ok", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        code,
        Json(HealthResponse {
            status,
            store,
            llm,
        }),
    )
}
