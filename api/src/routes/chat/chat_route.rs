use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderName, HeaderValue},
    response::{
        IntoResponse, Response,
        sse::{KeepAlive, Sse},
    },
};
use tracing::{error, info};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    middleware_layer::request_id::request_id,
    routes::chat::{
        chat_request::ChatRequest,
        ui_message_stream::{UI_STREAM_HEADER, UI_STREAM_VERSION, ui_message_stream},
    },
};

/// `POST /api/chat`: validates, retrieves context and streams the answer.
///
/// Everything up to the upstream response status runs before the first
/// byte is sent, so those failures are plain JSON errors.
pub async fn chat_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(body) = payload?;
    let request_id = request_id(&headers);
    let turn = body.into_turn();

    info!(
        request_id = %request_id,
        messages = turn.messages.len(),
        model = turn.model.as_deref().unwrap_or("-"),
        "chat_route: start"
    );

    let events = state.pipeline.run(turn).await.map_err(|err| {
        error!(request_id = %request_id, error = %err, "chat_route: failed");
        AppError::from_chat("RAG processing failed", err)
    })?;

    info!(request_id = %request_id, "chat_route: streaming");

    let sse = Sse::new(ui_message_stream(events)).keep_alive(KeepAlive::default());
    Ok((
        [(
            HeaderName::from_static(UI_STREAM_HEADER),
            HeaderValue::from_static(UI_STREAM_VERSION),
        )],
        sse,
    )
        .into_response())
}
