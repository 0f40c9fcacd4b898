use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use serde_json::json;

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

fn is_json(parts: &axum::http::response::Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

fn hint_for(msg: &str) -> Option<&'static str> {
    if msg.contains("expected a sequence") {
        Some("Expected an array for this field (e.g. [{\"role\": \"user\", \"content\": \"...\"}]).")
    } else if msg.contains("expected a map") || msg.contains("expected struct") {
        Some("Expected a JSON object here (e.g. { \"field\": \"value\" }).")
    } else if msg.contains("Content-Type") {
        Some("Send the body with the proper Content-Type header.")
    } else {
        None
    }
}

/// Rewrites plain-text extractor rejections (400/415/422) into the JSON error body.
///
/// Responses that are already JSON pass through untouched.
pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    if !matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::UNPROCESSABLE_ENTITY
            | StatusCode::UNSUPPORTED_MEDIA_TYPE
    ) {
        return res;
    }

    let (mut parts, bytes) = take_body(res).await;
    if is_json(&parts) {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let original = String::from_utf8_lossy(&bytes);
    let message = original.trim();
    let mut body = json!({
        "error": if message.is_empty() { "Invalid request" } else { message },
        "code": "BAD_REQUEST",
    });
    if let Some(hint) = hint_for(message) {
        body["details"] = json!(hint);
    }

    let body = match serde_json::to_vec(&body) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.status = StatusCode::BAD_REQUEST;
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    Response::from_parts(parts, Body::from(body))
}
