use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

fn incoming_id(headers: &HeaderMap) -> Option<HeaderValue> {
    headers
        .get(REQUEST_ID_HEADER)
        .filter(|h| h.to_str().is_ok_and(|v| !v.trim().is_empty()))
        .cloned()
}

fn fresh_id() -> HeaderValue {
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    // Digits and a dash only, always a valid header value.
    HeaderValue::from_str(&format!("req-{nanos}")).unwrap_or(HeaderValue::from_static("req-0"))
}

/// Handler-side lookup; `-` when the middleware is not installed.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
}

/// Ensures every request carries `X-Request-Id` and echoes it on the response.
pub async fn ensure_request_id(mut req: Request<Body>, next: Next) -> Response {
    let id = incoming_id(req.headers()).unwrap_or_else(fresh_id);
    req.headers_mut().insert(REQUEST_ID_HEADER, id.clone());

    let mut res = next.run(req).await;
    res.headers_mut().insert(REQUEST_ID_HEADER, id);
    res
}
