//! Request correlation and access logging.
//!
//! Each request carries an `x-request-id`: the caller's, when it is short
//! printable ASCII, otherwise a fresh UUID. The id is echoed on the
//! response and attached to the access log line, and the request is counted
//! in the HTTP metrics under its route template (`/api/properties/{property_id}`)
//! rather than the raw path.

use axum::{
    extract::{FromRequestParts, MatchedPath, Request},
    http::{HeaderMap, HeaderValue, StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

use super::middleware::WALLET_HEADER;
use crate::{logging, metrics};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id accepted as-is
const MAX_REQUEST_ID_LEN: usize = 128;

/// Route label for requests that matched no route
const UNMATCHED_ROUTE: &str = "unmatched";

fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.chars().all(|c| c.is_ascii_graphic())
        })
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Tag, time, log and count every request.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = request_id_from(request.headers());
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let wallet = request
        .headers()
        .get(WALLET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    tracing::debug!(request_id = %request_id, %method, uri = %request.uri(), "Request started");

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    metrics::http_requests_total(&method, &route, status);
    metrics::http_request_duration_ms(&method, &route, duration_ms as f64);
    logging::log_api_request(&method, &route, status, duration_ms, wallet.as_deref());

    response
}

/// Correlation id of the current request
#[derive(Clone, Debug)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<RequestId>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "request id middleware not installed",
        ))
    }
}
