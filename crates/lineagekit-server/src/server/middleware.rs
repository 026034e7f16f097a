//! Request middleware: admission control, body size guard and timing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use super::AppState;
use crate::admission::{AdmissionController, AdmissionDecision};
use crate::error::{megabytes, ApiError};

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
const X_PROCESS_TIME: HeaderName = HeaderName::from_static("x-process-time");
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Identity used for rate accounting: the first `X-Forwarded-For` entry,
/// else the peer IP, else `unknown`.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match (forwarded, peer) {
        (Some(forwarded), _) => forwarded.to_string(),
        (None, Some(peer)) => peer.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// Admission control for every path except the health check.
pub async fn admission_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if AdmissionController::is_exempt(req.uri().path()) {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(req.headers(), peer);
    let decision = state.admission.allow(&identity, SystemTime::now());

    if !decision.permitted {
        warn!(
            client = %identity,
            limit = decision.limit,
            path = %req.uri().path(),
            "rate limit exceeded"
        );
        return rate_limited_response(&state.admission, &decision);
    }

    let mut response = next.run(req).await;
    insert_rate_limit_headers(response.headers_mut(), &decision);
    response
}

fn rate_limited_response(admission: &AdmissionController, decision: &AdmissionDecision) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(admission.denial_body()),
    )
        .into_response();
    let headers = response.headers_mut();
    insert_rate_limit_headers(headers, decision);
    if let Ok(value) = HeaderValue::from_str(&admission.window().as_secs().to_string()) {
        headers.insert(header::RETRY_AFTER, value);
    }
    response
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, decision: &AdmissionDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_at));
}

/// Rejects bodies whose declared length is over the configured maximum
/// before any of the body is read.
pub async fn body_size_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) {
        let declared = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        if let Some(length) = declared {
            if length > state.config.max_request_bytes() {
                return ApiError::BodyTooLarge {
                    size_mb: megabytes(length),
                    max_mb: state.config.max_request_size_mb,
                }
                .into_response();
            }
        }
    }
    next.run(req).await
}

/// Adds `X-Process-Time` and writes one access log line per request.
pub async fn process_time_middleware(req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut response = next.run(req).await;

    let elapsed = started.elapsed().as_secs_f64();
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed:.3}")) {
        response.headers_mut().insert(X_PROCESS_TIME, value);
    }
    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = elapsed * 1000.0,
        "request"
    );
    response
}
