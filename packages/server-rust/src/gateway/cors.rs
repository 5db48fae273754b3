//! CORS header stamping and preflight responses.
//!
//! The gateway does not use `tower_http::cors::CorsLayer` because the
//! allowed origin depends on the route class as well as the `Origin` header,
//! and because every gateway-produced rejection must carry the same headers.

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use palpiteiro_core::cors::{ALLOW_HEADERS, ALLOW_METHODS, MAX_AGE_SECS, WILDCARD_ORIGIN};
use palpiteiro_core::OriginDecision;

/// Writes the four CORS headers for `decision`, replacing any set by a handler.
pub fn apply_cors_headers(headers: &mut HeaderMap, decision: &OriginDecision) {
    let origin = HeaderValue::from_str(&decision.allowed_origin)
        .unwrap_or_else(|_| HeaderValue::from_static(WILDCARD_ORIGIN));

    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static(decision.credentials_header()),
    );
    if decision.vary_origin {
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }
}

/// Answers a preflight: `204 No Content`, CORS headers, and `Access-Control-Max-Age`.
pub fn preflight_response(decision: &OriginDecision) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    apply_cors_headers(headers, decision);
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(MAX_AGE_SECS));
    response
}
