//! Diagnostic endpoints. Both are public: they never reveal key material,
//! only whether it is configured.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use super::AppState;
use crate::traits::TokenLookup;

/// Characters of the token echoed back by `/api/debug/auth`.
const TOKEN_PREFIX_CHARS: usize = 10;

/// `GET /api/debug`: which backend settings are present, plus the build version.
pub async fn debug_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "SUPABASE_URL": state.backend.has_url(),
        "SUPABASE_ANON_KEY": state.backend.has_anon_key(),
        "SUPABASE_SERVICE_ROLE_KEY": state.backend.service_role_key.is_some(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /api/debug/auth`: verifies the caller's own token once, without retry,
/// and reports what the identity service said.
pub async fn debug_auth_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let env = json!({
        "hasUrl": state.backend.has_url(),
        "hasKey": state.backend.has_anon_key(),
    });

    let Some(header) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": "unauthorized",
                "error": "No Authorization header",
                "env": env,
            })),
        );
    };

    let token = header.strip_prefix("Bearer ").unwrap_or(header);
    match state.identity.lookup_token(token).await {
        Ok(TokenLookup::User(principal)) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "user": { "id": principal.id, "email": principal.email },
                "env": env,
            })),
        ),
        Ok(TokenLookup::Rejected { status, message }) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": "error",
                "error": message,
                "code": status,
                "tokenPrefix": token_prefix(token),
            })),
        ),
        Ok(TokenLookup::NoUser) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": "unauthorized",
                "error": "No user returned",
            })),
        ),
        Err(e) => {
            warn!(error = %e, "token self-check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "crash",
                    "error": e.to_string(),
                })),
            )
        }
    }
}

fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(TOKEN_PREFIX_CHARS).collect();
    format!("{prefix}...")
}
