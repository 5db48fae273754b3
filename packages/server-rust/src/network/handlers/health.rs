//! Health, liveness, and readiness endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::warn;

use super::AppState;
use crate::network::HealthState;

/// `GET /api/health`: process status plus one database round trip.
///
/// Always 200. `status` is `"error"` when the backend query failed or
/// answered with a non-2xx status; `database` carries the reason.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let (status, database, http_status) = match state.identity.ping().await {
        Ok(code) if (200..300).contains(&code) => ("ok", "connected".to_string(), Some(code)),
        Ok(code) => {
            warn!(status = code, "health query rejected by backend");
            ("error", format!("backend responded with status {code}"), Some(code))
        }
        Err(e) => {
            warn!(error = %e, "health query failed");
            ("error", e.to_string(), None)
        }
    };

    Json(json!({
        "status": status,
        "database": database,
        "httpStatus": http_status,
        "state": state.shutdown.health_state().as_str(),
        "platform": format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "in_flight": state.shutdown.in_flight_count(),
        "env": {
            "hasUrl": state.backend.has_url(),
            "hasKey": state.backend.has_anon_key(),
        },
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// Liveness probe: 200 while the process answers at all.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: 200 only in the `Ready` state, 503 while starting or draining.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::network::handlers::test_support::{test_state, OneTokenIdentity};
    use crate::remote::BackendConfig;

    #[tokio::test]
    async fn health_reports_connected_database() {
        let state = test_state();
        state.shutdown.set_ready();

        let Json(body) = health_handler(State(state)).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "connected");
        assert_eq!(body["httpStatus"], 200);
        assert_eq!(body["state"], "ready");
        assert_eq!(body["env"]["hasUrl"], true);
        assert_eq!(body["env"]["hasKey"], true);
        assert!(body["uptime_secs"].is_u64());
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok(), "{timestamp}");
        assert!(timestamp.ends_with('Z'));
    }

    #[tokio::test]
    async fn health_reports_unreachable_database() {
        let mut state = test_state();
        state.identity = Arc::new(OneTokenIdentity {
            token: "good",
            ping_status: None,
        });

        let Json(body) = health_handler(State(state)).await;

        assert_eq!(body["status"], "error");
        assert_eq!(body["database"], "identity service unreachable: connection refused");
        assert_eq!(body["httpStatus"], Value::Null);
    }

    #[tokio::test]
    async fn health_reports_rejected_database_query() {
        let mut state = test_state();
        state.identity = Arc::new(OneTokenIdentity {
            token: "good",
            ping_status: Some(401),
        });

        let Json(body) = health_handler(State(state)).await;

        assert_eq!(body["status"], "error");
        assert_eq!(body["httpStatus"], 401);
    }

    #[tokio::test]
    async fn health_flags_missing_backend_settings() {
        let mut state = test_state();
        state.backend = Arc::new(BackendConfig::new("", ""));

        let Json(body) = health_handler(State(state)).await;

        assert_eq!(body["env"], json!({"hasUrl": false, "hasKey": false}));
    }

    #[tokio::test]
    async fn liveness_always_200() {
        assert_eq!(liveness_handler().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_lifecycle() {
        let state = test_state();
        assert_eq!(
            readiness_handler(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.shutdown.set_ready();
        assert_eq!(readiness_handler(State(state.clone())).await, StatusCode::OK);

        state.shutdown.begin_drain();
        assert_eq!(
            readiness_handler(State(state)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
