//! Responses the gateway produces on its own, and the shared error body shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Builds a `{"error": message}` JSON response.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Why the gateway refused to forward a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayRejection {
    /// No `Authorization` header on a protected route.
    #[error("Not authenticated")]
    MissingCredentials,
    /// Token rejected, or the identity service stayed unavailable.
    #[error("Invalid token")]
    InvalidCredentials,
    /// Authenticated, but the route needs the admin flag.
    #[error("Forbidden")]
    Forbidden,
    /// Anything else. The message is safe to show to clients.
    #[error("{0}")]
    Internal(String),
}

impl GatewayRejection {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredentials | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for logs and the `gateway_requests_total` counter.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Forbidden => "forbidden",
            Self::Internal(_) => "fault",
        }
    }
}

impl IntoResponse for GatewayRejection {
    fn into_response(self) -> Response {
        error_response(self.status(), &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_credentials_is_401_with_message() {
        let response = GatewayRejection::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"error": "Not authenticated"}));
    }

    #[tokio::test]
    async fn forbidden_is_403() {
        let response = GatewayRejection::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await, json!({"error": "Forbidden"}));
    }

    #[tokio::test]
    async fn internal_carries_only_its_message() {
        let response = GatewayRejection::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({"error": "boom"}));
    }

    #[test]
    fn outcome_labels_are_distinct() {
        let labels = [
            GatewayRejection::MissingCredentials.outcome(),
            GatewayRejection::InvalidCredentials.outcome(),
            GatewayRejection::Forbidden.outcome(),
            GatewayRejection::Internal(String::new()).outcome(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
