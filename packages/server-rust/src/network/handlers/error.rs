//! Error type for built-in handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::gateway::error_response;
use crate::traits::StorageError;

/// Handler failures, rendered as `{"error": "..."}` with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("Not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            // The store's own message is safe to relay; transport details are not.
            Self::Storage(StorageError::Rejected { message, .. }) => {
                error_response(status, message)
            }
            Self::Storage(e @ StorageError::Transport(_)) => {
                error!(error = %e, "object store unavailable");
                error_response(status, "object store unavailable")
            }
            other => error_response(status, &other.to_string()),
        }
    }
}

/// Fallback for unmatched paths.
pub async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}
