//! `POST /api/storage/delete`: removes an uploaded object given its public URL.

use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use palpiteiro_core::{resolve_public_url, RequestContext};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    #[serde(default)]
    url: Option<String>,
}

/// Resolves the URL to a bucket/path pair and removes the object through the
/// retry policy.
///
/// # Errors
///
/// `400` for a missing or unresolvable URL, `500` when the store still fails
/// after the last attempt.
pub async fn delete_object_handler(
    State(state): State<AppState>,
    ctx: Option<Extension<RequestContext>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: DeleteRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest("Invalid JSON body"))?;
    let url = request
        .url
        .filter(|u| !u.is_empty())
        .ok_or(ApiError::BadRequest("Missing URL"))?;

    let location = resolve_public_url(&url).map_err(|e| {
        warn!(error = %e, "unresolvable storage URL");
        ApiError::BadRequest("Invalid public URL format")
    })?;

    let (user_id, request_id) = ctx.as_ref().map_or(("-", "-"), |Extension(c)| {
        (
            c.user_id().unwrap_or("-"),
            c.request_id.as_deref().unwrap_or("-"),
        )
    });
    info!(
        user_id,
        request_id,
        bucket = %location.bucket,
        path = %location.path,
        "deleting object"
    );

    let objects = &state.objects;
    state
        .retry
        .run("storage_remove", || objects.remove(&location))
        .await?;

    Ok(Json(json!({ "success": true })))
}
