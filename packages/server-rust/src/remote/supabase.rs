//! HTTP client for the hosted backend's auth, REST, and storage endpoints.
//!
//! Each method performs exactly one request. Explicit rejections (4xx other
//! than 429) are reported as `Ok` values so they are never retried; transport
//! failures and 5xx/429 become errors the caller may retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use palpiteiro_core::{ObjectLocation, Principal};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::config::BackendConfig;
use crate::traits::{IdentityError, IdentityProvider, ObjectStore, StorageError, TokenLookup};

/// User object returned by `GET /auth/v1/user`.
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Row returned by the profile lookup.
#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    is_admin: Option<bool>,
}

/// Identity provider and object store backed by the hosted backend.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    config: Arc<BackendConfig>,
}

impl SupabaseClient {
    /// Builds a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: Arc<BackendConfig>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }

    /// Builds the endpoint URL from the configured base plus path segments.
    /// Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, String> {
        let mut url = Url::parse(self.config.base_url()).map_err(|e| e.to_string())?;
        url.path_segments_mut()
            .map_err(|()| "backend URL cannot be a base".to_string())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// 4xx responses other than 429 are the service's final word on a request.
fn is_rejection(status: StatusCode) -> bool {
    status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS
}

/// Pulls the human-readable message out of an error body. The auth API uses
/// `msg`, the REST and storage APIs use `message`.
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(String::from))
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("rejected").to_string())
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn lookup_token(&self, token: &str) -> Result<TokenLookup, IdentityError> {
        let url = self
            .endpoint(&["auth", "v1", "user"])
            .map_err(IdentityError::Transport)?;

        let resp = self
            .http
            .get(url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = resp.status();
        if is_rejection(status) {
            debug!(status = status.as_u16(), "identity service rejected token");
            let body = resp.text().await.unwrap_or_default();
            return Ok(TokenLookup::Rejected {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }
        if !status.is_success() {
            return Err(IdentityError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        let user: AuthUser =
            serde_json::from_slice(&body).map_err(|e| IdentityError::Malformed(e.to_string()))?;

        if user.id.is_empty() {
            return Ok(TokenLookup::NoUser);
        }
        Ok(TokenLookup::User(Principal {
            id: user.id,
            email: user.email,
            is_admin: None,
        }))
    }

    async fn admin_flag(&self, user_id: &str) -> Result<Option<bool>, IdentityError> {
        let url = self
            .endpoint(&["rest", "v1", "profiles"])
            .map_err(IdentityError::Transport)?;
        let key = self.config.privileged_key();
        let id_filter = format!("eq.{user_id}");

        let resp = self
            .http
            .get(url)
            .query(&[("select", "is_admin"), ("id", id_filter.as_str())])
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = resp.status();
        if is_rejection(status) {
            debug!(status = status.as_u16(), "profile lookup rejected");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(IdentityError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;
        let rows: Vec<ProfileRow> =
            serde_json::from_slice(&body).map_err(|e| IdentityError::Malformed(e.to_string()))?;

        Ok(rows.into_iter().next().and_then(|row| row.is_admin))
    }

    async fn ping(&self) -> Result<u16, IdentityError> {
        let url = self
            .endpoint(&["rest", "v1", "matches"])
            .map_err(IdentityError::Transport)?;

        let resp = self
            .http
            .head(url)
            .query(&[("select", "count")])
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        Ok(resp.status().as_u16())
    }
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    async fn remove(&self, location: &ObjectLocation) -> Result<(), StorageError> {
        let url = self
            .endpoint(&["storage", "v1", "object", &location.bucket])
            .map_err(StorageError::Transport)?;
        let key = self.config.privileged_key();

        let resp = self
            .http
            .delete(url)
            .header("apikey", key)
            .bearer_auth(key)
            .json(&json!({ "prefixes": [location.path] }))
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(StorageError::Rejected {
            status: status.as_u16(),
            message: error_message(&body, status),
        })
    }
}
