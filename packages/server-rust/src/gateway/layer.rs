//! The gateway: one tower layer every API request passes through.
//!
//! Per request:
//! 1. Compute the [`OriginDecision`] from the `Origin` header and path.
//! 2. `OPTIONS` -> answer the preflight immediately.
//! 3. Public path -> forward without authentication.
//! 4. No `Authorization` header -> 401 without any identity call.
//! 5. Verify the bearer token (retried) -> 401 on rejection or exhaustion.
//! 6. Admin path -> look up the admin flag (retried) -> 403 unless `true`.
//! 7. Insert the [`RequestContext`] and forward to the inner service.
//!
//! Every outcome, including a panic in the inner service, leaves through
//! [`apply_cors_headers`].

use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::header::{AUTHORIZATION, ORIGIN};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use palpiteiro_core::{OriginDecision, RequestContext};
use tower::{Layer, Service, ServiceExt};
use tracing::{debug, error, warn};

use super::config::GatewayConfig;
use super::cors::{apply_cors_headers, preflight_response};
use super::rejection::GatewayRejection;
use crate::network::middleware::REQUEST_ID_HEADER;
use crate::network::ShutdownController;
use crate::traits::IdentityProvider;

// ---------------------------------------------------------------------------
// GatewayLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps a service with CORS, authentication, and admin gating.
#[derive(Clone)]
pub struct GatewayLayer {
    state: Arc<GatewayState>,
}

struct GatewayState {
    config: GatewayConfig,
    identity: Arc<dyn IdentityProvider>,
    shutdown: Option<Arc<ShutdownController>>,
}

impl GatewayLayer {
    #[must_use]
    pub fn new(config: GatewayConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            state: Arc::new(GatewayState {
                config,
                identity,
                shutdown: None,
            }),
        }
    }

    /// Tracks every request passing the gateway as in-flight on `shutdown`.
    #[must_use]
    pub fn with_shutdown(self, shutdown: Arc<ShutdownController>) -> Self {
        let state = GatewayState {
            config: self.state.config.clone(),
            identity: Arc::clone(&self.state.identity),
            shutdown: Some(shutdown),
        };
        Self {
            state: Arc::new(state),
        }
    }
}

impl<S> Layer<S> for GatewayLayer {
    type Service = GatewayService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GatewayService {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

// ---------------------------------------------------------------------------
// GatewayService
// ---------------------------------------------------------------------------

/// Service produced by [`GatewayLayer`].
#[derive(Clone)]
pub struct GatewayService<S> {
    inner: S,
    state: Arc<GatewayState>,
}

impl<S> Service<Request> for GatewayService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Hand the ready service to the future and keep a fresh clone.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let state = Arc::clone(&self.state);
        Box::pin(async move { Ok(state.handle(inner, req).await) })
    }
}

impl GatewayState {
    async fn handle<S>(&self, inner: S, mut req: Request) -> Response
    where
        S: Service<Request, Response = Response, Error = Infallible> + Send,
        S::Future: Send,
    {
        let _in_flight = self.shutdown.as_ref().map(|s| s.in_flight_guard());

        let path = req.uri().path().to_string();
        let decision = {
            let origin = req.headers().get(ORIGIN).and_then(|v| v.to_str().ok());
            OriginDecision::decide(origin, self.config.routes.is_wildcard_origin(&path))
        };

        if req.method() == Method::OPTIONS {
            record_outcome(&path, "preflight");
            return preflight_response(&decision);
        }

        let authorization = req
            .headers()
            .get(AUTHORIZATION)
            .map(|v| v.to_str().map(str::to_string).unwrap_or_default());
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut response = match self.authorize(&path, authorization, request_id).await {
            Ok(ctx) => {
                req.extensions_mut().insert(ctx);
                self.forward(inner, req, &path).await
            }
            Err(rejection) => {
                record_outcome(&path, rejection.outcome());
                rejection.into_response()
            }
        };

        apply_cors_headers(response.headers_mut(), &decision);
        response
    }

    /// Runs the authentication state machine for a non-preflight request.
    async fn authorize(
        &self,
        path: &str,
        authorization: Option<String>,
        request_id: Option<String>,
    ) -> Result<RequestContext, GatewayRejection> {
        let routes = &self.config.routes;
        if routes.is_public(path) {
            return Ok(RequestContext::anonymous(request_id));
        }

        let header = authorization.ok_or(GatewayRejection::MissingCredentials)?;
        let token = bearer_token(&header);
        if token.is_empty() {
            return Err(GatewayRejection::InvalidCredentials);
        }

        let identity = &self.identity;
        let mut principal = self
            .config
            .retry
            .run("verify_token", || identity.verify_token(token))
            .await
            .map_err(|e| {
                if e.is_fault() {
                    error!(path, error = %e, "token verification fault");
                    GatewayRejection::Internal(
                        "identity service returned an unexpected response".to_string(),
                    )
                } else {
                    GatewayRejection::InvalidCredentials
                }
            })?
            .ok_or(GatewayRejection::InvalidCredentials)?;

        if routes.is_admin(path) {
            let user_id = principal.id.clone();
            let flag = self
                .config
                .retry
                .run("admin_flag", || identity.admin_flag(&user_id))
                .await
                .map_err(|e| {
                    if e.is_fault() {
                        error!(path, error = %e, "admin lookup fault");
                        GatewayRejection::Internal(
                            "identity service returned an unexpected response".to_string(),
                        )
                    } else {
                        GatewayRejection::Forbidden
                    }
                })?;
            if flag != Some(true) {
                debug!(path, user_id = %principal.id, "admin flag not set");
                return Err(GatewayRejection::Forbidden);
            }
            principal.is_admin = Some(true);
        }

        Ok(RequestContext::authenticated(principal, request_id))
    }

    /// Invokes the inner service, turning a panic into a 500.
    async fn forward<S>(&self, inner: S, req: Request, path: &str) -> Response
    where
        S: Service<Request, Response = Response, Error = Infallible> + Send,
        S::Future: Send,
    {
        match AssertUnwindSafe(inner.oneshot(req)).catch_unwind().await {
            Ok(Ok(response)) => {
                record_outcome(path, "forwarded");
                response
            }
            Ok(Err(never)) => match never {},
            Err(panic) => {
                error!(path, panic = panic_message(&*panic), "handler panicked");
                let rejection = GatewayRejection::Internal("Internal Server Error".to_string());
                record_outcome(path, rejection.outcome());
                rejection.into_response()
            }
        }
    }
}

/// Strips a case-insensitive `Bearer` scheme; other values pass through
/// trimmed. A bare scheme yields an empty token.
fn bearer_token(header: &str) -> &str {
    let header = header.trim_start();
    match header.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &header[6..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim()
            } else {
                header.trim_end()
            }
        }
        _ => header.trim_end(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

fn record_outcome(path: &str, outcome: &'static str) {
    metrics::counter!("gateway_requests_total", "outcome" => outcome).increment(1);
    match outcome {
        "forwarded" | "preflight" => debug!(path, outcome, "gateway"),
        _ => warn!(path, outcome, "gateway rejected request"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
