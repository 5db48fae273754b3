//! Gateway process lifecycle: build the router, bind, serve, drain.
//!
//! Deferred startup: `new()` wires shared state, `start()` binds the TCP
//! listener (so callers learn the port before traffic flows), and `serve()`
//! accepts connections until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    debug_auth_handler, debug_handler, delete_object_handler, health_handler, liveness_handler,
    not_found_handler, readiness_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::gateway::{GatewayConfig, GatewayLayer};
use crate::remote::BackendConfig;
use crate::traits::{IdentityProvider, ObjectStore};

/// Owns the listener and everything the router needs.
pub struct NetworkModule {
    config: NetworkConfig,
    gateway: GatewayConfig,
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    ///
    /// Handler-initiated remote calls share the gateway's retry policy.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        gateway: GatewayConfig,
        backend: Arc<BackendConfig>,
        identity: Arc<dyn IdentityProvider>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        let state = AppState {
            shutdown: Arc::new(ShutdownController::new()),
            backend,
            identity,
            objects,
            retry: gateway.retry,
            start_time: Instant::now(),
        };
        Self {
            config,
            gateway,
            state,
            listener: None,
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Assembles routes and middleware.
    ///
    /// API routes (behind the gateway):
    /// - `GET /api/health` -- public status JSON
    /// - `GET /api/debug` -- public configuration presence flags
    /// - `GET /api/debug/auth` -- public token self-check
    /// - `POST /api/storage/delete` -- authenticated object removal
    /// - anything else -- `404 {"error":"Not found"}`
    ///
    /// Orchestrator probes (`/health/live`, `/health/ready`) bypass the
    /// gateway. Layer order, outermost first: request id and tracing,
    /// gateway, request timeout.
    pub fn build_router(&self) -> Router {
        let api = Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/debug", get(debug_handler))
            .route("/api/debug/auth", get(debug_auth_handler))
            .route("/api/storage/delete", post(delete_object_handler));
        self.assemble(api)
    }

    /// Wraps `api` in the timeout and gateway, mounts the probes beside it,
    /// and applies the transport stack.
    fn assemble(&self, api: Router<AppState>) -> Router {
        let gateway = GatewayLayer::new(self.gateway.clone(), Arc::clone(&self.state.identity))
            .with_shutdown(Arc::clone(&self.state.shutdown));

        let api = api
            .fallback(not_found_handler)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.config.request_timeout,
            ))
            .layer(gateway);

        Router::new()
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .merge(api)
            .layer(build_http_layers())
            .with_state(self.state.clone())
    }

    /// Binds the listener and returns the actual port (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let Some(listener) = self.listener else {
            anyhow::bail!("start() must be called before serve()");
        };
        let controller = self.state.shutdown;

        controller.set_ready();
        info!("gateway ready");

        let on_signal = Arc::clone(&controller);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("shutdown requested, draining");
                on_signal.begin_drain();
            })
            .await?;

        if controller.wait_for_drain(self.config.drain_timeout).await {
            info!("all in-flight requests drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "drain timeout expired with requests still in flight"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, ORIGIN, VARY,
    };
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::network::handlers::test_support::{OneTokenIdentity, RecordingStore};
    use crate::network::HealthState;

    fn module() -> NetworkModule {
        NetworkModule::new(
            NetworkConfig {
                host: "127.0.0.1".to_string(),
                ..NetworkConfig::default()
            },
            GatewayConfig::default(),
            Arc::new(BackendConfig::new("https://x.supabase.co", "anon")),
            Arc::new(OneTokenIdentity::new("good")),
            Arc::new(RecordingStore::default()),
        )
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = router.oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn get_req(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(path).header(ORIGIN, "capacitor://localhost");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn api_health_is_public_with_wildcard_cors() {
        let (status, headers, body) =
            send(module().build_router(), get_req("/api/health", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn probes_bypass_gateway() {
        let module = module();
        let router = module.build_router();

        let (status, headers, _) = send(router.clone(), get_req("/health/ready", None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!headers.contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));

        module.shutdown_controller().set_ready();
        let (status, _, _) = send(router.clone(), get_req("/health/ready", None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = send(router, get_req("/health/live", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn storage_delete_requires_authentication() {
        let req = Request::post("/api/storage/delete")
            .header(ORIGIN, "capacitor://localhost")
            .body(Body::from(r#"{"url":"https://x/storage/v1/object/public/a/b.png"}"#))
            .unwrap();
        let (status, headers, body) = send(module().build_router(), req).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Not authenticated"}));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "capacitor://localhost");
    }

    #[tokio::test]
    async fn storage_delete_with_token_succeeds() {
        let req = Request::post("/api/storage/delete")
            .header(AUTHORIZATION, "Bearer good")
            .body(Body::from(r#"{"url":"https://x/storage/v1/object/public/a/b.png"}"#))
            .unwrap();
        let (status, _, body) = send(module().build_router(), req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
    }

    #[tokio::test]
    async fn storage_delete_rejects_other_methods() {
        let (status, headers, _) = send(
            module().build_router(),
            get_req("/api/storage/delete", Some("good")),
        )
        .await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "capacitor://localhost");
    }

    #[tokio::test]
    async fn unknown_path_needs_auth_then_404s() {
        let router = module().build_router();

        let (status, _, _) = send(router.clone(), get_req("/api/nowhere", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, headers, body) = send(router, get_req("/api/nowhere", Some("good"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found"}));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "capacitor://localhost");
    }

    #[tokio::test]
    async fn preflight_on_protected_route() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/storage/delete")
            .header(ORIGIN, "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(module().build_router(), req).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5173");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out_with_cors_headers() {
        let mut module = module();
        module.config.request_timeout = Duration::from_secs(1);
        let api = Router::new().route(
            "/api/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            }),
        );

        let (status, headers, _) =
            send(module.assemble(api), get_req("/api/slow", Some("good"))).await;

        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "capacitor://localhost");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(headers.contains_key(ACCESS_CONTROL_ALLOW_METHODS));
        assert!(headers.contains_key(ACCESS_CONTROL_ALLOW_HEADERS));
        assert_eq!(headers[VARY], "Origin");
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = module();
        let port = module.start().await.unwrap();
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let err = module()
            .serve(std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("start()"));
    }

    #[tokio::test]
    async fn serves_then_drains_on_shutdown() {
        let mut module = module();
        let port = module.start().await.unwrap();
        let controller = module.shutdown_controller();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(module.serve(async move {
            let _ = rx.await;
        }));

        let body: Value = reqwest::get(format!("http://127.0.0.1:{port}/api/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["state"], "ready");

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }
}
