//! Built-in API handlers and the state they share.
//!
//! Every handler sits behind the gateway, so protected handlers can rely on
//! a [`RequestContext`](palpiteiro_core::RequestContext) in the request
//! extensions.

pub mod debug;
pub mod error;
pub mod health;
pub mod storage;

pub use debug::{debug_auth_handler, debug_handler};
pub use error::{not_found_handler, ApiError};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use storage::delete_object_handler;

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;
use crate::remote::{BackendConfig, RetryPolicy};
use crate::traits::{IdentityProvider, ObjectStore};

/// Shared application state passed to handlers via `State` extraction.
///
/// Holds `Arc` references so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub shutdown: Arc<ShutdownController>,
    /// Backend settings, consulted only for presence flags.
    pub backend: Arc<BackendConfig>,
    pub identity: Arc<dyn IdentityProvider>,
    pub objects: Arc<dyn ObjectStore>,
    /// Retry policy for handler-initiated remote calls.
    pub retry: RetryPolicy,
    /// Process start time, used for uptime.
    pub start_time: Instant,
}
