use palpiteiro_core::RoutePolicy;

use crate::remote::RetryPolicy;

/// Gateway behavior: which paths are public/diagnostic/admin, and how hard
/// to retry identity-service calls.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub routes: RoutePolicy,
    pub retry: RetryPolicy,
}
