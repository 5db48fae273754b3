use crate::types::Principal;

/// Per-request context the gateway hands to downstream handlers.
///
/// Created once the request has passed the gateway and dropped when the
/// request completes. Public routes carry no principal.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authenticated principal, `None` on public routes.
    pub principal: Option<Principal>,
    /// Value of the `x-request-id` header, if one was assigned.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Context for a request that skipped authentication.
    #[must_use]
    pub fn anonymous(request_id: Option<String>) -> Self {
        Self {
            principal: None,
            request_id,
        }
    }

    /// Context for an authenticated request.
    #[must_use]
    pub fn authenticated(principal: Principal, request_id: Option<String>) -> Self {
        Self {
            principal: Some(principal),
            request_id,
        }
    }

    /// Id of the authenticated principal.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.id.as_str())
    }
}
