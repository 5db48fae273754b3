//! Path classification for the gateway.
//!
//! A [`RoutePolicy`] answers three questions about a request path: may it
//! skip authentication, must it always be answered with wildcard CORS, and
//! does it require the admin flag. Only the path participates; the query
//! string never changes a route's class.

use serde::{Deserialize, Serialize};

/// Configured path sets that drive the gateway's state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    /// Paths (and everything below them) that bypass authentication.
    pub public_paths: Vec<String>,
    /// Diagnostic paths that always receive `Access-Control-Allow-Origin: *`
    /// without credentials, whatever the request's `Origin`.
    pub wildcard_origin_paths: Vec<String>,
    /// Path segment that marks a route as admin-scoped.
    pub admin_segment: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            public_paths: vec!["/api/health".to_string(), "/api/debug".to_string()],
            wildcard_origin_paths: vec![
                "/api/health".to_string(),
                "/api/debug".to_string(),
                "/api/admin/test-push".to_string(),
            ],
            admin_segment: "admin".to_string(),
        }
    }
}

impl RoutePolicy {
    /// Returns `true` if `path` skips authentication entirely.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path_has_prefix(path, p))
    }

    /// Returns `true` if `path` is a diagnostic route answered with wildcard CORS.
    #[must_use]
    pub fn is_wildcard_origin(&self, path: &str) -> bool {
        self.wildcard_origin_paths
            .iter()
            .any(|p| path_has_prefix(path, p))
    }

    /// Returns `true` if any segment of `path` starts with the admin segment.
    ///
    /// Prefix matching fails closed: `/api/admin-tools` and `/api/administrators`
    /// are admin-scoped too. The query string is ignored.
    ///
    /// ```
    /// use palpiteiro_core::RoutePolicy;
    ///
    /// let policy = RoutePolicy::default();
    /// assert!(policy.is_admin("/api/admin/leagues"));
    /// assert!(policy.is_admin("/api/admin-tools/reset"));
    /// assert!(!policy.is_admin("/api/leagues?next=/admin"));
    /// ```
    #[must_use]
    pub fn is_admin(&self, path: &str) -> bool {
        !self.admin_segment.is_empty()
            && strip_query(path)
                .split('/')
                .any(|segment| segment.starts_with(self.admin_segment.as_str()))
    }
}

/// Segment-aware prefix match: `/api/health` matches `/api/health` and
/// `/api/health/db`, never `/api/healthz`.
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let path = strip_query(path);
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(p, _)| p)
}
