//! Per-request CORS origin decision.
//!
//! The decision is a pure function of the `Origin` header and the route class.
//! Credentialed CORS is only ever granted to loopback origins, which is where
//! the packaged mobile client (`capacitor://localhost`, `http://localhost`)
//! and local development servers live. Every other origin gets the wildcard,
//! non-credentialed mode.

use http::Uri;

/// Methods advertised in `Access-Control-Allow-Methods`.
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Headers advertised in `Access-Control-Allow-Headers`: content type, bearer
/// auth, and the client headers the hosted backend SDK sends.
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With, apikey, x-client-info";

/// Preflight cache lifetime advertised in `Access-Control-Max-Age`, in seconds.
pub const MAX_AGE_SECS: u32 = 86_400;

/// Value of `Access-Control-Allow-Origin` when no origin is echoed.
pub const WILDCARD_ORIGIN: &str = "*";

/// The `(allowed-origin, allow-credentials)` pair computed once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginDecision {
    /// Value for `Access-Control-Allow-Origin`.
    pub allowed_origin: String,
    /// Value for `Access-Control-Allow-Credentials`.
    pub allow_credentials: bool,
    /// Whether the pair depends on the request's `Origin`, so responses
    /// must carry `Vary: Origin`. False only on diagnostic routes.
    pub vary_origin: bool,
}

impl OriginDecision {
    /// Wildcard origin without credentials.
    #[must_use]
    pub fn wildcard() -> Self {
        Self {
            allowed_origin: WILDCARD_ORIGIN.to_string(),
            allow_credentials: false,
            vary_origin: false,
        }
    }

    /// Decides the CORS mode for a request.
    ///
    /// 1. Diagnostic routes always get the wildcard.
    /// 2. A loopback `Origin` is echoed back with credentials.
    /// 3. Anything else (including no `Origin`) gets the wildcard.
    ///
    /// ```
    /// use palpiteiro_core::OriginDecision;
    ///
    /// let d = OriginDecision::decide(Some("http://localhost:5173"), false);
    /// assert_eq!(d.allowed_origin, "http://localhost:5173");
    /// assert!(d.allow_credentials);
    ///
    /// let d = OriginDecision::decide(Some("https://evil.example"), false);
    /// assert_eq!(d.allowed_origin, "*");
    /// assert!(!d.allow_credentials);
    /// ```
    #[must_use]
    pub fn decide(origin: Option<&str>, wildcard_route: bool) -> Self {
        if wildcard_route {
            return Self::wildcard();
        }
        match origin {
            Some(origin) if is_loopback_origin(origin) => Self {
                allowed_origin: origin.to_string(),
                allow_credentials: true,
                vary_origin: true,
            },
            _ => Self {
                vary_origin: true,
                ..Self::wildcard()
            },
        }
    }

    /// Returns `true` when the request's own origin is echoed back.
    #[must_use]
    pub fn echoes_origin(&self) -> bool {
        self.allowed_origin != WILDCARD_ORIGIN
    }

    /// Header value for `Access-Control-Allow-Credentials`.
    #[must_use]
    pub fn credentials_header(&self) -> &'static str {
        if self.allow_credentials {
            "true"
        } else {
            "false"
        }
    }
}

/// Returns `true` if the origin's host is `localhost` or `127.0.0.1`.
///
/// The host is compared exactly so that look-alike origins such as
/// `https://localhost.attacker.net` are not treated as loopback.
#[must_use]
pub fn is_loopback_origin(origin: &str) -> bool {
    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    matches!(uri.host(), Some("localhost" | "127.0.0.1"))
}
