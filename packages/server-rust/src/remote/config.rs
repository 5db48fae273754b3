use std::fmt;

/// Connection settings for the hosted backend, read once at startup.
///
/// Shared behind an `Arc` and never mutated afterwards.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL of the backend project, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Public (anon) API key, sent as `apikey` on every call.
    pub anon_key: String,
    /// Privileged key used for object deletion when present.
    pub service_role_key: Option<String>,
}

impl BackendConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            service_role_key: None,
        }
    }

    #[must_use]
    pub fn with_service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Key for privileged calls (profile lookup, object deletion): the
    /// service-role key, falling back to the anon key.
    #[must_use]
    pub fn privileged_key(&self) -> &str {
        self.service_role_key.as_deref().unwrap_or(&self.anon_key)
    }

    #[must_use]
    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }

    #[must_use]
    pub fn has_anon_key(&self) -> bool {
        !self.anon_key.is_empty()
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
