use serde::{Deserialize, Serialize};

/// Authenticated caller resolved from a bearer token.
///
/// `is_admin` stays `None` unless the route required the admin check; the
/// gateway never looks the flag up on the common path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque user identifier issued by the identity service.
    pub id: String,
    /// E-mail address, when the identity service returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Admin flag, resolved lazily for admin-scoped routes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl Principal {
    /// Creates a principal with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            is_admin: None,
        }
    }

    /// Sets the e-mail address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_admin_flag_is_omitted_from_json() {
        let p = Principal::new("u1").with_email("a@b.c");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json, serde_json::json!({"id": "u1", "email": "a@b.c"}));
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let p: Principal = serde_json::from_str(r#"{"id":"u2"}"#).unwrap();
        assert_eq!(p, Principal::new("u2"));
    }
}
