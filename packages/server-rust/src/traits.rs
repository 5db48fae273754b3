use async_trait::async_trait;
use palpiteiro_core::{ObjectLocation, Principal};

/// Errors from the identity service.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity service unreachable: {0}")]
    Transport(String),
    #[error("identity service returned status {0}")]
    Status(u16),
    #[error("malformed identity service response: {0}")]
    Malformed(String),
}

impl IdentityError {
    /// Returns `true` when the error indicates a broken contract with the
    /// identity service rather than a rejected or unavailable caller.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Errors from the object store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object store unreachable: {0}")]
    Transport(String),
    #[error("object store rejected deletion ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// What the identity service said about a token it was able to answer for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenLookup {
    /// The token resolves to this principal.
    User(Principal),
    /// The service refused the token with a 4xx status and message.
    Rejected { status: u16, message: String },
    /// The service answered but returned no usable user.
    NoUser,
}

/// Token verification, admin-flag lookup and reachability against the
/// identity service.
///
/// Implementations only perform single attempts; retries are the caller's
/// concern.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token, keeping the service's reason for a refusal.
    async fn lookup_token(&self, token: &str) -> Result<TokenLookup, IdentityError>;

    /// Resolves a bearer token to its principal.
    ///
    /// Returns `Ok(None)` when the service explicitly rejects the token.
    async fn verify_token(&self, token: &str) -> Result<Option<Principal>, IdentityError> {
        Ok(match self.lookup_token(token).await? {
            TokenLookup::User(principal) => Some(principal),
            TokenLookup::Rejected { .. } | TokenLookup::NoUser => None,
        })
    }

    /// Looks up the admin flag for a user. `Ok(None)` when the user has no
    /// profile or the flag is unset.
    async fn admin_flag(&self, user_id: &str) -> Result<Option<bool>, IdentityError>;

    /// Issues one cheap database query and returns the HTTP status it got.
    async fn ping(&self) -> Result<u16, IdentityError>;
}

/// Deletion against the hosted object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Removes a single object.
    async fn remove(&self, location: &ObjectLocation) -> Result<(), StorageError>;
}
