//! The authentication seam.
//!
//! Sidepick does not validate external credentials itself; that is the auth
//! provider's job. The API layer hands each request's bearer token to an
//! [`Authenticator`] and gets back the resolved identity (plus the profile
//! projection pushed into the user store). Production deployments implement
//! the trait over their provider's credential exchange; tests and gateway
//! setups use [`SharedSecretAuth`].

use sidepick_protocol::{UserId, UserProfile};

/// The identity an authenticator resolves a token into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub nickname: String,
    pub avatar_url: String,
}

impl AuthUser {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            nickname: self.nickname.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// A rejected token.
#[derive(Debug, thiserror::Error)]
#[error("authentication failed: {0}")]
pub struct AuthError(pub String);

/// Validates a bearer token and resolves the caller's identity.
///
/// The future is explicitly `Send` so handlers stay spawnable;
/// implementations just write `async fn`.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<AuthUser, AuthError>> + Send;
}

/// Gateway-style bearer tokens: `<secret>.<user id>.<nickname>`.
///
/// Meant for deployments where a fronting gateway has already exchanged the
/// provider credential and mints internal tokens with the shared
/// `token_secret`; the core trusts the resolved identity per its contract.
/// Also the workhorse of the test suites.
#[derive(Debug, Clone)]
pub struct SharedSecretAuth {
    secret: String,
}

impl SharedSecretAuth {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Authenticator for SharedSecretAuth {
    async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let mut parts = token.splitn(3, '.');
        let (secret, id, nickname) = match (parts.next(), parts.next(), parts.next()) {
            (Some(secret), Some(id), Some(nickname)) => (secret, id, nickname),
            _ => return Err(AuthError("malformed token".into())),
        };
        if secret != self.secret {
            return Err(AuthError("bad secret".into()));
        }
        if id.is_empty() || nickname.is_empty() {
            return Err(AuthError("empty identity".into()));
        }
        Ok(AuthUser {
            id: UserId::from(id),
            nickname: nickname.to_string(),
            avatar_url: String::new(),
        })
    }
}
