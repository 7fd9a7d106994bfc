//! Authentication hook for validating player identity.
//!
//! Tavern doesn't implement authentication itself. It defines the
//! [`Authenticator`] trait: one async method that takes the token from an
//! `AUTH` request and returns a `PlayerId` or an error. The session calls
//! it while handling `AUTH`.

use std::collections::HashMap;

use tavern_protocol::PlayerId;

use crate::SessionError;

/// Validates a client's auth token and returns their identity.
///
/// # Example
///
/// ```rust
/// use tavern_session::{Authenticator, SessionError};
/// use tavern_protocol::PlayerId;
///
/// /// Accepts any non-empty token and uses it as the player ID.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<PlayerId, SessionError> {
///         if token.is_empty() {
///             return Err(SessionError::AuthFailed("empty token".into()));
///         }
///         Ok(PlayerId::new(token))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the given token and returns the player's identity.
    ///
    /// # Returns
    /// - `Ok(PlayerId)` — the token is valid
    /// - `Err(SessionError::AuthFailed)` — the token is invalid or expired
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<PlayerId, SessionError>> + Send;
}

/// An authenticator backed by a fixed token → player table.
///
/// Useful for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, PlayerId>,
}

impl StaticTokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` as the credential of `player`.
    pub fn with_token(mut self, token: impl Into<String>, player: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), PlayerId::new(player));
        self
    }
}

impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<PlayerId, SessionError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| SessionError::AuthFailed("unknown token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_authenticator_known_token() {
        let auth = StaticTokenAuthenticator::new().with_token("t1", "alice");
        assert_eq!(auth.authenticate("t1").await.unwrap(), PlayerId::new("alice"));
    }

    #[tokio::test]
    async fn test_static_authenticator_unknown_token() {
        let auth = StaticTokenAuthenticator::new().with_token("t1", "alice");
        let err = auth.authenticate("nope").await.unwrap_err();
        assert!(matches!(err, SessionError::AuthFailed(_)));
        assert_eq!(err.code(), tavern_protocol::ErrorCode::AuthError);
    }
}
