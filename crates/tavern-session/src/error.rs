//! Error types for the session layer.

use tavern_protocol::ErrorCode;

use crate::StoreError;

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The [`Authenticator`](crate::Authenticator) rejected the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The player store failed while loading or saving.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session's mailbox is closed; it has terminated.
    #[error("session is no longer running")]
    SessionUnavailable,

    /// The world registry's mailbox is closed.
    #[error("world registry is unavailable")]
    WorldUnavailable,
}

impl SessionError {
    /// The wire error code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AuthFailed(_) => ErrorCode::AuthError,
            Self::Store(_) | Self::SessionUnavailable | Self::WorldUnavailable => {
                ErrorCode::InternalError
            }
        }
    }
}
