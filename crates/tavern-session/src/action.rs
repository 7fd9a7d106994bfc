//! Player action hook.
//!
//! `PLAYER_ACTION` requests are handed to an [`ActionService`], which
//! prepares whatever the action needs (a transaction, a game move) and
//! returns a handle to it. Preparation may be slow, so the session never
//! awaits it inline: it runs on a detached task and the result comes back
//! through the session's mailbox.

use serde_json::Value;
use tavern_protocol::PlayerId;

/// One action request, as received from the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
    /// Correlates the eventual response with the request.
    pub request_id: String,
    pub action_type: String,
    pub data: Value,
}

/// A successfully prepared action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedAction {
    /// Opaque reference the client can use to follow up.
    pub handle: String,
}

/// Why an action could not be prepared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("unsupported action type: {0}")]
    Unsupported(String),

    #[error("action rejected: {0}")]
    Rejected(String),

    #[error("action service failed: {0}")]
    Failed(String),
}

/// Prepares player actions.
pub trait ActionService: Send + Sync + 'static {
    fn prepare(
        &self,
        player: &PlayerId,
        action: ActionDescriptor,
    ) -> impl std::future::Future<Output = Result<PreparedAction, ActionError>> + Send;
}

/// An [`ActionService`] that supports no actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActionService;

impl ActionService for NoActionService {
    async fn prepare(
        &self,
        _player: &PlayerId,
        action: ActionDescriptor,
    ) -> Result<PreparedAction, ActionError> {
        Err(ActionError::Unsupported(action.action_type))
    }
}
