//! Type-narrowed addresses.

use std::fmt;
use std::sync::Arc;

use crate::{ActorId, MailboxError};

type Deliver<T> = dyn Fn(T) -> Result<(), MailboxError> + Send + Sync;

/// An address that accepts messages of type `T`.
///
/// Obtained from [`Addr::recipient`](crate::Addr::recipient). A room holds
/// its members as `Recipient<RoomNotice>` so it never needs to know the
/// session's full message type. Equality compares component identity.
pub struct Recipient<T> {
    id: ActorId,
    deliver: Arc<Deliver<T>>,
}

impl<T> Recipient<T> {
    pub(crate) fn new(
        id: ActorId,
        deliver: impl Fn(T) -> Result<(), MailboxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            deliver: Arc::new(deliver),
        }
    }

    /// Returns the identity of the component behind this recipient.
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Enqueues a message without waiting.
    ///
    /// # Errors
    /// Returns [`MailboxError::Closed`] if the component has terminated.
    pub fn send(&self, msg: T) -> Result<(), MailboxError> {
        (self.deliver)(msg)
    }
}

impl<T> Clone for Recipient<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            deliver: Arc::clone(&self.deliver),
        }
    }
}

impl<T> PartialEq for Recipient<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Recipient<T> {}

impl<T> fmt::Debug for Recipient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipient").field("id", &self.id).finish()
    }
}
