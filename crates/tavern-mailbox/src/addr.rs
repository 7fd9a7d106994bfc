//! Addresses and mailboxes.
//!
//! A mailbox is an unbounded, ordered queue read by exactly one task.
//! The matching [`Addr`] is the only way to put messages into it. Because
//! one task drains the queue, the component's state is only ever touched
//! by one logical thread at a time, and no locking is needed.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};

use crate::{MailboxError, Recipient};

/// Counter for generating process-unique actor IDs.
static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique identity of a component.
///
/// Two handles refer to the same component exactly when their IDs are
/// equal, regardless of the handle type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    fn next() -> Self {
        Self(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0)
    }
}

/// Creates a new mailbox and the address that feeds it.
///
/// The [`Mailbox`] half should be moved into the component's task; the
/// [`Addr`] half can be cloned freely and handed to anyone who needs to
/// reach the component.
pub fn mailbox<M>() -> (Addr<M>, Mailbox<M>) {
    let id = ActorId::next();
    let (tx, rx) = mpsc::unbounded_channel();
    (Addr { id, tx }, Mailbox { id, rx })
}

/// Handle to a component's mailbox.
pub struct Addr<M> {
    id: ActorId,
    tx: mpsc::UnboundedSender<M>,
}

impl<M> Addr<M> {
    /// Returns the identity of the component behind this address.
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Enqueues a message without waiting.
    ///
    /// # Errors
    /// Returns [`MailboxError::Closed`] if the component has terminated.
    pub fn send(&self, msg: M) -> Result<(), MailboxError> {
        self.tx.send(msg).map_err(|_| MailboxError::Closed)
    }

    /// Sends a request and waits for the component to answer it.
    ///
    /// `make` receives the reply slot and builds the message carrying it.
    ///
    /// # Errors
    /// - [`MailboxError::Closed`] — the component has terminated
    /// - [`MailboxError::NoReply`] — the reply slot was dropped unanswered
    pub async fn ask<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> M,
    ) -> Result<R, MailboxError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx))?;
        reply_rx.await.map_err(|_| MailboxError::NoReply)
    }

    /// Returns `true` once the component has terminated.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the component has terminated (its mailbox dropped).
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    pub(crate) fn downgrade(&self) -> mpsc::WeakUnboundedSender<M> {
        self.tx.downgrade()
    }
}

impl<M: Send + 'static> Addr<M> {
    /// Narrows this address to a [`Recipient`] of `T`.
    ///
    /// Messages sent to the recipient are converted into `M` with `From`.
    pub fn recipient<T>(&self) -> Recipient<T>
    where
        T: Send + 'static,
        M: From<T>,
    {
        let tx = self.tx.clone();
        Recipient::new(self.id, move |msg: T| {
            tx.send(M::from(msg)).map_err(|_| MailboxError::Closed)
        })
    }
}

// Manual impl: `derive(Clone)` would require `M: Clone`.
impl<M> Clone for Addr<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tx: self.tx.clone(),
        }
    }
}

impl<M> PartialEq for Addr<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M> Eq for Addr<M> {}

impl<M> fmt::Debug for Addr<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Addr").field("id", &self.id).finish()
    }
}

/// The receiving half of a component's queue.
pub struct Mailbox<M> {
    id: ActorId,
    rx: mpsc::UnboundedReceiver<M>,
}

impl<M> Mailbox<M> {
    /// Returns the identity of the component that owns this mailbox.
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Waits for the next message.
    ///
    /// Returns `None` once every [`Addr`] has been dropped and the queue
    /// is drained.
    pub async fn recv(&mut self) -> Option<M> {
        self.rx.recv().await
    }

    /// Takes the next message if one is already queued.
    pub fn try_recv(&mut self) -> Option<M> {
        self.rx.try_recv().ok()
    }
}

impl<M> fmt::Debug for Mailbox<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox").field("id", &self.id).finish()
    }
}
