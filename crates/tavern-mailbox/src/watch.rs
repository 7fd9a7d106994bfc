//! Termination watches.
//!
//! A watch is an explicit subscription: the watcher asks to be told when
//! another component ends, and later receives a single [`Terminated`]
//! message through its own mailbox. There is no supervision tree; what the
//! watcher does with the notification is up to it.

use tokio_util::sync::CancellationToken;

use crate::{ActorId, Addr, Recipient};

/// Delivered to a watcher when the watched component has terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminated {
    /// Identity of the component that ended.
    pub id: ActorId,
}

/// An active subscription created by [`watch`].
///
/// Dropping the `Watch` does not cancel it; call [`Watch::unwatch`].
#[derive(Debug)]
pub struct Watch {
    target: ActorId,
    cancel: CancellationToken,
}

impl Watch {
    /// Identity of the watched component.
    pub fn target(&self) -> ActorId {
        self.target
    }

    /// Cancels the subscription. No `Terminated` will be delivered after
    /// this returns, unless it was already enqueued.
    pub fn unwatch(self) {
        self.cancel.cancel();
    }
}

/// Subscribes `watcher` to the termination of `target`.
///
/// If the target has already terminated, the notification is delivered
/// right away.
pub fn watch<M>(target: &Addr<M>, watcher: Recipient<Terminated>) -> Watch
where
    M: Send + 'static,
{
    let id = target.id();
    let target = target.clone();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::trace!(target_id = %id, "watch cancelled");
            }
            _ = target.closed() => {
                if watcher.send(Terminated { id }).is_err() {
                    tracing::trace!(target_id = %id, "watcher gone before termination");
                }
            }
        }
    });

    Watch { target: id, cancel }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mailbox;

    #[tokio::test]
    async fn test_watch_delivers_terminated_once_target_ends() {
        let (target, target_mb) = mailbox::<()>();
        let (watcher, mut watcher_mb) = mailbox::<Terminated>();

        let w = watch(&target, watcher.recipient());
        assert_eq!(w.target(), target.id());

        drop(target_mb);

        let note = watcher_mb.recv().await.unwrap();
        assert_eq!(note.id, target.id());
    }

    #[tokio::test]
    async fn test_watch_on_already_dead_target_fires_immediately() {
        let (target, target_mb) = mailbox::<()>();
        drop(target_mb);
        let (watcher, mut watcher_mb) = mailbox::<Terminated>();

        let _w = watch(&target, watcher.recipient());

        assert_eq!(watcher_mb.recv().await.unwrap().id, target.id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unwatch_suppresses_notification() {
        let (target, target_mb) = mailbox::<()>();
        let (watcher, mut watcher_mb) = mailbox::<Terminated>();

        let w = watch(&target, watcher.recipient());
        w.unwatch();
        // Let the watch task observe the cancellation first.
        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(target_mb);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(watcher_mb.try_recv().is_none());
    }
}
