//! Rearmable deadline timers.
//!
//! A component that needs a timeout never races a separate timer thread
//! for its own state. Instead the timer, on expiry, enqueues a message into
//! the owner's mailbox, and the owner handles it in order like any other
//! message. Cancellation and mutation therefore always happen on the same
//! sequential stream.
//!
//! Re-arming bumps a generation counter. An expiry that was already queued
//! before a re-arm carries the old generation, so the owner can recognise
//! and drop it with [`DeadlineTimer::is_current`].

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Addr;

/// Generation token identifying one arming of a [`DeadlineTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTick(u64);

/// A single-shot timer that delivers its expiry to its owner's mailbox.
///
/// The timer only holds a weak reference to the mailbox, so it never keeps
/// a terminated component's queue alive.
pub struct DeadlineTimer<M> {
    owner: mpsc::WeakUnboundedSender<M>,
    generation: u64,
    armed: bool,
    task: Option<JoinHandle<()>>,
}

impl<M: Send + 'static> DeadlineTimer<M> {
    /// Creates a disarmed timer that will deliver to `owner`.
    pub fn new(owner: &Addr<M>) -> Self {
        Self {
            owner: owner.downgrade(),
            generation: 0,
            armed: false,
            task: None,
        }
    }

    /// Arms the timer, replacing any previous arming.
    ///
    /// After `after` elapses, `make(tick)` is enqueued into the owner's
    /// mailbox. The returned tick identifies this arming.
    pub fn arm<F>(&mut self, after: Duration, make: F) -> TimerTick
    where
        F: FnOnce(TimerTick) -> M + Send + 'static,
    {
        self.abort_task();
        self.generation += 1;
        self.armed = true;
        let tick = TimerTick(self.generation);
        let weak = self.owner.clone();

        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(make(tick));
            }
        }));

        tick
    }

    /// Disarms the timer. Any expiry already in the mailbox becomes stale.
    pub fn cancel(&mut self) {
        self.abort_task();
        self.armed = false;
    }

    /// Returns `true` if `tick` belongs to the current, still-armed arming.
    ///
    /// Owners call this when an expiry message arrives and ignore it when
    /// it returns `false`. A current tick disarms the timer as a side
    /// effect: each arming fires at most once.
    pub fn is_current(&mut self, tick: TimerTick) -> bool {
        if self.armed && tick.0 == self.generation {
            self.armed = false;
            self.task = None;
            true
        } else {
            false
        }
    }

    /// Returns `true` while an arming is pending.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<M> Drop for DeadlineTimer<M> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox;

    #[derive(Debug, PartialEq)]
    enum Msg {
        Expired(TimerTick),
        Other,
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_delivers_expiry_after_duration() {
        let (addr, mut mb) = mailbox::<Msg>();
        let mut timer = DeadlineTimer::new(&addr);

        let tick = timer.arm(Duration::from_secs(5), Msg::Expired);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(mb.try_recv().is_none(), "should not fire early");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(mb.recv().await, Some(Msg::Expired(tick)));
        assert!(timer.is_current(tick));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_arming() {
        let (addr, mut mb) = mailbox::<Msg>();
        let mut timer = DeadlineTimer::new(&addr);

        let first = timer.arm(Duration::from_secs(5), Msg::Expired);
        tokio::time::sleep(Duration::from_secs(3)).await;
        let second = timer.arm(Duration::from_secs(5), Msg::Expired);
        assert_ne!(first, second);

        // The first arming would have fired at t=5.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(mb.try_recv().is_none());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(mb.recv().await, Some(Msg::Expired(second)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_expiry() {
        let (addr, mut mb) = mailbox::<Msg>();
        let mut timer = DeadlineTimer::new(&addr);

        timer.arm(Duration::from_secs(1), Msg::Expired);
        timer.cancel();
        addr.send(Msg::Other).unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(mb.recv().await, Some(Msg::Other));
        assert!(mb.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_tick_is_not_current() {
        let (addr, mut mb) = mailbox::<Msg>();
        let mut timer = DeadlineTimer::new(&addr);

        let stale = timer.arm(Duration::from_secs(1), Msg::Expired);
        tokio::time::sleep(Duration::from_secs(2)).await;
        // The expiry is queued but the owner re-arms before handling it.
        let fresh = timer.arm(Duration::from_secs(10), Msg::Expired);

        assert_eq!(mb.recv().await, Some(Msg::Expired(stale)));
        assert!(!timer.is_current(stale));
        assert!(timer.is_armed());
        assert_ne!(stale, fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_does_not_keep_owner_alive() {
        let (addr, mut mb) = mailbox::<Msg>();
        let mut timer = DeadlineTimer::new(&addr);
        timer.arm(Duration::from_secs(60), Msg::Expired);

        drop(addr);
        // Only the timer references the mailbox now, and weakly.
        assert_eq!(mb.recv().await, None);
    }
}
