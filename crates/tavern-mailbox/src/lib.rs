//! Mailbox substrate for Tavern components.
//!
//! Every stateful component in Tavern (a session, a room, a registry) is
//! an isolated Tokio task that owns its state and processes messages one
//! at a time from its own queue. This crate provides the plumbing those
//! tasks share:
//!
//! - [`mailbox`] — creates an ordered queue and the [`Addr`] used to
//!   reach it
//! - [`Recipient`] — a narrowed address that accepts a single message
//!   type, used when a component should not know who it is talking to
//! - [`watch`] — a one-shot subscription to another component's
//!   termination
//! - [`DeadlineTimer`] — a rearmable timer whose expiry is delivered to
//!   the owner's own mailbox
//!
//! # How it fits in the stack
//!
//! ```text
//! Session / Room / Registries (above)  ← own their state, run a recv loop
//!     ↕
//! Mailbox substrate (this crate)       ← queues, handles, watches, timers
//!     ↕
//! Tokio (below)                         ← tasks, channels, time
//! ```

mod addr;
mod error;
mod recipient;
mod timer;
mod watch;

pub use addr::{ActorId, Addr, Mailbox, mailbox};
pub use error::MailboxError;
pub use recipient::Recipient;
pub use timer::{DeadlineTimer, TimerTick};
pub use watch::{Terminated, Watch, watch};
