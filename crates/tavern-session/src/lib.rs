//! Player sessions for Tavern.
//!
//! One session actor runs per connection. It authenticates the player,
//! routes their commands to rooms, relays room notices back, and enforces
//! the auth and inactivity deadlines.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / acceptor (above)  ← feeds frames in, owns the read loop
//!     ↕
//! Session Layer (this crate)  ← identity, deadlines, command routing
//!     ↕
//! Room Layer (below)  ← rooms and the room registry
//! ```
//!
//! Three collaborator traits plug application behavior in:
//! [`Authenticator`], [`PlayerStore`], and [`ActionService`]. The
//! [`WorldRegistry`] tracks who is online.

mod action;
mod auth;
mod config;
mod error;
mod session;
mod store;
mod world;

pub use action::{ActionDescriptor, ActionError, ActionService, NoActionService, PreparedAction};
pub use auth::{Authenticator, StaticTokenAuthenticator};
pub use config::SessionConfig;
pub use error::SessionError;
pub use session::{
    ActionOutcome, DeadlineKind, Session, SessionHandle, SessionMsg, SessionServices,
    SessionState, spawn_session,
};
pub use store::{MemoryPlayerStore, PlayerData, PlayerStore, StoreError};
pub use world::{WorldMsg, WorldRegistry};
