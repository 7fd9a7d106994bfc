//! Rooms for Tavern.
//!
//! Each room runs as an isolated Tokio task that owns its member map. The
//! [`RoomRegistry`] is itself an actor: it creates rooms, caches their
//! populations, and resolves join criteria.
//!
//! # Key types
//!
//! - [`RoomHandle`] — send commands to a running room
//! - [`RoomNotice`] — what a room delivers to its members
//! - [`RoomRegistry`] — create, find, and list rooms
//! - [`RoomState`] — lifecycle state machine
//! - [`RoomConfig`], [`RoomSpec`], [`RoomDefaults`] — room settings

mod config;
mod error;
mod registry;
mod room;

pub use config::{RoomConfig, RoomDefaults, RoomSpec, RoomState};
pub use error::RoomError;
pub use registry::{RegistryMsg, RoomRegistry};
pub use room::{
    JoinedRoom, PopulationChanged, RoomHandle, RoomInfo, RoomMsg, RoomNotice, spawn_room,
};
