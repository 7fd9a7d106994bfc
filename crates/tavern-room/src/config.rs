//! Room configuration and state machine.

use serde::{Deserialize, Serialize};
use tavern_protocol::RoomId;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Fully resolved settings of one room instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub room_id: RoomId,
    /// Display name. Several rooms may share a name.
    pub name: String,
    /// Maximum number of members. Never zero.
    pub capacity: usize,
    /// Persistent rooms stay open when their last member leaves.
    pub persistent: bool,
}

// ---------------------------------------------------------------------------
// RoomSpec
// ---------------------------------------------------------------------------

/// A request to create a room. Unset fields are filled from
/// [`RoomDefaults`] by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSpec {
    /// `None` lets the registry allocate a `room-<n>` ID.
    pub room_id: Option<RoomId>,
    /// `None` uses the room ID as the name.
    pub name: Option<String>,
    /// `None` uses [`RoomDefaults::capacity`].
    pub capacity: Option<usize>,
    pub persistent: bool,
}

impl RoomSpec {
    /// An ad hoc room with every field defaulted.
    pub fn ad_hoc() -> Self {
        Self::default()
    }

    /// A persistent room with a fixed ID.
    pub fn persistent(room_id: impl Into<String>) -> Self {
        Self {
            room_id: Some(RoomId::new(room_id)),
            persistent: true,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

// ---------------------------------------------------------------------------
// RoomDefaults
// ---------------------------------------------------------------------------

/// Registry-wide room settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomDefaults {
    /// Capacity used when a request doesn't name one.
    pub capacity: usize,

    /// Room created at startup, if any. It is the target of
    /// `JOIN_ROOM` with a bare `"lobby"` criteria in the default setup.
    pub default_room: Option<RoomSpec>,
}

impl Default for RoomDefaults {
    fn default() -> Self {
        Self {
            capacity: 64,
            default_room: Some(RoomSpec::persistent("lobby").with_name("Lobby")),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions are one-way:
///
/// ```text
/// Active → Closing → Stopped
/// ```
///
/// - **Active**: accepting joins, leaves, and broadcasts.
/// - **Closing**: members are being told the room is going away. No
///   further messages are processed.
/// - **Stopped**: the room's mailbox is gone; the registry will evict it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Active,
    Closing,
    Stopped,
}

impl RoomState {
    /// Returns `true` if the room is accepting new members.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns the next state, or `None` from the terminal state.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Active => Some(Self::Closing),
            Self::Closing => Some(Self::Stopped),
            Self::Stopped => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Closing => write!(f, "Closing"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}
