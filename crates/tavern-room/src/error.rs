//! Error types for the room layer.

use tavern_protocol::{ErrorCode, PlayerId, RoomId};

/// Errors that can occur during room and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No live room has this ID.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// No live room matches an unspecific search.
    #[error("no room with free capacity matches")]
    NoneAvailable,

    /// The room is full.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The player already occupies a slot in this room.
    #[error("player {0} already in room {1}")]
    AlreadyMember(PlayerId, RoomId),

    /// A live room already uses this ID.
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    /// Rooms must hold at least one member.
    #[error("invalid room capacity {0}")]
    InvalidCapacity(usize),

    /// The room's mailbox is closed; it has stopped.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// The registry's mailbox is closed.
    #[error("room registry is unavailable")]
    RegistryUnavailable,
}

impl RoomError {
    /// The wire error code reported to the requesting client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) | Self::NoneAvailable | Self::Unavailable(_) => ErrorCode::NotFound,
            Self::RoomFull(_) => ErrorCode::CapacityError,
            Self::AlreadyMember(..) => ErrorCode::AlreadyMember,
            Self::AlreadyExists(_) => ErrorCode::AlreadyExists,
            Self::InvalidCapacity(_) => ErrorCode::ProtocolError,
            Self::RegistryUnavailable => ErrorCode::InternalError,
        }
    }
}
