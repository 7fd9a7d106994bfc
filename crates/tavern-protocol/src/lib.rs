//! Wire protocol for Tavern.
//!
//! - **Types** ([`Envelope`], [`ClientRequest`], [`ServerMessage`],
//!   [`ErrorCode`], identifiers) — the messages that travel on the wire.
//! - **Codec** ([`encode`], [`decode`], [`decode_request`]) — JSON
//!   conversion for the bytes inside one frame.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (frames of bytes) and the
//! session (per-connection state). It knows nothing about sockets, rooms
//! or players beyond their identifiers.
//!
//! ```text
//! Transport (frames) → Protocol (ClientRequest / ServerMessage) → Session
//! ```

mod codec;
mod error;
mod types;

pub use codec::{decode, decode_request, encode, request_from_envelope};
pub use error::ProtocolError;
pub use types::{
    AuthRequest, AuthResponse, ChatMessage, ClientRequest, CreateRoomRequest,
    CreateRoomResponse, Envelope, ErrorCode, ErrorMessage, JoinRoomRequest,
    JoinRoomResponse, LeaveRoomResponse, PingRequest, PlayerActionRequest,
    PlayerActionResponse, PlayerId, Pong, RoomClosing, RoomCriteria, RoomId,
    RoomList, RoomMemberEvent, RoomSummary, SendChatRequest, ServerMessage,
    SimpleMessage,
};
