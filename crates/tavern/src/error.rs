//! Unified error type for the Tavern server.

use tavern_mailbox::MailboxError;
use tavern_protocol::ProtocolError;
use tavern_room::RoomError;
use tavern_session::{SessionError, StoreError};
use tavern_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TavernError {
    /// Binding, accepting, reading or writing a connection.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a wire message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A component's mailbox closed underneath a caller.
    #[error(transparent)]
    Mailbox(#[from] MailboxError),
}
