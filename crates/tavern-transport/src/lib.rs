//! Transport layer for Tavern.
//!
//! Byte streams in, frames out. [`TcpTransport`] accepts sockets; every
//! accepted socket becomes a [`Connection`] that is split into a
//! [`ConnectionReader`] (owned by the read loop) and a
//! [`ConnectionWriter`] (owned by the session). Frames use a 4-byte
//! big-endian length prefix; see [`frame`].

mod connection;
mod error;
pub mod frame;
mod tcp;

pub use connection::{Connection, ConnectionReader, ConnectionWriter};
pub use error::TransportError;
pub use frame::{DEFAULT_MAX_FRAME_LEN, FrameReader, FrameWriter};
pub use tcp::TcpTransport;

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }
}
