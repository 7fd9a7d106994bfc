//! Connections and their two halves.
//!
//! A connection is split once, right after accept: the reader half goes to
//! the per-connection read loop and the writer half to the session. The
//! halves share a close signal so that closing the writer also tells the
//! read loop to stop.

use std::net::SocketAddr;
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::frame::{DEFAULT_MAX_FRAME_LEN, FrameReader, FrameWriter};
use crate::{ConnectionId, TransportError};

type BoxReader = Pin<Box<dyn AsyncRead + Send>>;
type BoxWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// An accepted connection, not yet split.
pub struct Connection {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    reader: ConnectionReader,
    writer: ConnectionWriter,
}

impl Connection {
    /// Wraps any byte stream as a framed connection.
    ///
    /// Used by the TCP listener, and by tests with `tokio::io::duplex`.
    pub fn from_stream<S>(
        id: ConnectionId,
        peer: Option<SocketAddr>,
        stream: S,
        max_frame_len: usize,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(stream);
        Self::from_parts(id, peer, Box::pin(read), Box::pin(write), max_frame_len)
    }

    pub(crate) fn from_parts(
        id: ConnectionId,
        peer: Option<SocketAddr>,
        read: BoxReader,
        write: BoxWriter,
        max_frame_len: usize,
    ) -> Self {
        let closed = CancellationToken::new();
        Self {
            id,
            peer,
            reader: ConnectionReader {
                id,
                frames: FrameReader::new(read).max_frame_len(max_frame_len),
                closed: closed.clone(),
            },
            writer: ConnectionWriter {
                id,
                frames: FrameWriter::new(write),
                closed,
            },
        }
    }

    /// Wraps a stream with the default frame limit.
    pub fn with_default_limit<S>(id: ConnectionId, stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::from_stream(id, None, stream, DEFAULT_MAX_FRAME_LEN)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Remote address, when the connection came from a socket.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Splits the connection into its read and write halves.
    pub fn split(self) -> (ConnectionReader, ConnectionWriter) {
        (self.reader, self.writer)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Reader half
// ---------------------------------------------------------------------------

/// The inbound half: yields one frame payload at a time.
pub struct ConnectionReader {
    id: ConnectionId,
    frames: FrameReader<BoxReader>,
    closed: CancellationToken,
}

impl ConnectionReader {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Receives the next frame.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly.
    ///
    /// # Errors
    /// [`TransportError::ReceiveFailed`] on I/O errors, oversized frames,
    /// and EOF in the middle of a frame.
    pub async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        self.frames
            .read_frame()
            .await
            .map_err(TransportError::ReceiveFailed)
    }

    /// Resolves once the writer half has been closed or dropped.
    ///
    /// The returned future does not borrow the reader, so it can be raced
    /// against [`recv`](Self::recv) in a `select!`.
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        self.closed.clone().cancelled_owned()
    }

    /// Returns `true` once the writer half has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

// ---------------------------------------------------------------------------
// Writer half
// ---------------------------------------------------------------------------

/// The outbound half. Closing (or dropping) it signals the reader half.
pub struct ConnectionWriter {
    id: ConnectionId,
    frames: FrameWriter<BoxWriter>,
    closed: CancellationToken,
}

impl ConnectionWriter {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Writes and flushes one frame.
    ///
    /// # Errors
    /// - [`TransportError::ConnectionClosed`] after [`close`](Self::close)
    /// - [`TransportError::SendFailed`] on I/O errors
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::ConnectionClosed);
        }
        self.frames
            .write_frame(payload)
            .await
            .map_err(TransportError::SendFailed)?;
        self.frames.flush().await.map_err(TransportError::SendFailed)
    }

    /// Shuts down the write side of the stream and signals the reader.
    ///
    /// Idempotent. The shutdown error, if any, is logged and swallowed:
    /// the connection is considered closed either way.
    pub async fn close(&mut self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        if let Err(e) = self.frames.shutdown().await {
            tracing::debug!(conn_id = %self.id, error = %e, "error shutting down connection");
        }
    }
}

impl Drop for ConnectionWriter {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}
