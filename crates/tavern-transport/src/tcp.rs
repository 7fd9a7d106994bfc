//! TCP listener.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, ToSocketAddrs};

use crate::frame::DEFAULT_MAX_FRAME_LEN;
use crate::{Connection, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Accepts TCP connections and wraps them as framed [`Connection`]s.
#[derive(Debug)]
pub struct TcpTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl TcpTransport {
    /// Binds a listener to `addr`.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        if let Ok(local) = listener.local_addr() {
            tracing::info!(addr = %local, "TCP transport listening");
        }
        Ok(Self {
            listener,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        })
    }

    /// Sets the inbound frame limit applied to every accepted connection.
    pub fn max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max;
        self
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::BindFailed)
    }

    /// Waits for and accepts the next incoming connection.
    pub async fn accept(&self) -> Result<Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%addr, error = %e, "failed to set TCP_NODELAY");
        }

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "accepted TCP connection");

        let (read, write) = stream.into_split();
        Ok(Connection::from_parts(
            id,
            Some(addr),
            Box::pin(read),
            Box::pin(write),
            self.max_frame_len,
        ))
    }
}
