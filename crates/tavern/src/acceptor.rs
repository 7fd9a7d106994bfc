//! Per-connection wiring: one session actor plus one read loop.
//!
//! The read loop owns the reader half and only ever talks to the session
//! through its handle. The session owns the writer half; closing it ends
//! the read loop.

use std::sync::Arc;

use tavern_session::{
    ActionService, Authenticator, PlayerStore, Session, SessionHandle, SessionServices,
};
use tavern_transport::{Connection, ConnectionReader};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Spawns the session and read loop for a freshly accepted connection.
/// Both tasks are tracked so shutdown can wait for them.
pub(crate) fn spawn_connection<A, P, L>(
    conn: Connection,
    services: &Arc<SessionServices<A, P, L>>,
    tracker: &TaskTracker,
    shutdown: CancellationToken,
) where
    A: Authenticator,
    P: PlayerStore,
    L: ActionService,
{
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    let (reader, writer) = conn.split();

    let (session, actor) = Session::new(Arc::clone(services));
    tracker.spawn(actor.run());

    if session.connected(writer).is_err() {
        tracing::warn!(%conn_id, "session exited before it was connected");
        return;
    }
    tracing::info!(%conn_id, ?peer, session = %session.id(), "connection accepted");

    tracker.spawn(read_loop(reader, session, shutdown));
}

/// Feeds inbound frames to the session until the peer goes away, the
/// session closes the connection, or the server shuts down.
async fn read_loop(mut reader: ConnectionReader, session: SessionHandle, shutdown: CancellationToken) {
    let conn_id = reader.id();
    let closed = reader.closed();
    tokio::pin!(closed);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                let _ = session.stop("server shutting down");
                break;
            }
            _ = &mut closed => {
                tracing::debug!(%conn_id, "connection closed by session");
                break;
            }
            frame = reader.recv() => match frame {
                Ok(Some(frame)) => {
                    if session.client_message(frame).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = session.disconnected("peer closed connection");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "read failed");
                    let _ = session.disconnected(e.to_string());
                    break;
                }
            },
        }
    }

    tracing::debug!(%conn_id, "read loop exited");
}
