//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tavern_room::RoomDefaults;
use tavern_session::SessionConfig;
use tavern_transport::DEFAULT_MAX_FRAME_LEN;

/// Everything the server needs to start, built once and passed to
/// [`TavernServer::builder`](crate::TavernServer::builder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to.
    ///
    /// Default: `127.0.0.1:7400`.
    pub bind_addr: String,

    pub session: SessionConfig,

    pub rooms: RoomDefaults,

    /// How long shutdown waits for connections and sessions to wind down
    /// before giving up on them.
    ///
    /// Default: 5 seconds.
    pub shutdown_grace: Duration,

    /// Largest inbound frame accepted. Larger frames end the connection.
    ///
    /// Default: 1 MiB.
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7400".to_string(),
            session: SessionConfig::default(),
            rooms: RoomDefaults::default(),
            shutdown_grace: Duration::from_secs(5),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}
