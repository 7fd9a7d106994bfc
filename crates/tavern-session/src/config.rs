//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts and limits applied to every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long a new connection may stay unauthenticated. Re-armed after
    /// each failed attempt.
    ///
    /// Default: 10 seconds.
    pub auth_timeout: Duration,

    /// How long an authenticated session may go without any inbound
    /// message. Every message slides the window.
    ///
    /// Default: 5 minutes.
    pub activity_timeout: Duration,

    /// Consecutive failed `AUTH` attempts before the connection is closed.
    /// `None` allows unlimited retries within the auth timeout.
    ///
    /// Default: 5.
    pub max_auth_attempts: Option<u32>,

    /// How long a terminating session waits for queued outbound frames to
    /// drain before dropping the connection.
    ///
    /// Default: 2 seconds.
    pub flush_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(10),
            activity_timeout: Duration::from_secs(300),
            max_auth_attempts: Some(5),
            flush_timeout: Duration::from_secs(2),
        }
    }
}
