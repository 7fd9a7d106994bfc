//! `TavernServer` builder and accept loop.
//!
//! This is the entry point for running a Tavern server. It ties together
//! all the layers: transport → session → rooms, plus the world registry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tavern_room::{RoomDefaults, RoomRegistry};
use tavern_session::{
    ActionService, Authenticator, PlayerStore, SessionConfig, SessionServices, WorldRegistry,
};
use tavern_transport::TcpTransport;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::acceptor::spawn_connection;
use crate::{ServerConfig, TavernError};

/// Builder for configuring and starting a Tavern server.
///
/// # Example
///
/// ```rust,no_run
/// use tavern::prelude::*;
///
/// # async fn start() -> Result<(), TavernError> {
/// let auth = StaticTokenAuthenticator::new().with_token("secret", "alice");
/// let server = TavernServer::builder()
///     .bind("0.0.0.0:7400")
///     .build(auth, MemoryPlayerStore::new(), NoActionService)
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct TavernServerBuilder {
    config: ServerConfig,
}

impl TavernServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Replaces the whole configuration. Call before the narrower setters.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn room_defaults(mut self, defaults: RoomDefaults) -> Self {
        self.config.rooms = defaults;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    pub fn max_frame_len(mut self, max: usize) -> Self {
        self.config.max_frame_len = max;
        self
    }

    /// Binds the listener and spawns the registries.
    ///
    /// The room registry creates the configured default room before it
    /// answers any other request.
    pub async fn build<A, P, L>(
        self,
        auth: A,
        store: P,
        actions: L,
    ) -> Result<TavernServer<A, P, L>, TavernError>
    where
        A: Authenticator,
        P: PlayerStore,
        L: ActionService,
    {
        let config = self.config;
        let transport = TcpTransport::bind(config.bind_addr.as_str())
            .await?
            .max_frame_len(config.max_frame_len);

        let services = Arc::new(SessionServices {
            config: config.session,
            auth,
            store,
            actions,
            rooms: RoomRegistry::spawn(config.rooms),
            world: WorldRegistry::spawn(),
        });

        Ok(TavernServer {
            transport,
            services,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            shutdown_grace: config.shutdown_grace,
        })
    }
}

/// Triggers a graceful shutdown of a running [`TavernServer`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    /// Stops accepting and asks every session to close. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A bound Tavern server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TavernServer<A, P, L> {
    transport: TcpTransport,
    services: Arc<SessionServices<A, P, L>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    shutdown_grace: Duration,
}

impl TavernServer<(), (), ()> {
    /// Creates a new builder.
    pub fn builder() -> TavernServerBuilder {
        TavernServerBuilder::new()
    }
}

impl<A, P, L> TavernServer<A, P, L>
where
    A: Authenticator,
    P: PlayerStore,
    L: ActionService,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, TavernError> {
        Ok(self.transport.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            token: self.shutdown.clone(),
        }
    }

    /// The room registry, for creating rooms from outside a session.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.services.rooms
    }

    pub fn world(&self) -> &WorldRegistry {
        &self.services.world
    }

    /// Runs the accept loop until [`ShutdownHandle::shutdown`] is called,
    /// then winds everything down.
    ///
    /// Shutdown closes the listener, stops every session (each gets a
    /// final notice), waits up to the configured grace period for them to
    /// exit, and finally stops the registries.
    pub async fn run(self) -> Result<(), TavernError> {
        let Self {
            transport,
            services,
            shutdown,
            tracker,
            shutdown_grace,
        } = self;
        tracing::info!(addr = ?transport.local_addr().ok(), "Tavern server running");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = transport.accept() => match accepted {
                    Ok(conn) => spawn_connection(conn, &services, &tracker, shutdown.clone()),
                    Err(e) => tracing::error!(error = %e, "accept failed"),
                },
            }
        }

        drop(transport);
        tracker.close();
        tracing::info!(tasks = tracker.len(), "shutting down, waiting for sessions");

        if tokio::time::timeout(shutdown_grace, tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = tracker.len(),
                "shutdown grace period expired, abandoning sessions"
            );
        }

        if let Err(e) = services.rooms.stop().await {
            tracing::debug!(error = %e, "room registry already stopped");
        }
        if let Err(e) = services.world.stop() {
            tracing::debug!(error = %e, "world registry already stopped");
        }

        tracing::info!("Tavern server stopped");
        Ok(())
    }
}
