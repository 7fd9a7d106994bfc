//! # Tavern
//!
//! An actor-based multiplayer session and room server.
//!
//! Every connection gets a session actor; every room is an actor; a room
//! registry and a world registry coordinate them. Components share no
//! mutable state and talk only through mailboxes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tavern::prelude::*;
//!
//! # async fn start() -> Result<(), TavernError> {
//! let server = TavernServer::builder()
//!     .bind("127.0.0.1:7400")
//!     .build(
//!         StaticTokenAuthenticator::new().with_token("secret", "alice"),
//!         MemoryPlayerStore::new(),
//!         NoActionService,
//!     )
//!     .await?;
//! server.run().await
//! # }
//! ```

mod acceptor;
mod config;
mod error;
mod server;

pub use config::ServerConfig;
pub use error::TavernError;
pub use server::{ShutdownHandle, TavernServer, TavernServerBuilder};

/// Common imports for applications embedding Tavern.
pub mod prelude {
    pub use crate::{ServerConfig, ShutdownHandle, TavernError, TavernServer, TavernServerBuilder};
    pub use tavern_protocol::{ClientRequest, ErrorCode, PlayerId, RoomCriteria, RoomId, ServerMessage};
    pub use tavern_room::{RoomDefaults, RoomError, RoomRegistry, RoomSpec};
    pub use tavern_session::{
        ActionDescriptor, ActionError, ActionService, Authenticator, MemoryPlayerStore,
        NoActionService, PlayerData, PlayerStore, PreparedAction, SessionConfig, SessionError,
        StaticTokenAuthenticator, StoreError, WorldRegistry,
    };
}
