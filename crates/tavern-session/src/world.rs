//! World registry: who is online right now.
//!
//! The world registry is the authority on "this player is connected and
//! authenticated". It knows nothing about rooms. Sessions announce
//! themselves after a successful `AUTH` and retract on termination.
//! Queries go through the mailbox like everything else.

use std::collections::HashMap;

use tavern_mailbox::{ActorId, Addr, Mailbox, mailbox};
use tavern_protocol::PlayerId;
use tokio::sync::oneshot;

use crate::{SessionError, SessionHandle};

/// Messages processed by the world registry actor.
pub enum WorldMsg {
    PlayerEntered {
        player_id: PlayerId,
        session: SessionHandle,
    },
    PlayerLeft {
        player_id: PlayerId,
        session: ActorId,
    },
    IsOnline {
        player_id: PlayerId,
        reply: oneshot::Sender<bool>,
    },
    OnlineCount {
        reply: oneshot::Sender<usize>,
    },
    OnlinePlayers {
        reply: oneshot::Sender<Vec<PlayerId>>,
    },
    SessionOf {
        player_id: PlayerId,
        reply: oneshot::Sender<Option<SessionHandle>>,
    },
    Stop,
}

// ---------------------------------------------------------------------------
// WorldRegistry (handle)
// ---------------------------------------------------------------------------

/// Handle to the running world registry actor.
#[derive(Debug, Clone)]
pub struct WorldRegistry {
    addr: Addr<WorldMsg>,
}

impl WorldRegistry {
    /// Spawns the world registry actor.
    pub fn spawn() -> Self {
        let (addr, mailbox) = mailbox();
        let actor = WorldActor {
            players: HashMap::new(),
            mailbox,
        };
        tokio::spawn(actor.run());
        Self { addr }
    }

    /// Records that `player_id` is online through `session`.
    ///
    /// If the player is already online through another session the
    /// existing entry is kept.
    pub fn player_entered(
        &self,
        player_id: PlayerId,
        session: SessionHandle,
    ) -> Result<(), SessionError> {
        self.send(WorldMsg::PlayerEntered { player_id, session })
    }

    /// Records that `session` no longer represents `player_id`.
    pub fn player_left(&self, player_id: PlayerId, session: ActorId) -> Result<(), SessionError> {
        self.send(WorldMsg::PlayerLeft { player_id, session })
    }

    pub async fn is_online(&self, player_id: PlayerId) -> Result<bool, SessionError> {
        self.addr
            .ask(|reply| WorldMsg::IsOnline { player_id, reply })
            .await
            .map_err(|_| SessionError::WorldUnavailable)
    }

    pub async fn online_count(&self) -> Result<usize, SessionError> {
        self.addr
            .ask(|reply| WorldMsg::OnlineCount { reply })
            .await
            .map_err(|_| SessionError::WorldUnavailable)
    }

    /// All online players, sorted.
    pub async fn online_players(&self) -> Result<Vec<PlayerId>, SessionError> {
        self.addr
            .ask(|reply| WorldMsg::OnlinePlayers { reply })
            .await
            .map_err(|_| SessionError::WorldUnavailable)
    }

    /// The session currently representing `player_id`, e.g. to stop it.
    pub async fn session_of(
        &self,
        player_id: PlayerId,
    ) -> Result<Option<SessionHandle>, SessionError> {
        self.addr
            .ask(|reply| WorldMsg::SessionOf { player_id, reply })
            .await
            .map_err(|_| SessionError::WorldUnavailable)
    }

    pub fn stop(&self) -> Result<(), SessionError> {
        self.send(WorldMsg::Stop)
    }

    pub fn addr(&self) -> &Addr<WorldMsg> {
        &self.addr
    }

    fn send(&self, msg: WorldMsg) -> Result<(), SessionError> {
        self.addr
            .send(msg)
            .map_err(|_| SessionError::WorldUnavailable)
    }
}

// ---------------------------------------------------------------------------
// WorldActor
// ---------------------------------------------------------------------------

struct WorldActor {
    players: HashMap<PlayerId, SessionHandle>,
    mailbox: Mailbox<WorldMsg>,
}

impl WorldActor {
    async fn run(mut self) {
        tracing::info!("world registry started");

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                WorldMsg::PlayerEntered { player_id, session } => {
                    self.handle_entered(player_id, session);
                }
                WorldMsg::PlayerLeft { player_id, session } => {
                    self.handle_left(player_id, session);
                }
                WorldMsg::IsOnline { player_id, reply } => {
                    let _ = reply.send(self.players.contains_key(&player_id));
                }
                WorldMsg::OnlineCount { reply } => {
                    let _ = reply.send(self.players.len());
                }
                WorldMsg::OnlinePlayers { reply } => {
                    let mut players: Vec<PlayerId> = self.players.keys().cloned().collect();
                    players.sort();
                    let _ = reply.send(players);
                }
                WorldMsg::SessionOf { player_id, reply } => {
                    let _ = reply.send(self.players.get(&player_id).cloned());
                }
                WorldMsg::Stop => break,
            }
        }

        tracing::info!(online = self.players.len(), "world registry stopped");
    }

    fn handle_entered(&mut self, player_id: PlayerId, session: SessionHandle) {
        if let Some(existing) = self.players.get(&player_id) {
            tracing::warn!(
                %player_id,
                existing = %existing.id(),
                duplicate = %session.id(),
                "player already online, keeping first session"
            );
            return;
        }
        tracing::debug!(%player_id, session = %session.id(), "player entered world");
        self.players.insert(player_id, session);
    }

    fn handle_left(&mut self, player_id: PlayerId, session: ActorId) {
        match self.players.get(&player_id) {
            Some(stored) if stored.id() == session => {
                self.players.remove(&player_id);
                tracing::debug!(%player_id, "player left world");
            }
            Some(_) => {
                tracing::debug!(%player_id, %session, "leave from non-registered session, ignoring");
            }
            None => {
                tracing::debug!(%player_id, "leave for unknown player, ignoring");
            }
        }
    }
}
