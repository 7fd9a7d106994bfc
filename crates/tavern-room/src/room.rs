//! Room actor: an isolated task that owns one room's membership.
//!
//! Only the room mutates its member map. Everyone else talks to it through
//! its mailbox, via a [`RoomHandle`]. Members are held as
//! `Recipient<RoomNotice>`, so the room can notify a session without
//! knowing the session's full message type.

use std::collections::HashMap;

use tavern_mailbox::{ActorId, Addr, Mailbox, MailboxError, Recipient, mailbox};
use tavern_protocol::{PlayerId, RoomId};
use tokio::sync::oneshot;

use crate::{RoomConfig, RoomError, RoomState};

/// An event a room delivers to its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomNotice {
    /// Another player joined.
    MemberJoined { room_id: RoomId, player_id: PlayerId },
    /// Another player left.
    MemberLeft { room_id: RoomId, player_id: PlayerId },
    /// A chat line from a member.
    Chat {
        room_id: RoomId,
        player_id: PlayerId,
        text: String,
    },
    /// The room is shutting down; the receiver is no longer a member.
    Closing { room_id: RoomId },
}

impl RoomNotice {
    /// The room this notice came from.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::MemberJoined { room_id, .. }
            | Self::MemberLeft { room_id, .. }
            | Self::Chat { room_id, .. }
            | Self::Closing { room_id } => room_id,
        }
    }
}

/// Reported to the registry whenever the member count changes.
///
/// `room` identifies the room instance, so a report from a stopped room
/// can never update the entry of a newer room that reused its ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationChanged {
    pub room: ActorId,
    pub room_id: RoomId,
    pub members: usize,
}

/// What a successful join reports back to the joiner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    pub room_id: RoomId,
    pub name: String,
    /// Member count including the joiner.
    pub members: usize,
    pub capacity: usize,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub name: String,
    pub state: RoomState,
    pub members: Vec<PlayerId>,
    pub capacity: usize,
    pub persistent: bool,
}

/// Messages processed by a room actor.
pub enum RoomMsg {
    /// Add a member.
    Join {
        player_id: PlayerId,
        member: Recipient<RoomNotice>,
        reply: oneshot::Sender<Result<JoinedRoom, RoomError>>,
    },

    /// Remove a member. Ignored unless `member` is the handle that joined.
    Leave { player_id: PlayerId, member: ActorId },

    /// Fan a notice out to the members.
    Broadcast {
        notice: RoomNotice,
        sender: Option<PlayerId>,
        exclude_sender: bool,
    },

    /// Request a metadata snapshot.
    Info { reply: oneshot::Sender<RoomInfo> },

    /// Tell every member the room is closing, then stop.
    Stop,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone. Two handles are equal when they address the same room
/// instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomHandle {
    room_id: RoomId,
    addr: Addr<RoomMsg>,
}

impl RoomHandle {
    /// Returns the room's ID.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns the identity of this room instance.
    pub fn id(&self) -> ActorId {
        self.addr.id()
    }

    /// The raw mailbox address, for watching.
    pub fn addr(&self) -> &Addr<RoomMsg> {
        &self.addr
    }

    /// Asks the room to add `player_id`, delivering future notices to
    /// `member`.
    ///
    /// # Errors
    /// - [`RoomError::RoomFull`] / [`RoomError::AlreadyMember`] from the room
    /// - [`RoomError::Unavailable`] if the room has stopped
    pub async fn join(
        &self,
        player_id: PlayerId,
        member: Recipient<RoomNotice>,
    ) -> Result<JoinedRoom, RoomError> {
        self.addr
            .ask(|reply| RoomMsg::Join {
                player_id,
                member,
                reply,
            })
            .await
            .map_err(|_| self.unavailable())?
    }

    /// Removes `player_id`, if `member` is the handle that joined.
    pub fn leave(&self, player_id: PlayerId, member: ActorId) -> Result<(), RoomError> {
        self.send(RoomMsg::Leave { player_id, member })
    }

    /// Delivers `notice` to every member, skipping `sender` when
    /// `exclude_sender` is set.
    pub fn broadcast(
        &self,
        notice: RoomNotice,
        sender: Option<PlayerId>,
        exclude_sender: bool,
    ) -> Result<(), RoomError> {
        self.send(RoomMsg::Broadcast {
            notice,
            sender,
            exclude_sender,
        })
    }

    /// Relays a chat line from `player_id` to the other members.
    pub fn chat(&self, player_id: PlayerId, text: String) -> Result<(), RoomError> {
        let notice = RoomNotice::Chat {
            room_id: self.room_id.clone(),
            player_id: player_id.clone(),
            text,
        };
        self.broadcast(notice, Some(player_id), true)
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.addr
            .ask(|reply| RoomMsg::Info { reply })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Tells the room to close.
    pub fn stop(&self) -> Result<(), RoomError> {
        self.send(RoomMsg::Stop)
    }

    fn send(&self, msg: RoomMsg) -> Result<(), RoomError> {
        self.addr.send(msg).map_err(|_: MailboxError| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    id: ActorId,
    config: RoomConfig,
    state: RoomState,
    members: HashMap<PlayerId, Recipient<RoomNotice>>,
    registry: Option<Recipient<PopulationChanged>>,
    mailbox: Mailbox<RoomMsg>,
}

impl RoomActor {
    /// Processes messages until the room closes or every handle is gone.
    async fn run(mut self) {
        tracing::info!(
            room_id = %self.config.room_id,
            capacity = self.config.capacity,
            persistent = self.config.persistent,
            "room actor started"
        );

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                RoomMsg::Join {
                    player_id,
                    member,
                    reply,
                } => {
                    let result = self.handle_join(player_id, member);
                    let _ = reply.send(result);
                }
                RoomMsg::Leave { player_id, member } => {
                    self.handle_leave(player_id, member);
                }
                RoomMsg::Broadcast {
                    notice,
                    sender,
                    exclude_sender,
                } => {
                    self.handle_broadcast(notice, sender.as_ref(), exclude_sender);
                }
                RoomMsg::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomMsg::Stop => {
                    tracing::info!(room_id = %self.config.room_id, "room stop requested");
                    self.transition(RoomState::Closing);
                }
            }

            if self.state == RoomState::Closing {
                self.close();
                break;
            }
        }

        self.transition(RoomState::Stopped);
        tracing::info!(room_id = %self.config.room_id, "room actor stopped");
    }

    /// Moves along `Active → Closing → Stopped`. Anything else is ignored.
    fn transition(&mut self, target: RoomState) {
        if !self.state.can_transition_to(target) {
            tracing::debug!(
                room_id = %self.config.room_id,
                from = %self.state,
                to = %target,
                "invalid room state transition ignored"
            );
            return;
        }
        tracing::debug!(
            room_id = %self.config.room_id,
            from = %self.state,
            to = %target,
            "room state changed"
        );
        self.state = target;
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        member: Recipient<RoomNotice>,
    ) -> Result<JoinedRoom, RoomError> {
        let room_id = &self.config.room_id;
        if !self.state.is_joinable() {
            return Err(RoomError::Unavailable(room_id.clone()));
        }
        if self.members.len() >= self.config.capacity {
            return Err(RoomError::RoomFull(room_id.clone()));
        }
        if self.members.contains_key(&player_id) {
            return Err(RoomError::AlreadyMember(player_id, room_id.clone()));
        }

        self.members.insert(player_id.clone(), member);
        tracing::info!(
            %room_id,
            %player_id,
            members = self.members.len(),
            "player joined"
        );
        self.report_population();

        let notice = RoomNotice::MemberJoined {
            room_id: room_id.clone(),
            player_id: player_id.clone(),
        };
        self.notify_members(&notice, Some(&player_id));

        Ok(JoinedRoom {
            room_id: room_id.clone(),
            name: self.config.name.clone(),
            members: self.members.len(),
            capacity: self.config.capacity,
        })
    }

    fn handle_leave(&mut self, player_id: PlayerId, member: ActorId) {
        let room_id = &self.config.room_id;
        match self.members.get(&player_id) {
            Some(stored) if stored.id() == member => {}
            Some(_) => {
                tracing::debug!(%room_id, %player_id, "leave from stale handle, ignoring");
                return;
            }
            None => {
                tracing::debug!(%room_id, %player_id, "leave from non-member, ignoring");
                return;
            }
        }

        self.members.remove(&player_id);
        tracing::info!(
            %room_id,
            %player_id,
            members = self.members.len(),
            "player left"
        );
        self.report_population();

        let notice = RoomNotice::MemberLeft {
            room_id: room_id.clone(),
            player_id,
        };
        self.notify_members(&notice, None);

        if self.members.is_empty() && !self.config.persistent {
            tracing::info!(room_id = %self.config.room_id, "ad hoc room empty, closing");
            self.transition(RoomState::Closing);
        }
    }

    fn handle_broadcast(
        &self,
        notice: RoomNotice,
        sender: Option<&PlayerId>,
        exclude_sender: bool,
    ) {
        if let Some(sender) = sender {
            if !self.members.contains_key(sender) {
                tracing::warn!(
                    room_id = %self.config.room_id,
                    %sender,
                    "broadcast from non-member, ignoring"
                );
                return;
            }
        }
        let skip = if exclude_sender { sender } else { None };
        self.notify_members(&notice, skip);
    }

    /// Sends one copy of `notice` to each member except `skip`. A member
    /// whose mailbox is gone is skipped; its session will send `Leave` (or
    /// already has) as part of terminating.
    fn notify_members(&self, notice: &RoomNotice, skip: Option<&PlayerId>) {
        for (player_id, member) in &self.members {
            if Some(player_id) == skip {
                continue;
            }
            if member.send(notice.clone()).is_err() {
                tracing::debug!(
                    room_id = %self.config.room_id,
                    %player_id,
                    "member mailbox closed, notice dropped"
                );
            }
        }
    }

    fn report_population(&self) {
        if let Some(registry) = &self.registry {
            let report = PopulationChanged {
                room: self.id,
                room_id: self.config.room_id.clone(),
                members: self.members.len(),
            };
            if registry.send(report).is_err() {
                tracing::debug!(room_id = %self.config.room_id, "registry gone, population not reported");
            }
        }
    }

    fn close(&mut self) {
        let notice = RoomNotice::Closing {
            room_id: self.config.room_id.clone(),
        };
        self.notify_members(&notice, None);
        self.members.clear();
    }

    fn info(&self) -> RoomInfo {
        let mut members: Vec<PlayerId> = self.members.keys().cloned().collect();
        members.sort();
        RoomInfo {
            room_id: self.config.room_id.clone(),
            name: self.config.name.clone(),
            state: self.state,
            members,
            capacity: self.config.capacity,
            persistent: self.config.persistent,
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// Population changes are reported to `registry`, if given.
pub fn spawn_room(
    config: RoomConfig,
    registry: Option<Recipient<PopulationChanged>>,
) -> RoomHandle {
    let (addr, mailbox) = mailbox();
    let handle = RoomHandle {
        room_id: config.room_id.clone(),
        addr,
    };

    let actor = RoomActor {
        id: mailbox.id(),
        config,
        state: RoomState::Active,
        members: HashMap::new(),
        registry,
        mailbox,
    };
    tokio::spawn(actor.run());

    handle
}
