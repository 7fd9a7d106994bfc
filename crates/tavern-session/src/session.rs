//! Session actor: one per connection.
//!
//! The session owns everything about its connection: the player identity
//! (once authenticated), the current room, the deadline timer, and the
//! outbound half of the socket. It processes its mailbox strictly in order
//! and never blocks on socket I/O:
//!
//! - inbound frames arrive as [`SessionMsg::ClientMessage`] from the read
//!   loop, which owns the reader half;
//! - outbound frames are queued to a writer task, which reports failures
//!   back as [`SessionMsg::WriteFailed`].
//!
//! ```text
//!   AwaitingAuth ──(AUTH ok)──→ Active
//!        │                         │
//!        └──(timeout, disconnect, stop, write failure)──→ Terminating
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tavern_mailbox::{ActorId, Addr, DeadlineTimer, Mailbox, TimerTick, mailbox};
use tavern_protocol::{
    AuthResponse, ChatMessage, ClientRequest, CreateRoomRequest, CreateRoomResponse, ErrorCode,
    JoinRoomResponse, LeaveRoomResponse, PlayerActionRequest, PlayerActionResponse, PlayerId,
    Pong, RoomClosing, RoomCriteria, RoomId, RoomList, RoomMemberEvent, RoomSummary,
    ServerMessage, decode_request, encode,
};
use tavern_room::{RoomError, RoomHandle, RoomNotice, RoomRegistry, RoomSpec};
use tavern_transport::{ConnectionId, ConnectionWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{
    ActionDescriptor, ActionError, ActionService, Authenticator, PlayerData, PlayerStore,
    PreparedAction, SessionConfig, SessionError, WorldRegistry,
};

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Everything a session needs from the rest of the server. Shared by all
/// sessions behind an `Arc`.
pub struct SessionServices<A, P, L> {
    pub config: SessionConfig,
    pub auth: A,
    pub store: P,
    pub actions: L,
    pub rooms: RoomRegistry,
    pub world: WorldRegistry,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Which deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineKind {
    Auth,
    Activity,
}

/// The result of a detached `PLAYER_ACTION` preparation.
#[derive(Debug)]
pub struct ActionOutcome {
    pub request_id: String,
    pub action_type: String,
    pub result: Result<PreparedAction, ActionError>,
}

/// Messages processed by a session actor.
pub enum SessionMsg {
    /// The connection's writer half. Sent once, right after accept.
    Connected(ConnectionWriter),
    /// One inbound frame.
    ClientMessage(Bytes),
    /// The peer closed the connection or the read failed.
    Disconnected { reason: String },
    /// Administrative stop, e.g. server shutdown.
    Stop { reason: String },
    /// A deadline timer fired. Stale ticks are ignored.
    Deadline(DeadlineKind, TimerTick),
    /// A notice from the session's room.
    Room(RoomNotice),
    ActionCompleted(ActionOutcome),
    /// The writer task could not deliver a frame.
    WriteFailed { error: String },
}

impl From<RoomNotice> for SessionMsg {
    fn from(notice: RoomNotice) -> Self {
        Self::Room(notice)
    }
}

/// The session's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingAuth,
    Active,
    Terminating,
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub(crate) addr: Addr<SessionMsg>,
}

impl SessionHandle {
    /// Identity of the session.
    pub fn id(&self) -> ActorId {
        self.addr.id()
    }

    pub fn addr(&self) -> &Addr<SessionMsg> {
        &self.addr
    }

    /// Hands the session its connection's writer half.
    pub fn connected(&self, writer: ConnectionWriter) -> Result<(), SessionError> {
        self.send(SessionMsg::Connected(writer))
    }

    /// Delivers one inbound frame.
    pub fn client_message(&self, frame: Bytes) -> Result<(), SessionError> {
        self.send(SessionMsg::ClientMessage(frame))
    }

    pub fn disconnected(&self, reason: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionMsg::Disconnected {
            reason: reason.into(),
        })
    }

    /// Asks the session to terminate.
    pub fn stop(&self, reason: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionMsg::Stop {
            reason: reason.into(),
        })
    }

    /// Resolves once the session has terminated.
    pub async fn closed(&self) {
        self.addr.closed().await;
    }

    fn send(&self, msg: SessionMsg) -> Result<(), SessionError> {
        self.addr
            .send(msg)
            .map_err(|_| SessionError::SessionUnavailable)
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// The queue in front of the connection's writer task.
struct Outbox {
    conn_id: ConnectionId,
    frames: mpsc::UnboundedSender<Bytes>,
    task: JoinHandle<()>,
}

impl Outbox {
    fn spawn(mut writer: ConnectionWriter, session: Addr<SessionMsg>) -> Self {
        let conn_id = writer.id();
        let (frames, mut queue) = mpsc::unbounded_channel::<Bytes>();

        let task = tokio::spawn(async move {
            while let Some(frame) = queue.recv().await {
                if let Err(e) = writer.send(&frame).await {
                    tracing::debug!(%conn_id, error = %e, "write failed");
                    let _ = session.send(SessionMsg::WriteFailed {
                        error: e.to_string(),
                    });
                    break;
                }
            }
            writer.close().await;
        });

        Self {
            conn_id,
            frames,
            task,
        }
    }

    fn push(&self, frame: Bytes) {
        if self.frames.send(frame).is_err() {
            tracing::trace!(conn_id = %self.conn_id, "writer gone, frame dropped");
        }
    }

    /// Lets queued frames drain, then closes the connection. Gives up
    /// after `timeout`.
    async fn close(self, timeout: Duration) {
        let Self {
            conn_id,
            frames,
            task,
        } = self;
        drop(frames);

        let abort = task.abort_handle();
        if tokio::time::timeout(timeout, task).await.is_err() {
            tracing::debug!(%conn_id, "outbound queue did not drain, dropping connection");
            abort.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Why a session ended.
#[derive(Debug)]
enum Exit {
    AuthTimeout,
    IdleTimeout,
    AuthExhausted,
    Disconnected(String),
    Stopped(String),
    WriteFailed(String),
}

impl Exit {
    /// Best-effort last message to the client.
    fn final_notice(&self) -> Option<ServerMessage> {
        match self {
            Self::AuthTimeout => Some(ServerMessage::error(
                ErrorCode::Timeout,
                "authentication timed out",
            )),
            Self::IdleTimeout => Some(ServerMessage::error(
                ErrorCode::Timeout,
                "disconnected for inactivity",
            )),
            Self::AuthExhausted => Some(ServerMessage::error(
                ErrorCode::AuthError,
                "too many failed authentication attempts",
            )),
            Self::Stopped(reason) => Some(ServerMessage::simple(format!(
                "connection closed by server: {reason}"
            ))),
            Self::Disconnected(_) | Self::WriteFailed(_) => None,
        }
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthTimeout => write!(f, "auth timeout"),
            Self::IdleTimeout => write!(f, "idle timeout"),
            Self::AuthExhausted => write!(f, "auth attempts exhausted"),
            Self::Disconnected(reason) => write!(f, "disconnected: {reason}"),
            Self::Stopped(reason) => write!(f, "stopped: {reason}"),
            Self::WriteFailed(error) => write!(f, "write failed: {error}"),
        }
    }
}

/// The session actor. Create with [`Session::new`], then drive
/// [`Session::run`] on a task.
pub struct Session<A, P, L> {
    services: Arc<SessionServices<A, P, L>>,
    addr: Addr<SessionMsg>,
    mailbox: Mailbox<SessionMsg>,
    state: SessionState,
    player: Option<PlayerData>,
    current_room: Option<RoomHandle>,
    timer: DeadlineTimer<SessionMsg>,
    failed_auth_attempts: u32,
    last_activity: Instant,
    outbox: Option<Outbox>,
    next_request: u64,
}

/// Spawns a session on the current runtime.
pub fn spawn_session<A, P, L>(services: Arc<SessionServices<A, P, L>>) -> SessionHandle
where
    A: Authenticator,
    P: PlayerStore,
    L: ActionService,
{
    let (handle, session) = Session::new(services);
    tokio::spawn(session.run());
    handle
}

impl<A, P, L> Session<A, P, L>
where
    A: Authenticator,
    P: PlayerStore,
    L: ActionService,
{
    pub fn new(services: Arc<SessionServices<A, P, L>>) -> (SessionHandle, Self) {
        let (addr, mailbox) = mailbox();
        let session = Self {
            services,
            timer: DeadlineTimer::new(&addr),
            addr: addr.clone(),
            mailbox,
            state: SessionState::AwaitingAuth,
            player: None,
            current_room: None,
            failed_auth_attempts: 0,
            last_activity: Instant::now(),
            outbox: None,
            next_request: 0,
        };
        (SessionHandle { addr }, session)
    }

    /// Processes messages until the session terminates.
    pub async fn run(mut self) {
        tracing::debug!(session = %self.addr.id(), "session started");

        while let Some(msg) = self.mailbox.recv().await {
            if let Some(exit) = self.handle_msg(msg).await {
                self.terminate(exit).await;
                break;
            }
        }
    }

    async fn handle_msg(&mut self, msg: SessionMsg) -> Option<Exit> {
        match msg {
            SessionMsg::Connected(writer) => {
                self.handle_connected(writer);
                None
            }
            SessionMsg::ClientMessage(frame) => self.handle_client_message(&frame).await,
            SessionMsg::Disconnected { reason } => Some(Exit::Disconnected(reason)),
            SessionMsg::Stop { reason } => Some(Exit::Stopped(reason)),
            SessionMsg::Deadline(kind, tick) => {
                if !self.timer.is_current(tick) {
                    tracing::trace!(session = %self.addr.id(), ?kind, "stale deadline ignored");
                    return None;
                }
                let idle = self.last_activity.elapsed();
                tracing::debug!(session = %self.addr.id(), ?kind, ?idle, "deadline expired");
                Some(match kind {
                    DeadlineKind::Auth => Exit::AuthTimeout,
                    DeadlineKind::Activity => Exit::IdleTimeout,
                })
            }
            SessionMsg::Room(notice) => {
                self.handle_room_notice(notice);
                None
            }
            SessionMsg::ActionCompleted(outcome) => {
                self.handle_action_completed(outcome);
                None
            }
            SessionMsg::WriteFailed { error } => Some(Exit::WriteFailed(error)),
        }
    }

    // -- connection ---------------------------------------------------------

    fn handle_connected(&mut self, writer: ConnectionWriter) {
        if let Some(outbox) = &self.outbox {
            tracing::warn!(
                session = %self.addr.id(),
                conn_id = %outbox.conn_id,
                "session already connected, ignoring second connection"
            );
            return;
        }
        tracing::debug!(session = %self.addr.id(), conn_id = %writer.id(), "session connected");
        self.outbox = Some(Outbox::spawn(writer, self.addr.clone()));
        self.arm_auth_deadline();
        self.send(ServerMessage::simple("Welcome. Send AUTH with your token."));
    }

    async fn handle_client_message(&mut self, frame: &[u8]) -> Option<Exit> {
        self.last_activity = Instant::now();
        if self.state == SessionState::Active {
            self.arm_activity_deadline();
        }

        let request = match decode_request(frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(session = %self.addr.id(), error = %e, "malformed client message");
                self.send(ServerMessage::error(ErrorCode::ProtocolError, e.to_string()));
                return None;
            }
        };
        tracing::debug!(session = %self.addr.id(), kind = request.kind(), "client request");

        match (self.state, request) {
            (_, ClientRequest::Ping(ping)) => self.send_pong(ping.timestamp),
            (SessionState::AwaitingAuth, ClientRequest::Auth(auth)) => {
                return self.handle_auth(auth.token).await;
            }
            (SessionState::AwaitingAuth, other) => {
                self.send(ServerMessage::error(
                    ErrorCode::NotAuthenticated,
                    format!("{} requires authentication", other.kind()),
                ));
            }
            (SessionState::Active, request) => self.handle_active(request).await,
            (SessionState::Terminating, _) => {}
        }
        None
    }

    // -- authentication -----------------------------------------------------

    async fn handle_auth(&mut self, token: String) -> Option<Exit> {
        let services = Arc::clone(&self.services);

        let player_id = match services.auth.authenticate(&token).await {
            Ok(player_id) => player_id,
            Err(e) => {
                self.failed_auth_attempts += 1;
                tracing::warn!(
                    session = %self.addr.id(),
                    attempts = self.failed_auth_attempts,
                    error = %e,
                    "authentication failed"
                );
                self.send(ServerMessage::AuthResponse(AuthResponse {
                    success: false,
                    player_id: None,
                    message: Some(e.to_string()),
                }));
                if services
                    .config
                    .max_auth_attempts
                    .is_some_and(|max| self.failed_auth_attempts >= max)
                {
                    return Some(Exit::AuthExhausted);
                }
                self.arm_auth_deadline();
                return None;
            }
        };

        let data = match services.store.load(&player_id).await {
            Ok(Some(data)) => data,
            Ok(None) => PlayerData::new(player_id.clone()),
            Err(e) => {
                tracing::error!(%player_id, error = %e, "failed to load player data");
                self.send(ServerMessage::error(
                    ErrorCode::InternalError,
                    "could not load player data, try again",
                ));
                self.arm_auth_deadline();
                return None;
            }
        };

        self.player = Some(data);
        self.failed_auth_attempts = 0;
        self.state = SessionState::Active;
        self.arm_activity_deadline();

        let handle = SessionHandle {
            addr: self.addr.clone(),
        };
        if let Err(e) = services.world.player_entered(player_id.clone(), handle) {
            tracing::error!(%player_id, error = %e, "failed to register player presence");
        }

        tracing::info!(session = %self.addr.id(), %player_id, "player authenticated");
        self.send(ServerMessage::AuthResponse(AuthResponse {
            success: true,
            player_id: Some(player_id),
            message: None,
        }));
        None
    }

    // -- commands -----------------------------------------------------------

    async fn handle_active(&mut self, request: ClientRequest) {
        let Some(player_id) = self.player_id().cloned() else {
            return;
        };
        match request {
            ClientRequest::Auth(_) => {
                self.send(ServerMessage::error(
                    ErrorCode::AlreadyAuthenticated,
                    "session is already authenticated",
                ));
            }
            ClientRequest::JoinRoom(req) => {
                self.handle_join(player_id, req.criteria.unwrap_or_default())
                    .await;
            }
            ClientRequest::SendChat(req) => self.handle_chat(player_id, req.text),
            ClientRequest::PlayerAction(req) => self.handle_player_action(player_id, req),
            ClientRequest::CreateRoom(req) => self.handle_create_room(req).await,
            ClientRequest::LeaveRoom => self.handle_leave_room(player_id),
            ClientRequest::ListRooms => self.handle_list_rooms().await,
            ClientRequest::Ping(ping) => self.send_pong(ping.timestamp),
        }
    }

    async fn handle_join(&mut self, player_id: PlayerId, criteria: RoomCriteria) {
        // Naming the current room must not leave it: an ad hoc room would
        // close under us before the join arrived.
        if let Some(current) = &self.current_room {
            if criteria.room_id.as_ref() == Some(current.room_id()) {
                let current_id = current.room_id().clone();
                self.already_in_room(player_id, current_id);
                return;
            }
        }

        let room = match self.services.rooms.find_room(criteria).await {
            Ok(room) => room,
            Err(e) => {
                self.send(ServerMessage::join_failed(e.code(), e.to_string()));
                return;
            }
        };

        if let Some(previous) = self.current_room.take() {
            if previous.id() == room.id() {
                let current_id = previous.room_id().clone();
                self.current_room = Some(previous);
                self.already_in_room(player_id, current_id);
                return;
            }
            self.leave_room(&previous, player_id.clone());
            if let Some(player) = &mut self.player {
                player.last_room = None;
            }
        }

        match room.join(player_id.clone(), self.addr.recipient()).await {
            Ok(joined) => {
                tracing::info!(
                    session = %self.addr.id(),
                    %player_id,
                    room_id = %joined.room_id,
                    "joined room"
                );
                if let Some(player) = &mut self.player {
                    player.last_room = Some(joined.room_id.clone());
                }
                self.current_room = Some(room);
                self.send(ServerMessage::JoinRoomResponse(JoinRoomResponse {
                    success: true,
                    room_id: Some(joined.room_id),
                    name: Some(joined.name),
                    members: Some(joined.members),
                    capacity: Some(joined.capacity),
                    code: None,
                    message: None,
                }));
            }
            Err(e) => self.send(ServerMessage::join_failed(e.code(), e.to_string())),
        }
    }

    fn already_in_room(&self, player_id: PlayerId, room_id: RoomId) {
        let err = RoomError::AlreadyMember(player_id, room_id);
        self.send(ServerMessage::join_failed(err.code(), err.to_string()));
    }

    fn handle_chat(&mut self, player_id: PlayerId, text: String) {
        let Some(room) = self.current_room.clone() else {
            self.send(ServerMessage::error(
                ErrorCode::NotInRoom,
                "join a room before chatting",
            ));
            return;
        };
        if let Err(e) = room.chat(player_id, text) {
            self.current_room_gone(&e);
        }
    }

    fn handle_player_action(&mut self, player_id: PlayerId, req: PlayerActionRequest) {
        let request_id = req.request_id.unwrap_or_else(|| {
            self.next_request += 1;
            format!("{}-{}", self.addr.id(), self.next_request)
        });
        let action_type = req.action_type;
        let descriptor = ActionDescriptor {
            request_id: request_id.clone(),
            action_type: action_type.clone(),
            data: req.data,
        };

        let services = Arc::clone(&self.services);
        let session = self.addr.clone();
        tokio::spawn(async move {
            let result = services.actions.prepare(&player_id, descriptor).await;
            let outcome = ActionOutcome {
                request_id,
                action_type,
                result,
            };
            if session.send(SessionMsg::ActionCompleted(outcome)).is_err() {
                tracing::debug!(%player_id, "session ended before action completed");
            }
        });
    }

    fn handle_action_completed(&mut self, outcome: ActionOutcome) {
        let ActionOutcome {
            request_id,
            action_type,
            result,
        } = outcome;
        let response = match result {
            Ok(prepared) => PlayerActionResponse {
                success: true,
                request_id,
                action_type,
                handle: Some(prepared.handle),
                message: None,
            },
            Err(e) => {
                tracing::debug!(session = %self.addr.id(), %request_id, error = %e, "action failed");
                PlayerActionResponse {
                    success: false,
                    request_id,
                    action_type,
                    handle: None,
                    message: Some(e.to_string()),
                }
            }
        };
        self.send(ServerMessage::PlayerActionResponse(response));
    }

    async fn handle_create_room(&mut self, req: CreateRoomRequest) {
        let spec = RoomSpec {
            room_id: req.room_id,
            name: req.name,
            capacity: req.capacity,
            persistent: false,
        };
        let created = match self.services.rooms.create_room(spec).await {
            Ok(room) => room.info().await,
            Err(e) => Err(e),
        };
        let response = match created {
            Ok(info) => CreateRoomResponse {
                success: true,
                room: Some(RoomSummary {
                    room_id: info.room_id,
                    name: info.name,
                    members: info.members.len(),
                    capacity: info.capacity,
                }),
                code: None,
                message: None,
            },
            Err(e) => CreateRoomResponse {
                success: false,
                room: None,
                code: Some(e.code()),
                message: Some(e.to_string()),
            },
        };
        self.send(ServerMessage::CreateRoomResponse(response));
    }

    fn handle_leave_room(&mut self, player_id: PlayerId) {
        let Some(room) = self.current_room.take() else {
            self.send(ServerMessage::error(ErrorCode::NotInRoom, "not in a room"));
            return;
        };
        self.leave_room(&room, player_id);
        if let Some(player) = &mut self.player {
            player.last_room = None;
        }
        self.send(ServerMessage::LeaveRoomResponse(LeaveRoomResponse {
            success: true,
            room_id: Some(room.room_id().clone()),
        }));
    }

    async fn handle_list_rooms(&mut self) {
        match self.services.rooms.list_rooms().await {
            Ok(rooms) => self.send(ServerMessage::RoomList(RoomList { rooms })),
            Err(e) => self.send(ServerMessage::error(e.code(), e.to_string())),
        }
    }

    // -- room notices -------------------------------------------------------

    fn handle_room_notice(&mut self, notice: RoomNotice) {
        let from_current = self
            .current_room
            .as_ref()
            .is_some_and(|room| room.room_id() == notice.room_id());
        if !from_current {
            tracing::trace!(
                session = %self.addr.id(),
                room_id = %notice.room_id(),
                "notice from a room we left, dropped"
            );
            return;
        }

        let msg = match notice {
            RoomNotice::MemberJoined { room_id, player_id } => {
                ServerMessage::RoomMemberJoined(RoomMemberEvent { room_id, player_id })
            }
            RoomNotice::MemberLeft { room_id, player_id } => {
                ServerMessage::RoomMemberLeft(RoomMemberEvent { room_id, player_id })
            }
            RoomNotice::Chat {
                room_id,
                player_id,
                text,
            } => ServerMessage::NewChatMessage(ChatMessage {
                room_id,
                player_id,
                text,
            }),
            RoomNotice::Closing { room_id } => {
                self.current_room = None;
                ServerMessage::RoomClosing(RoomClosing { room_id })
            }
        };
        self.send(msg);
    }

    // -- termination --------------------------------------------------------

    async fn terminate(&mut self, exit: Exit) {
        self.state = SessionState::Terminating;
        self.timer.cancel();
        let player_id = self.player_id().cloned();

        if let (Some(room), Some(player_id)) = (self.current_room.take(), player_id.clone()) {
            self.leave_room(&room, player_id);
        }

        if let Some(data) = self.player.take() {
            let player_id = data.player_id.clone();
            if let Err(e) = self
                .services
                .world
                .player_left(player_id.clone(), self.addr.id())
            {
                tracing::warn!(%player_id, error = %e, "failed to clear player presence");
            }
            if let Err(e) = self.services.store.save(data).await {
                tracing::warn!(%player_id, error = %e, "failed to save player data");
            }
        }

        if let Some(notice) = exit.final_notice() {
            self.send(notice);
        }
        if let Some(outbox) = self.outbox.take() {
            outbox.close(self.services.config.flush_timeout).await;
        }

        tracing::info!(
            session = %self.addr.id(),
            player_id = player_id.as_ref().map(PlayerId::as_str),
            reason = %exit,
            "session terminated"
        );
    }

    // -- helpers ------------------------------------------------------------

    fn player_id(&self) -> Option<&PlayerId> {
        self.player.as_ref().map(|p| &p.player_id)
    }

    fn leave_room(&self, room: &RoomHandle, player_id: PlayerId) {
        if room.leave(player_id, self.addr.id()).is_err() {
            tracing::debug!(room_id = %room.room_id(), "room already stopped");
        }
    }

    /// The current room's mailbox is gone: forget it and tell the client.
    fn current_room_gone(&mut self, error: &RoomError) {
        self.current_room = None;
        self.send(ServerMessage::error(ErrorCode::NotFound, error.to_string()));
    }

    fn arm_auth_deadline(&mut self) {
        self.timer.arm(self.services.config.auth_timeout, |tick| {
            SessionMsg::Deadline(DeadlineKind::Auth, tick)
        });
    }

    fn arm_activity_deadline(&mut self) {
        self.timer.arm(self.services.config.activity_timeout, |tick| {
            SessionMsg::Deadline(DeadlineKind::Activity, tick)
        });
    }

    fn send_pong(&self, timestamp: Option<u64>) {
        let server_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        self.send(ServerMessage::Pong(Pong {
            timestamp,
            server_time,
        }));
    }

    fn send(&self, msg: ServerMessage) {
        let Some(outbox) = &self.outbox else {
            tracing::debug!(session = %self.addr.id(), "no connection, outbound message dropped");
            return;
        };
        match encode(&msg) {
            Ok(bytes) => outbox.push(Bytes::from(bytes)),
            Err(e) => tracing::error!(session = %self.addr.id(), error = %e, "failed to encode message"),
        }
    }
}
