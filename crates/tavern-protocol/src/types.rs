//! Core protocol types for Tavern's wire format.
//!
//! Every message on the wire is an [`Envelope`]: a string tag plus an
//! opaque JSON payload.
//!
//! ```json
//! { "type": "JOIN_ROOM", "payload": { "criteria": "lobby" } }
//! ```
//!
//! The typed views on top of it are [`ClientRequest`] (client → server)
//! and [`ServerMessage`] (server → client). Both use serde's "adjacently
//! tagged" representation, so serializing a variant yields exactly the
//! envelope shape above. Payload keys are camelCase.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for an authenticated player.
///
/// Issued by the authenticator. Serialized as a plain JSON string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Creates a player ID from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A unique identifier for a room.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Creates a room ID from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The untyped wire envelope: `{ "type": <tag>, "payload": <data> }`.
///
/// A missing payload decodes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The message tag, e.g. `"AUTH"` or `"NEW_CHAT_MESSAGE"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Tag-specific data. Opaque at this level.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Machine-readable error category carried in `ERROR` messages and failed
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed frame, JSON, or unknown message tag.
    ProtocolError,
    /// The credential was rejected.
    AuthError,
    /// The command requires an authenticated session.
    NotAuthenticated,
    /// `AUTH` was sent after the session already authenticated.
    AlreadyAuthenticated,
    /// The room is at capacity.
    CapacityError,
    /// The player already occupies a slot in the room.
    AlreadyMember,
    /// No room matched the request.
    NotFound,
    /// A room with the requested ID already exists.
    AlreadyExists,
    /// The command requires a current room.
    NotInRoom,
    /// No authentication or activity within the deadline.
    Timeout,
    /// Something unexpected failed on the server side.
    InternalError,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::AuthError => "AUTH_ERROR",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::AlreadyAuthenticated => "ALREADY_AUTHENTICATED",
            Self::CapacityError => "CAPACITY_ERROR",
            Self::AlreadyMember => "ALREADY_MEMBER",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::Timeout => "TIMEOUT",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// How a client asks for a room.
///
/// On the wire this may be a bare room ID string (`"lobby"`), `null`
/// (any room with space), or an object `{ "roomId"?, "name"? }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CriteriaRepr")]
pub struct RoomCriteria {
    /// A specific room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,

    /// Any room with this display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RoomCriteria {
    /// Criteria naming one specific room.
    pub fn room(id: impl Into<String>) -> Self {
        Self {
            room_id: Some(RoomId::new(id)),
            name: None,
        }
    }

    /// Criteria matching any room with spare capacity.
    pub fn any() -> Self {
        Self::default()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CriteriaRepr {
    Id(String),
    Query {
        #[serde(default, rename = "roomId")]
        room_id: Option<RoomId>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl From<CriteriaRepr> for RoomCriteria {
    fn from(repr: CriteriaRepr) -> Self {
        match repr {
            CriteriaRepr::Id(id) if id.is_empty() => Self::any(),
            CriteriaRepr::Id(id) => Self::room(id),
            CriteriaRepr::Query { room_id, name } => Self {
                room_id: room_id.filter(|id| !id.0.is_empty()),
                name,
            },
        }
    }
}

/// `AUTH` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub token: String,
}

/// `JOIN_ROOM` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    #[serde(default)]
    pub criteria: Option<RoomCriteria>,
}

/// `SEND_CHAT` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChatRequest {
    pub text: String,
}

/// `PING` payload. The timestamp is echoed back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// `PLAYER_ACTION` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerActionRequest {
    pub action_type: String,
    #[serde(default)]
    pub data: Value,
    /// Client-chosen correlation ID; the server assigns one if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// `CREATE_ROOM` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

/// Everything a client can ask the server to do.
///
/// Serializes to the envelope shape. Decoding goes through
/// [`decode_request`](crate::decode_request), which tolerates a missing
/// payload for requests whose fields are all optional.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientRequest {
    Auth(AuthRequest),
    JoinRoom(JoinRoomRequest),
    SendChat(SendChatRequest),
    Ping(PingRequest),
    PlayerAction(PlayerActionRequest),
    CreateRoom(CreateRoomRequest),
    LeaveRoom,
    ListRooms,
}

impl ClientRequest {
    /// Returns the wire tag of this request.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "AUTH",
            Self::JoinRoom(_) => "JOIN_ROOM",
            Self::SendChat(_) => "SEND_CHAT",
            Self::Ping(_) => "PING",
            Self::PlayerAction(_) => "PLAYER_ACTION",
            Self::CreateRoom(_) => "CREATE_ROOM",
            Self::LeaveRoom => "LEAVE_ROOM",
            Self::ListRooms => "LIST_ROOMS",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A summary of a room, as listed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub name: String,
    pub members: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A chat line relayed to the other members of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pong {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    /// Milliseconds since the Unix epoch on the server.
    pub server_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerActionResponse {
    pub success: bool,
    pub request_id: String,
    pub action_type: String,
    /// Handle of the prepared transaction, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleMessage {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRoomResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomList {
    pub rooms: Vec<RoomSummary>,
}

/// Someone joined or left the receiver's room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberEvent {
    pub room_id: RoomId,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClosing {
    pub room_id: RoomId,
}

/// Everything the server sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    AuthResponse(AuthResponse),
    JoinRoomResponse(JoinRoomResponse),
    NewChatMessage(ChatMessage),
    Pong(Pong),
    PlayerActionResponse(PlayerActionResponse),
    Error(ErrorMessage),
    SimpleMessage(SimpleMessage),
    CreateRoomResponse(CreateRoomResponse),
    LeaveRoomResponse(LeaveRoomResponse),
    RoomList(RoomList),
    RoomMemberJoined(RoomMemberEvent),
    RoomMemberLeft(RoomMemberEvent),
    RoomClosing(RoomClosing),
}

impl ServerMessage {
    /// Builds an `ERROR` message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorMessage {
            code,
            message: message.into(),
        })
    }

    /// Builds a `SIMPLE_MESSAGE`.
    pub fn simple(message: impl Into<String>) -> Self {
        Self::SimpleMessage(SimpleMessage {
            message: message.into(),
        })
    }

    /// Builds a failed `JOIN_ROOM_RESPONSE`.
    pub fn join_failed(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::JoinRoomResponse(JoinRoomResponse {
            success: false,
            room_id: None,
            name: None,
            members: None,
            capacity: None,
            code: Some(code),
            message: Some(message.into()),
        })
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire shapes are a contract with clients; these tests pin the
    //! JSON produced by the serde attributes.

    use serde_json::json;

    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::new("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId::from("lobby").to_string(), "lobby");
    }

    #[test]
    fn test_envelope_missing_payload_is_null() {
        let env: Envelope = serde_json::from_str(r#"{"type":"LEAVE_ROOM"}"#).unwrap();
        assert_eq!(env.kind, "LEAVE_ROOM");
        assert!(env.payload.is_null());
    }

    #[test]
    fn test_envelope_null_payload_is_omitted() {
        let env = Envelope {
            kind: "LIST_ROOMS".into(),
            payload: Value::Null,
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json, json!({ "type": "LIST_ROOMS" }));
    }

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(
            serde_json::to_value(ErrorCode::CapacityError).unwrap(),
            json!("CAPACITY_ERROR")
        );
        assert_eq!(ErrorCode::NotInRoom.to_string(), "NOT_IN_ROOM");
        assert_eq!(
            serde_json::to_value(ErrorCode::AlreadyAuthenticated).unwrap(),
            json!(ErrorCode::AlreadyAuthenticated.as_str())
        );
    }

    #[test]
    fn test_client_request_auth_json_format() {
        let req = ClientRequest::Auth(AuthRequest {
            token: "secret".into(),
        });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, json!({ "type": "AUTH", "payload": { "token": "secret" } }));
        assert_eq!(req.kind(), "AUTH");
    }

    #[test]
    fn test_client_request_player_action_uses_camel_case() {
        let req = ClientRequest::PlayerAction(PlayerActionRequest {
            action_type: "mint".into(),
            data: json!({ "item": 7 }),
            request_id: None,
        });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "PLAYER_ACTION");
        assert_eq!(json["payload"]["actionType"], "mint");
        assert_eq!(json["payload"]["data"]["item"], 7);
    }

    #[test]
    fn test_client_request_unit_variant_has_no_payload() {
        let json = serde_json::to_value(&ClientRequest::LeaveRoom).unwrap();
        assert_eq!(json, json!({ "type": "LEAVE_ROOM" }));
    }

    #[test]
    fn test_criteria_from_bare_string() {
        let c: RoomCriteria = serde_json::from_value(json!("lobby")).unwrap();
        assert_eq!(c, RoomCriteria::room("lobby"));
    }

    #[test]
    fn test_criteria_empty_string_means_any() {
        let c: RoomCriteria = serde_json::from_value(json!("")).unwrap();
        assert_eq!(c, RoomCriteria::any());
    }

    #[test]
    fn test_criteria_from_object() {
        let c: RoomCriteria =
            serde_json::from_value(json!({ "name": "arena" })).unwrap();
        assert_eq!(c.room_id, None);
        assert_eq!(c.name.as_deref(), Some("arena"));

        let c: RoomCriteria =
            serde_json::from_value(json!({ "roomId": "room-3" })).unwrap();
        assert_eq!(c, RoomCriteria::room("room-3"));
    }

    #[test]
    fn test_join_room_null_criteria() {
        let req: JoinRoomRequest =
            serde_json::from_value(json!({ "criteria": null })).unwrap();
        assert_eq!(req.criteria, None);
    }

    #[test]
    fn test_server_message_join_response_json_format() {
        let msg = ServerMessage::JoinRoomResponse(JoinRoomResponse {
            success: true,
            room_id: Some("lobby".into()),
            name: Some("Lobby".into()),
            members: Some(1),
            capacity: Some(64),
            code: None,
            message: None,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "JOIN_ROOM_RESPONSE");
        assert_eq!(json["payload"]["success"], true);
        assert_eq!(json["payload"]["roomId"], "lobby");
        assert!(json["payload"].get("code").is_none());
    }

    #[test]
    fn test_server_message_error_json_format() {
        let msg = ServerMessage::error(ErrorCode::Timeout, "too slow");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({ "type": "ERROR", "payload": { "code": "TIMEOUT", "message": "too slow" } })
        );
    }

    #[test]
    fn test_server_message_chat_decodes() {
        let json = json!({
            "type": "NEW_CHAT_MESSAGE",
            "payload": { "roomId": "lobby", "playerId": "bob", "text": "hi" }
        });
        let msg: ServerMessage = serde_json::from_value(json).unwrap();
        assert_eq!(
            msg,
            ServerMessage::NewChatMessage(ChatMessage {
                room_id: "lobby".into(),
                player_id: "bob".into(),
                text: "hi".into(),
            })
        );
    }

    #[test]
    fn test_server_message_member_events_have_distinct_tags() {
        let ev = RoomMemberEvent {
            room_id: "lobby".into(),
            player_id: "carol".into(),
        };
        let joined = serde_json::to_value(ServerMessage::RoomMemberJoined(ev.clone())).unwrap();
        let left = serde_json::to_value(ServerMessage::RoomMemberLeft(ev)).unwrap();
        assert_eq!(joined["type"], "ROOM_MEMBER_JOINED");
        assert_eq!(left["type"], "ROOM_MEMBER_LEFT");
    }
}
