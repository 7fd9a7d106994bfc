//! JSON encoding and decoding of wire messages.
//!
//! Framing lives in the transport crate; these functions only deal with
//! the bytes inside one frame.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{ClientRequest, Envelope, ProtocolError};

/// Serializes a value into JSON bytes.
///
/// # Errors
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(value).map_err(ProtocolError::Encode)
}

/// Deserializes JSON bytes into a value.
///
/// # Errors
/// Returns [`ProtocolError::Decode`] if the bytes are malformed or don't
/// match `T`.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(data).map_err(ProtocolError::Decode)
}

/// Decodes one inbound frame into a typed client request.
///
/// Decoding happens in two steps so that the error says *what* was wrong:
/// first the envelope (bad JSON → [`ProtocolError::Decode`]), then the tag
/// ([`ProtocolError::UnknownType`]), then the payload
/// ([`ProtocolError::InvalidPayload`]). A missing or `null` payload is
/// treated as an empty object, so `{"type":"LIST_ROOMS"}` and
/// `{"type":"JOIN_ROOM"}` are both accepted.
pub fn decode_request(data: &[u8]) -> Result<ClientRequest, ProtocolError> {
    let envelope: Envelope = decode(data)?;
    request_from_envelope(envelope)
}

/// Converts an already-parsed envelope into a typed client request.
pub fn request_from_envelope(envelope: Envelope) -> Result<ClientRequest, ProtocolError> {
    let Envelope { kind, payload } = envelope;
    let request = match kind.as_str() {
        "AUTH" => ClientRequest::Auth(payload_as(&kind, payload)?),
        "JOIN_ROOM" => ClientRequest::JoinRoom(payload_as(&kind, payload)?),
        "SEND_CHAT" => ClientRequest::SendChat(payload_as(&kind, payload)?),
        "PING" => ClientRequest::Ping(payload_as(&kind, payload)?),
        "PLAYER_ACTION" => ClientRequest::PlayerAction(payload_as(&kind, payload)?),
        "CREATE_ROOM" => ClientRequest::CreateRoom(payload_as(&kind, payload)?),
        "LEAVE_ROOM" => ClientRequest::LeaveRoom,
        "LIST_ROOMS" => ClientRequest::ListRooms,
        _ => return Err(ProtocolError::UnknownType(kind)),
    };
    Ok(request)
}

fn payload_as<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, ProtocolError> {
    let payload = if payload.is_null() {
        Value::Object(Map::new())
    } else {
        payload
    };
    serde_json::from_value(payload).map_err(|source| ProtocolError::InvalidPayload {
        kind: kind.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AuthRequest, JoinRoomRequest, PingRequest, RoomCriteria, ServerMessage,
    };

    #[test]
    fn test_decode_request_auth() {
        let req = decode_request(br#"{"type":"AUTH","payload":{"token":"abc"}}"#).unwrap();
        assert_eq!(
            req,
            ClientRequest::Auth(AuthRequest {
                token: "abc".into()
            })
        );
    }

    #[test]
    fn test_decode_request_join_with_string_criteria() {
        let req =
            decode_request(br#"{"type":"JOIN_ROOM","payload":{"criteria":"lobby"}}"#).unwrap();
        assert_eq!(
            req,
            ClientRequest::JoinRoom(JoinRoomRequest {
                criteria: Some(RoomCriteria::room("lobby"))
            })
        );
    }

    #[test]
    fn test_decode_request_missing_payload_uses_defaults() {
        let req = decode_request(br#"{"type":"JOIN_ROOM"}"#).unwrap();
        assert_eq!(req, ClientRequest::JoinRoom(JoinRoomRequest::default()));

        let req = decode_request(br#"{"type":"PING","payload":null}"#).unwrap();
        assert_eq!(req, ClientRequest::Ping(PingRequest { timestamp: None }));
    }

    #[test]
    fn test_decode_request_unit_variants_ignore_payload() {
        let req = decode_request(br#"{"type":"LEAVE_ROOM","payload":{"x":1}}"#).unwrap();
        assert_eq!(req, ClientRequest::LeaveRoom);
        let req = decode_request(br#"{"type":"LIST_ROOMS"}"#).unwrap();
        assert_eq!(req, ClientRequest::ListRooms);
    }

    #[test]
    fn test_decode_request_malformed_json_is_decode_error() {
        let err = decode_request(b"{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_request_unknown_type() {
        let err = decode_request(br#"{"type":"DANCE","payload":{}}"#).unwrap_err();
        match err {
            ProtocolError::UnknownType(kind) => assert_eq!(kind, "DANCE"),
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_request_auth_without_token_is_invalid_payload() {
        let err = decode_request(br#"{"type":"AUTH"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPayload { ref kind, .. } if kind == "AUTH"));
    }

    #[test]
    fn test_encoded_request_decodes_to_same_value() {
        let req = ClientRequest::Ping(PingRequest {
            timestamp: Some(1_700_000_000_000),
        });
        let bytes = encode(&req).unwrap();
        assert_eq!(decode_request(&bytes).unwrap(), req);
    }

    #[test]
    fn test_decode_server_message() {
        let bytes = encode(&ServerMessage::simple("send AUTH")).unwrap();
        let msg: ServerMessage = decode(&bytes).unwrap();
        assert_eq!(msg, ServerMessage::simple("send AUTH"));
    }
}
