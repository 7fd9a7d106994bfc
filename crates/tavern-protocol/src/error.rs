//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// Every variant maps to `PROTOCOL_ERROR` when reported to a client.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes are not a JSON envelope (malformed JSON, missing `type`,
    /// invalid UTF-8).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The envelope's tag is not a known request.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The tag is known but its payload does not have the expected shape.
    #[error("invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}
