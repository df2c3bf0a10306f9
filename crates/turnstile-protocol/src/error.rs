//! Error types for the protocol layer.

/// Errors that can occur while turning frames into bytes and back.
///
/// A `ProtocolError` always means the frame itself is the problem
/// (malformed JSON, missing fields, an unknown method), never the
/// admission state behind it.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed.
    ///
    /// Common causes: malformed JSON, an unknown `method`, or missing
    /// request parameters.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
