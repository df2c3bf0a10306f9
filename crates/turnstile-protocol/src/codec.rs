//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The login tier doesn't care HOW frames are serialized. It needs
//! something that implements [`Codec`]. [`JsonCodec`] is the default;
//! a binary codec can be added later without touching the service layer.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Human-readable, so gateway traffic can be inspected and replayed with
/// ordinary tools. Behind the `json` feature (enabled by default).
///
/// ## Example
///
/// ```rust
/// use turnstile_protocol::{Call, Codec, JsonCodec, QueueInfoRequest, Request};
///
/// let codec = JsonCodec;
/// let request = Request {
///     id: 7,
///     call: Call::GetQueueInfo(QueueInfoRequest { token: "t".into() }),
/// };
///
/// let bytes = codec.encode(&request).unwrap();
/// let decoded: Request = codec.decode(&bytes).unwrap();
/// assert_eq!(request, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Call, LoginRequest, Request};

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<Request, _> = JsonCodec.decode(b"{not json");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_unknown_method_returns_decode_error() {
        let raw = br#"{"id":1,"call":{"method":"Teleport","params":{}}}"#;

        let result: Result<Request, _> = JsonCodec.decode(raw);

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_missing_param_returns_decode_error() {
        // `password` is required even when empty strings would be rejected
        // later by the service layer.
        let raw = br#"{"id":1,"call":{"method":"Login","params":{"account":"a","device_id":"d"}}}"#;

        let result: Result<Request, _> = JsonCodec.decode(raw);

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_then_decode_login_request() {
        let request = Request {
            id: 3,
            call: Call::Login(LoginRequest {
                account: "alice".into(),
                password: "pw".into(),
                device_id: "D1".into(),
            }),
        };

        let bytes = JsonCodec.encode(&request).expect("encode");
        let decoded: Request = JsonCodec.decode(&bytes).expect("decode");

        assert_eq!(decoded, request);
    }
}
