//! RPC frame types for the login tier.
//!
//! Every operation the gateway can invoke is a variant of [`Call`], and
//! every answer is a [`Reply`]. Both travel inside an id-tagged frame
//! ([`Request`] / [`Response`]) so a gateway can pipeline calls over one
//! connection and match replies by id.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The stable identifier of a player, derived from the account name.
///
/// Serialized as a plain string (`"player_alice"`), not as an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Derives the player id for an account.
    ///
    /// The mapping is fixed: the same account always yields the same id,
    /// across logins and across restarts.
    pub fn for_account(account: &str) -> Self {
        Self(format!("player_{account}"))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The minimal profile shown to a player once admitted.
///
/// Captured at login time and kept on the session (or on the queue entry
/// while waiting), so reconnects don't need to consult the account store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub nickname: String,
    pub level: u32,
    pub exp: u64,
    pub vip_level: u32,
    pub items: Vec<u32>,
}

// ---------------------------------------------------------------------------
// StatusCode
// ---------------------------------------------------------------------------

/// The closed set of outcomes every reply carries.
///
/// Serialized by name (`"DeviceMismatch"`), with an HTTP-style number
/// available through [`StatusCode::as_u16`] for gateways that translate
/// replies into HTTP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StatusCode {
    Ok,
    /// Missing or malformed request fields.
    InvalidArgument,
    /// Bad credentials, or a token that no session or queue entry owns.
    Unauthorized,
    /// The token is valid but was presented from a different device.
    DeviceMismatch,
    NotFound,
    AlreadyExists,
    /// A collaborator (account store, hashing) failed unexpectedly.
    InternalError,
}

impl StatusCode {
    /// HTTP-style numeric value of this code.
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::InvalidArgument => 400,
            Self::Unauthorized => 401,
            Self::DeviceMismatch => 403,
            Self::NotFound => 404,
            Self::AlreadyExists => 409,
            Self::InternalError => 500,
        }
    }

    /// Returns `true` for [`StatusCode::Ok`].
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::InvalidArgument => "InvalidArgument",
            Self::Unauthorized => "Unauthorized",
            Self::DeviceMismatch => "DeviceMismatch",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::InternalError => "InternalError",
        };
        write!(f, "{name} ({})", self.as_u16())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Gateway → login tier: authenticate and ask for admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub account: String,
    pub password: String,
    /// The device fingerprint the session will be bound to.
    pub device_id: String,
}

/// Gateway → login tier: resume an existing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectRequest {
    pub token: String,
    pub device_id: String,
}

/// Operator/gateway → login tier: remove a player's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickPlayerRequest {
    pub player_id: PlayerId,
    pub reason: String,
}

/// Gateway → login tier: where is this ticket in the wait queue?
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfoRequest {
    pub token: String,
}

/// Gateway → login tier: the client gave up waiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveQueueRequest {
    pub token: String,
}

/// Gateway → login tier: create an account. Handled by the account store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub account: String,
    pub password: String,
    pub nickname: String,
    pub client_ip: String,
}

/// One RPC operation with its parameters.
///
/// Adjacently tagged, so a login call looks like:
///
/// ```json
/// { "method": "Login", "params": { "account": "a", "password": "p", "device_id": "d" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Call {
    Login(LoginRequest),
    Reconnect(ReconnectRequest),
    KickPlayer(KickPlayerRequest),
    GetQueueInfo(QueueInfoRequest),
    LeaveQueue(LeaveQueueRequest),
    Register(RegisterRequest),
}

impl Call {
    /// The method name, for logging.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Login(_) => "Login",
            Self::Reconnect(_) => "Reconnect",
            Self::KickPlayer(_) => "KickPlayer",
            Self::GetQueueInfo(_) => "GetQueueInfo",
            Self::LeaveQueue(_) => "LeaveQueue",
            Self::Register(_) => "Register",
        }
    }
}

/// A request frame: a caller-chosen id plus the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Echoed back in the matching [`Response`].
    pub id: u64,
    pub call: Call,
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Reply to `Login` and `Reconnect`.
///
/// On immediate admission `token` and `profile` are set. On queueing,
/// `token` carries the queue ticket and `queue_position` the 1-based rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginReply {
    pub code: StatusCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<PlayerProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
}

impl LoginReply {
    /// A reply carrying only a status.
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            token: None,
            profile: None,
            queue_position: None,
        }
    }
}

/// Reply to operations that only report an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonReply {
    pub code: StatusCode,
    pub message: String,
}

impl CommonReply {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Reply to `GetQueueInfo`.
///
/// `estimated_wait_secs` is `position × average service time`: advisory,
/// not a promise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfoReply {
    pub code: StatusCode,
    pub message: String,
    pub position: u32,
    pub total: u32,
    pub estimated_wait_secs: u64,
}

impl QueueInfoReply {
    /// A failed lookup: position fields are zeroed.
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            position: 0,
            total: 0,
            estimated_wait_secs: 0,
        }
    }
}

/// The body of a response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Reply {
    Login(LoginReply),
    Common(CommonReply),
    QueueInfo(QueueInfoReply),
}

impl Reply {
    /// The status code carried by any reply variant.
    pub fn code(&self) -> StatusCode {
        match self {
            Self::Login(r) => r.code,
            Self::Common(r) => r.code,
            Self::QueueInfo(r) => r.code,
        }
    }
}

/// A response frame. `id` matches the [`Request`] it answers, or is 0
/// when the request could not be decoded at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub reply: Reply,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The gateway parses these shapes by hand, so the serde attributes
    //! are tested against literal JSON.

    use super::*;

    #[test]
    fn test_player_id_for_account_uses_player_prefix() {
        assert_eq!(PlayerId::for_account("bob").as_str(), "player_bob");
    }

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::for_account("a")).unwrap();
        assert_eq!(json, r#""player_a""#);
    }

    #[test]
    fn test_status_code_serializes_by_name() {
        let json = serde_json::to_string(&StatusCode::DeviceMismatch).unwrap();
        assert_eq!(json, r#""DeviceMismatch""#);
    }

    #[test]
    fn test_status_code_numeric_values_are_distinct() {
        let all = [
            StatusCode::Ok,
            StatusCode::InvalidArgument,
            StatusCode::Unauthorized,
            StatusCode::DeviceMismatch,
            StatusCode::NotFound,
            StatusCode::AlreadyExists,
            StatusCode::InternalError,
        ];
        let mut numbers: Vec<u16> = all.iter().map(|c| c.as_u16()).collect();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), all.len());
        assert!(StatusCode::Ok.is_ok());
        assert!(!StatusCode::NotFound.is_ok());
    }

    #[test]
    fn test_call_is_adjacently_tagged() {
        let call = Call::KickPlayer(KickPlayerRequest {
            player_id: PlayerId::for_account("b"),
            reason: "afk".into(),
        });

        let value = serde_json::to_value(&call).unwrap();

        assert_eq!(value["method"], "KickPlayer");
        assert_eq!(value["params"]["player_id"], "player_b");
        assert_eq!(value["params"]["reason"], "afk");
    }

    #[test]
    fn test_request_parses_gateway_json() {
        let raw = r#"{"id":9,"call":{"method":"Reconnect","params":{"token":"t","device_id":"D1"}}}"#;

        let request: Request = serde_json::from_str(raw).unwrap();

        assert_eq!(request.id, 9);
        assert_eq!(request.call.method(), "Reconnect");
        assert_eq!(
            request.call,
            Call::Reconnect(ReconnectRequest {
                token: "t".into(),
                device_id: "D1".into(),
            })
        );
    }

    #[test]
    fn test_login_reply_omits_absent_fields() {
        let reply = LoginReply::status(StatusCode::Unauthorized, "bad password");

        let value = serde_json::to_value(&reply).unwrap();

        assert_eq!(value["code"], "Unauthorized");
        assert!(value.get("token").is_none());
        assert!(value.get("profile").is_none());
        assert!(value.get("queue_position").is_none());
    }

    #[test]
    fn test_login_reply_parses_without_optional_fields() {
        let raw = r#"{"code":"Ok","message":"queued","queue_position":3}"#;

        let reply: LoginReply = serde_json::from_str(raw).unwrap();

        assert_eq!(reply.queue_position, Some(3));
        assert_eq!(reply.token, None);
    }

    #[test]
    fn test_reply_is_internally_tagged() {
        let response = Response {
            id: 4,
            reply: Reply::QueueInfo(QueueInfoReply {
                code: StatusCode::Ok,
                message: "ok".into(),
                position: 2,
                total: 5,
                estimated_wait_secs: 10,
            }),
        };

        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["id"], 4);
        assert_eq!(value["reply"]["type"], "QueueInfo");
        assert_eq!(value["reply"]["position"], 2);
        assert_eq!(response.reply.code(), StatusCode::Ok);
    }
}
