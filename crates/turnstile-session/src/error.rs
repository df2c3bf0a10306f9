//! Error types for the session layer.

use turnstile_protocol::PlayerId;

/// Errors that can occur while creating, looking up, or resuming sessions.
///
/// All of these are local and recoverable: the caller maps them to a
/// status code and carries on.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The account already has a session. An account can hold at most one.
    #[error("account {0} is already online")]
    AlreadyOnline(String),

    /// No session matches the given key (account or player id).
    #[error("no session for {0}")]
    NotFound(String),

    /// No session owns the presented token.
    #[error("invalid session token")]
    InvalidToken,

    /// The token is valid, but the session is bound to another device.
    #[error("device mismatch for player {0}")]
    DeviceMismatch(PlayerId),

    /// A freshly minted token is already owned by another session.
    ///
    /// Tokens carry 128 random bits, so this should never be observed;
    /// the registry refuses the insert rather than alias two sessions.
    #[error("token collision while creating session for {0}")]
    TokenCollision(String),
}
