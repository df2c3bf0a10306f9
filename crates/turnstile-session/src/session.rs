//! Session types: the record of one online account.

use std::time::Instant;

use turnstile_protocol::{PlayerId, PlayerProfile};

/// Everything the registry needs to create a session, minus the token.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub account: String,
    pub player_id: PlayerId,
    /// The device the session is bound to. Reconnects must present it.
    pub device_id: String,
    pub profile: PlayerProfile,
}

/// A single online account.
///
/// Created on admission, refreshed on reconnect, destroyed on kick or
/// idle eviction. `token` and `player_id` never change over a session's
/// lifetime; a reconnect only updates `last_reconnect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub account: String,
    pub player_id: PlayerId,
    /// Opaque bearer credential handed to the client.
    pub token: String,
    pub device_id: String,
    pub profile: PlayerProfile,
    pub login_time: Instant,
    /// `None` until the first successful reconnect.
    pub last_reconnect: Option<Instant>,
}

impl Session {
    /// The most recent moment the client proved it was alive.
    pub fn last_active(&self) -> Instant {
        self.last_reconnect.unwrap_or(self.login_time)
    }
}
