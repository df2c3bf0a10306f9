//! Reconnection: resume a session by token, on the device it was bound to.
//!
//! A valid token is not enough on its own. The session remembers the
//! device it was created from, and a reconnect from any other device is
//! rejected with [`SessionError::DeviceMismatch`], even when the token
//! matches. A stolen token therefore can't be replayed from elsewhere.

use std::time::Instant;

use crate::{Session, SessionError, SessionRegistry, TokenIssuer};

impl<T: TokenIssuer> SessionRegistry<T> {
    /// Re-authenticates a session by token and device.
    ///
    /// On success only `last_reconnect` changes. The token and player id
    /// stay the same; a reconnect never mints a new token.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`]: no session owns `token`
    /// - [`SessionError::DeviceMismatch`]: the session is bound to
    ///   another device; the session is left untouched
    pub fn reconnect(
        &mut self,
        token: &str,
        device_id: &str,
    ) -> Result<&Session, SessionError> {
        let session = self
            .find_by_token_mut(token)
            .ok_or(SessionError::InvalidToken)?;

        if session.device_id != device_id {
            tracing::warn!(
                account = %session.account,
                player_id = %session.player_id,
                "reconnect rejected: device mismatch"
            );
            return Err(SessionError::DeviceMismatch(session.player_id.clone()));
        }

        session.last_reconnect = Some(Instant::now());
        tracing::info!(
            account = %session.account,
            player_id = %session.player_id,
            "player reconnected"
        );
        Ok(&*session)
    }
}
