//! The session registry: every online account, indexed three ways.
//!
//! A session can be found by account (login and admission checks), by
//! token (reconnect and queue lookups), or by player id (kick). The
//! registry owns the only copy of each [`Session`]; the token and player
//! indices map to the account key, so all three lookups resolve to the
//! same record and can never disagree about its contents.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself. It is owned by the
//! admission controller, which wraps it (together with the wait queue)
//! in one lock so that capacity checks and inserts are a single critical
//! section. Keeping this type lock-free makes every operation here a
//! plain, synchronous map update.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};

use turnstile_protocol::PlayerId;

use crate::{NewSession, RandomTokenIssuer, Session, SessionError, TokenIssuer};

/// Tracks all active sessions.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ [Active] ──reconnect()──→ [Active]
///                 │
///                 ├──remove() / kick──→ [Absent]
///                 └──evict_idle()─────→ [Absent]
/// ```
pub struct SessionRegistry<T: TokenIssuer = RandomTokenIssuer> {
    /// Primary storage, keyed by account.
    sessions: HashMap<String, Session>,

    /// token → account. Kept in sync with `sessions`.
    tokens: HashMap<String, String>,

    /// player id → account. Kept in sync with `sessions`.
    players: HashMap<PlayerId, String>,

    issuer: T,
}

impl SessionRegistry<RandomTokenIssuer> {
    /// Creates an empty registry with the default random token issuer.
    pub fn new() -> Self {
        Self::with_issuer(RandomTokenIssuer)
    }
}

impl Default for SessionRegistry<RandomTokenIssuer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TokenIssuer> SessionRegistry<T> {
    /// Creates an empty registry that mints tokens with `issuer`.
    pub fn with_issuer(issuer: T) -> Self {
        Self {
            sessions: HashMap::new(),
            tokens: HashMap::new(),
            players: HashMap::new(),
            issuer,
        }
    }

    /// Mints a token without creating a session.
    ///
    /// Used for queue tickets, which later become the session token when
    /// the entry is promoted.
    pub fn mint_token(&self, account: &str) -> String {
        self.issuer.issue(account)
    }

    /// Creates a session with a freshly minted token.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyOnline`] if the account already has
    /// a session. Whether to evict the old one first is the caller's call.
    pub fn create(&mut self, new: NewSession) -> Result<&Session, SessionError> {
        let token = self.issuer.issue(&new.account);
        self.create_with_token(new, token)
    }

    /// Creates a session that uses a token minted earlier.
    ///
    /// All three indices are updated before this returns; on error none
    /// of them are touched.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyOnline`]: account or player id in use
    /// - [`SessionError::TokenCollision`]: another session owns `token`
    pub fn create_with_token(
        &mut self,
        new: NewSession,
        token: String,
    ) -> Result<&Session, SessionError> {
        if self.players.contains_key(&new.player_id) {
            return Err(SessionError::AlreadyOnline(new.account));
        }
        if self.tokens.contains_key(&token) {
            return Err(SessionError::TokenCollision(new.account));
        }

        match self.sessions.entry(new.account.clone()) {
            Entry::Occupied(_) => Err(SessionError::AlreadyOnline(new.account)),
            Entry::Vacant(slot) => {
                self.tokens.insert(token.clone(), new.account.clone());
                self.players
                    .insert(new.player_id.clone(), new.account.clone());

                tracing::info!(
                    account = %new.account,
                    player_id = %new.player_id,
                    "session created"
                );

                Ok(&*slot.insert(Session {
                    account: new.account,
                    player_id: new.player_id,
                    token,
                    device_id: new.device_id,
                    profile: new.profile,
                    login_time: Instant::now(),
                    last_reconnect: None,
                }))
            }
        }
    }

    /// Removes an account's session from every index.
    ///
    /// Idempotent: removing an absent account returns `None` and changes
    /// nothing.
    pub fn remove(&mut self, account: &str) -> Option<Session> {
        let session = self.sessions.remove(account)?;
        self.tokens.remove(&session.token);
        self.players.remove(&session.player_id);

        tracing::info!(
            account = %session.account,
            player_id = %session.player_id,
            "session removed"
        );
        Some(session)
    }

    /// Looks up a session by account.
    pub fn find_by_account(&self, account: &str) -> Option<&Session> {
        self.sessions.get(account)
    }

    /// Looks up a session by token.
    pub fn find_by_token(&self, token: &str) -> Option<&Session> {
        self.tokens
            .get(token)
            .and_then(|account| self.sessions.get(account))
    }

    /// Looks up a session by player id.
    pub fn find_by_id(&self, player_id: &PlayerId) -> Option<&Session> {
        self.players
            .get(player_id)
            .and_then(|account| self.sessions.get(account))
    }

    pub(crate) fn find_by_token_mut(&mut self, token: &str) -> Option<&mut Session> {
        let account = self.tokens.get(token)?;
        self.sessions.get_mut(account)
    }

    /// Removes every session idle for longer than `timeout` as of `now`.
    ///
    /// "Idle" means no login or reconnect since then. Returns the evicted
    /// sessions so the caller can log or notify.
    pub fn evict_idle(&mut self, timeout: Duration, now: Instant) -> Vec<Session> {
        let stale: Vec<String> = self
            .sessions
            .values()
            .filter(|s| now.saturating_duration_since(s.last_active()) > timeout)
            .map(|s| s.account.clone())
            .collect();

        stale
            .iter()
            .filter_map(|account| self.remove(account))
            .inspect(|s| {
                tracing::info!(
                    account = %s.account,
                    player_id = %s.player_id,
                    "session evicted (idle timeout)"
                );
            })
            .collect()
    }

    /// Number of active sessions.
    pub fn occupancy(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session is active.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Iterates over all active sessions in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
pub(crate) mod tests {
    //! Unit tests for `SessionRegistry`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use std::sync::atomic::{AtomicU64, Ordering};

    use turnstile_protocol::PlayerProfile;

    use super::*;

    /// Issues `tok-1`, `tok-2`, ... so tests can predict tokens.
    #[derive(Default)]
    pub(crate) struct SeqIssuer(AtomicU64);

    impl TokenIssuer for SeqIssuer {
        fn issue(&self, _account: &str) -> String {
            format!("tok-{}", self.0.fetch_add(1, Ordering::Relaxed) + 1)
        }
    }

    pub(crate) fn new_session(account: &str, device: &str) -> NewSession {
        let player_id = PlayerId::for_account(account);
        NewSession {
            account: account.to_string(),
            player_id: player_id.clone(),
            device_id: device.to_string(),
            profile: PlayerProfile {
                id: player_id,
                nickname: format!("Player_{account}"),
                level: 1,
                exp: 0,
                vip_level: 0,
                items: vec![1001, 1002],
            },
        }
    }

    fn registry() -> SessionRegistry<SeqIssuer> {
        SessionRegistry::with_issuer(SeqIssuer::default())
    }

    // =====================================================================
    // create()
    // =====================================================================

    #[test]
    fn test_create_new_account_indexes_all_three_keys() {
        let mut reg = registry();

        let token = reg.create(new_session("a", "D1")).unwrap().token.clone();

        let by_account = reg.find_by_account("a").unwrap();
        let by_token = reg.find_by_token(&token).unwrap();
        let by_id = reg.find_by_id(&PlayerId::for_account("a")).unwrap();
        assert!(std::ptr::eq(by_account, by_token));
        assert!(std::ptr::eq(by_account, by_id));
        assert_eq!(by_account.device_id, "D1");
        assert_eq!(by_account.last_reconnect, None);
        assert_eq!(reg.occupancy(), 1);
    }

    #[test]
    fn test_create_already_online_returns_error_and_keeps_original() {
        let mut reg = registry();
        let original = reg.create(new_session("a", "D1")).unwrap().token.clone();

        let result = reg.create(new_session("a", "D2"));

        assert!(
            matches!(result, Err(SessionError::AlreadyOnline(ref a)) if a == "a"),
            "should reject second session for the same account"
        );
        assert_eq!(reg.occupancy(), 1);
        assert_eq!(reg.find_by_account("a").unwrap().token, original);
        assert_eq!(reg.find_by_account("a").unwrap().device_id, "D1");
    }

    #[test]
    fn test_create_with_taken_token_returns_collision() {
        let mut reg = registry();
        reg.create_with_token(new_session("a", "D"), "shared".into())
            .unwrap();

        let result = reg.create_with_token(new_session("b", "D"), "shared".into());

        assert!(matches!(result, Err(SessionError::TokenCollision(_))));
        assert!(reg.find_by_account("b").is_none());
        assert!(reg.find_by_id(&PlayerId::for_account("b")).is_none());
        assert_eq!(reg.find_by_token("shared").unwrap().account, "a");
    }

    #[test]
    fn test_create_uses_issuer_for_each_session() {
        let mut reg = registry();

        let t1 = reg.create(new_session("a", "D")).unwrap().token.clone();
        let t2 = reg.create(new_session("b", "D")).unwrap().token.clone();

        assert_eq!(t1, "tok-1");
        assert_eq!(t2, "tok-2");
    }

    // =====================================================================
    // remove()
    // =====================================================================

    #[test]
    fn test_remove_clears_every_index() {
        let mut reg = registry();
        let token = reg.create(new_session("a", "D")).unwrap().token.clone();

        let removed = reg.remove("a").expect("session existed");

        assert_eq!(removed.account, "a");
        assert!(reg.find_by_account("a").is_none());
        assert!(reg.find_by_token(&token).is_none());
        assert!(reg.find_by_id(&PlayerId::for_account("a")).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_remove_twice_is_noop() {
        let mut reg = registry();
        reg.create(new_session("a", "D")).unwrap();
        reg.create(new_session("b", "D")).unwrap();

        assert!(reg.remove("a").is_some());
        assert!(reg.remove("a").is_none());

        assert_eq!(reg.occupancy(), 1);
        assert!(reg.find_by_account("b").is_some());
    }

    #[test]
    fn test_remove_then_create_issues_new_token() {
        let mut reg = registry();
        let old = reg.create(new_session("a", "D")).unwrap().token.clone();
        reg.remove("a");

        let new = reg.create(new_session("a", "D")).unwrap().token.clone();

        assert_ne!(old, new);
        assert!(reg.find_by_token(&old).is_none());
    }

    // =====================================================================
    // lookups / coherence
    // =====================================================================

    #[test]
    fn test_find_unknown_keys_return_none() {
        let reg = registry();

        assert!(reg.find_by_account("ghost").is_none());
        assert!(reg.find_by_token("tok-99").is_none());
        assert!(reg.find_by_id(&PlayerId::for_account("ghost")).is_none());
    }

    #[test]
    fn test_indices_stay_coherent_through_mixed_operations() {
        let mut reg = registry();
        for name in ["a", "b", "c", "d", "e"] {
            reg.create(new_session(name, "D")).unwrap();
        }
        reg.remove("b");
        reg.remove("d");
        reg.create(new_session("b", "D")).unwrap();

        for s in reg.iter() {
            let by_account = reg.find_by_account(&s.account).unwrap();
            let by_token = reg.find_by_token(&s.token).unwrap();
            let by_id = reg.find_by_id(&s.player_id).unwrap();
            assert_eq!(by_account, s);
            assert_eq!(by_token, s);
            assert_eq!(by_id, s);
        }
        assert_eq!(reg.occupancy(), 4);
    }

    // =====================================================================
    // evict_idle()
    // =====================================================================

    #[test]
    fn test_evict_idle_removes_only_stale_sessions() {
        let mut reg = registry();
        reg.create(new_session("a", "D")).unwrap();
        reg.create(new_session("b", "D")).unwrap();

        // Pretend "b" reconnected far in the future relative to "a".
        let later = Instant::now() + Duration::from_secs(120);
        reg.find_by_token_mut("tok-2").unwrap().last_reconnect = Some(later);

        let evicted = reg.evict_idle(Duration::from_secs(60), later);

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].account, "a");
        assert!(reg.find_by_account("a").is_none());
        assert!(reg.find_by_token("tok-1").is_none());
        assert!(reg.find_by_account("b").is_some());
    }

    #[test]
    fn test_evict_idle_within_timeout_keeps_everything() {
        let mut reg = registry();
        reg.create(new_session("a", "D")).unwrap();

        let evicted = reg.evict_idle(Duration::from_secs(3600), Instant::now());

        assert!(evicted.is_empty());
        assert_eq!(reg.occupancy(), 1);
    }
}
