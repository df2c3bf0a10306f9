//! The admission controller: one lock around the registry and the queue.
//!
//! Every operation that reads or changes who is online or who is waiting
//! goes through [`AdmissionController`]. Both structures live in a single
//! [`Gate`] behind one `RwLock`, which gives three guarantees:
//!
//! - the capacity check and the session insert happen in the same
//!   critical section, so concurrent logins can't overshoot capacity;
//! - an account is never visible in both the registry and the queue;
//! - no reader ever sees a half-removed session.
//!
//! Lookups take the read lock; anything that mutates takes the write
//! lock. Nothing awaits while holding either, so critical sections are
//! short, in-memory map updates.
//!
//! # Account state machine
//!
//! ```text
//!            admit (room, queue empty)
//!   Absent ─────────────────────────────→ Active ──reconnect──→ Active
//!     │  ↑                                  ↑ │
//!     │  └───────leave_queue───────┐        │ └──kick / idle──→ Absent
//!     └──admit (full)──→ Queued ───┴─promote┘
//! ```

use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use turnstile_protocol::{PlayerId, PlayerProfile};
use turnstile_session::{
    NewSession, RandomTokenIssuer, Session, SessionError, SessionRegistry, TokenIssuer,
};

use crate::{
    AdmissionConfig, AdmissionError, AdmissionQueue, QueueEntry, QueueError, QueuePosition,
    ReloginPolicy,
};

/// Outcome of a login that passed credential checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A session was created; `session.token` is the client's credential.
    Admitted(Session),
    /// Capacity is exhausted (or others are already waiting). The ticket
    /// identifies the queue entry and becomes the session token on
    /// promotion.
    Queued { ticket: String, position: usize },
}

/// Where a ticket stands in the queue, with an advisory ETA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStatus {
    pub position: usize,
    pub total: usize,
    pub estimated_wait: Duration,
}

/// What one promoter tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionReport {
    pub evicted: Vec<Session>,
    pub promoted: Vec<Session>,
}

/// The registry and the queue, always locked together.
struct Gate<T: TokenIssuer> {
    registry: SessionRegistry<T>,
    queue: AdmissionQueue,
}

/// Capacity-gated admission over a session registry and a FIFO queue.
///
/// Shared across tasks behind an `Arc`; all methods take `&self`.
pub struct AdmissionController<T: TokenIssuer = RandomTokenIssuer> {
    gate: RwLock<Gate<T>>,
    config: AdmissionConfig,
}

impl AdmissionController<RandomTokenIssuer> {
    /// Creates a controller that mints tokens with [`RandomTokenIssuer`].
    pub fn new(config: AdmissionConfig) -> Self {
        Self::with_issuer(config, RandomTokenIssuer)
    }
}

impl<T: TokenIssuer> AdmissionController<T> {
    /// Creates a controller with a custom token issuer.
    pub fn with_issuer(config: AdmissionConfig, issuer: T) -> Self {
        let config = config.validated();
        tracing::debug!(
            capacity = config.capacity,
            relogin = ?config.relogin,
            "admission controller created"
        );
        Self {
            gate: RwLock::new(Gate {
                registry: SessionRegistry::with_issuer(issuer),
                queue: AdmissionQueue::new(),
            }),
            config,
        }
    }

    /// The validated configuration in effect.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Login path
    // -----------------------------------------------------------------

    /// Admits an authenticated account or places it in the queue.
    ///
    /// Decision order, all under the write lock:
    /// 1. Already queued → the existing ticket and current position. The
    ///    entry is left untouched: `device_id` and `profile` of the repeat
    ///    login are ignored, and the session is bound to the device the
    ///    account first queued from.
    /// 2. Already online → per [`ReloginPolicy`]: reject, or remove the
    ///    old session and admit into the freed slot.
    /// 3. Below capacity and nobody waiting → admitted.
    /// 4. Otherwise → queued at the back.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyOnline`] under [`ReloginPolicy::Reject`]
    /// - [`SessionError::TokenCollision`] if the minted token is taken
    pub async fn admit(
        &self,
        account: &str,
        device_id: &str,
        profile: PlayerProfile,
    ) -> Result<Admission, AdmissionError> {
        let mut guard = self.gate.write().await;
        let gate = &mut *guard;

        if let Some(ticket) = gate.queue.ticket_of(account) {
            let ticket = ticket.to_string();
            let position = gate.queue.position_of(account)?.position;
            tracing::debug!(%account, position, "login while queued, keeping place");
            return Ok(Admission::Queued { ticket, position });
        }

        let mut replacing = false;
        if gate.registry.find_by_account(account).is_some() {
            match self.config.relogin {
                ReloginPolicy::Reject => {
                    tracing::info!(%account, "login rejected: already online");
                    return Err(SessionError::AlreadyOnline(account.to_string()).into());
                }
                ReloginPolicy::Replace => {
                    gate.registry.remove(account);
                    tracing::info!(%account, "replacing existing session");
                    replacing = true;
                }
            }
        }

        let occupancy = gate.registry.occupancy();
        if replacing || (occupancy < self.config.capacity && gate.queue.is_empty()) {
            let session = gate
                .registry
                .create(NewSession {
                    account: account.to_string(),
                    player_id: PlayerId::for_account(account),
                    device_id: device_id.to_string(),
                    profile,
                })?
                .clone();
            tracing::info!(
                %account,
                occupancy = occupancy + usize::from(!replacing),
                capacity = self.config.capacity,
                "account admitted"
            );
            return Ok(Admission::Admitted(session));
        }

        let ticket = gate.registry.mint_token(account);
        let position = gate.queue.enqueue(
            account.to_string(),
            ticket.clone(),
            device_id.to_string(),
            profile,
        )?;
        tracing::info!(
            %account,
            position,
            occupancy,
            capacity = self.config.capacity,
            "account queued"
        );
        Ok(Admission::Queued { ticket, position })
    }

    // -----------------------------------------------------------------
    // Active-session operations
    // -----------------------------------------------------------------

    /// Resumes a session by token on its bound device.
    ///
    /// # Errors
    /// [`SessionError::InvalidToken`] or [`SessionError::DeviceMismatch`].
    pub async fn reconnect(&self, token: &str, device_id: &str) -> Result<Session, SessionError> {
        let mut gate = self.gate.write().await;
        gate.registry.reconnect(token, device_id).cloned()
    }

    /// Removes the session of `player_id` from every index.
    ///
    /// The freed slot is handed to the queue on the next promoter tick.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the player has no session.
    pub async fn kick(&self, player_id: &PlayerId) -> Result<Session, SessionError> {
        let mut gate = self.gate.write().await;
        let account = gate
            .registry
            .find_by_id(player_id)
            .map(|s| s.account.clone())
            .ok_or_else(|| SessionError::NotFound(player_id.to_string()))?;
        gate.registry
            .remove(&account)
            .ok_or_else(|| SessionError::NotFound(player_id.to_string()))
    }

    // -----------------------------------------------------------------
    // Queue operations
    // -----------------------------------------------------------------

    /// Reports the queue position of a ticket.
    ///
    /// # Errors
    /// - [`QueueError::NotInQueue`]: the token belongs to an active
    ///   session (already promoted or admitted directly)
    /// - [`SessionError::InvalidToken`]: nobody holds the token
    pub async fn queue_status(&self, token: &str) -> Result<QueueStatus, AdmissionError> {
        let gate = self.gate.read().await;
        match gate.queue.position_of_ticket(token) {
            Ok(QueuePosition { position, total }) => Ok(QueueStatus {
                position,
                total,
                estimated_wait: self.config.estimated_wait(position),
            }),
            Err(_) => Err(Self::not_queued(&gate, token)),
        }
    }

    /// Removes a queued entry by ticket (the client stopped waiting).
    ///
    /// # Errors
    /// Same classification as [`Self::queue_status`].
    pub async fn leave_queue(&self, token: &str) -> Result<QueueEntry, AdmissionError> {
        let mut guard = self.gate.write().await;
        let gate = &mut *guard;
        let Some(account) = gate.queue.account_of(token).map(str::to_string) else {
            return Err(Self::not_queued(gate, token));
        };
        let entry = gate
            .queue
            .remove(&account)
            .ok_or_else(|| QueueError::NotInQueue(account.clone()))?;
        tracing::info!(%account, "account left the queue");
        Ok(entry)
    }

    fn not_queued(gate: &Gate<T>, token: &str) -> AdmissionError {
        match gate.registry.find_by_token(token) {
            Some(session) => QueueError::NotInQueue(session.account.clone()).into(),
            None => SessionError::InvalidToken.into(),
        }
    }

    // -----------------------------------------------------------------
    // Background maintenance
    // -----------------------------------------------------------------

    /// Moves queue-front entries into free slots until capacity is reached
    /// or the queue is empty.
    ///
    /// Each promoted session reuses the entry's ticket as its token and
    /// is bound to the device the entry was queued from. Never fails: an
    /// entry whose account is somehow already online is dropped, and any
    /// other failure puts the entry back at the front for the next call.
    pub async fn promote(&self) -> Vec<Session> {
        let mut guard = self.gate.write().await;
        let gate = &mut *guard;
        let mut promoted = Vec::new();

        while gate.registry.occupancy() < self.config.capacity {
            let Some(entry) = gate.queue.dequeue_front() else {
                break;
            };
            let new = NewSession {
                account: entry.account.clone(),
                player_id: PlayerId::for_account(&entry.account),
                device_id: entry.device_id.clone(),
                profile: entry.snapshot.clone(),
            };

            match gate.registry.create_with_token(new, entry.ticket.clone()) {
                Ok(session) => {
                    tracing::info!(
                        account = %session.account,
                        waited_ms = entry.join_time.elapsed().as_millis() as u64,
                        "queued account promoted"
                    );
                    promoted.push(session.clone());
                }
                Err(SessionError::AlreadyOnline(account)) => {
                    tracing::warn!(%account, "queued account already online, dropping entry");
                }
                Err(e) => {
                    tracing::warn!(
                        account = %entry.account,
                        error = %e,
                        "promotion failed, retrying next tick"
                    );
                    if let Err(e) = gate.queue.requeue_front(entry) {
                        tracing::warn!(error = %e, "could not requeue entry");
                    }
                    break;
                }
            }
        }

        promoted
    }

    /// Evicts sessions idle longer than the configured `idle_timeout`.
    ///
    /// A no-op when no timeout is configured.
    pub async fn evict_idle(&self) -> Vec<Session> {
        let Some(timeout) = self.config.idle_timeout else {
            return Vec::new();
        };
        let mut gate = self.gate.write().await;
        gate.registry.evict_idle(timeout, Instant::now())
    }

    /// One maintenance pass: evict idle sessions, then fill free slots.
    pub async fn promotion_tick(&self) -> PromotionReport {
        let evicted = self.evict_idle().await;
        let promoted = self.promote().await;
        PromotionReport { evicted, promoted }
    }

    // -----------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------

    /// Number of active sessions.
    pub async fn occupancy(&self) -> usize {
        self.gate.read().await.registry.occupancy()
    }

    /// Number of queued accounts.
    pub async fn queue_len(&self) -> usize {
        self.gate.read().await.queue.len()
    }

    /// Queue position of an account.
    ///
    /// # Errors
    /// [`QueueError::NotInQueue`] if the account isn't waiting.
    pub async fn queue_position(&self, account: &str) -> Result<QueuePosition, QueueError> {
        self.gate.read().await.queue.position_of(account)
    }

    pub async fn is_queued(&self, account: &str) -> bool {
        self.gate.read().await.queue.contains(account)
    }

    pub async fn find_by_account(&self, account: &str) -> Option<Session> {
        self.gate.read().await.registry.find_by_account(account).cloned()
    }

    pub async fn find_by_token(&self, token: &str) -> Option<Session> {
        self.gate.read().await.registry.find_by_token(token).cloned()
    }

    pub async fn find_by_id(&self, player_id: &PlayerId) -> Option<Session> {
        self.gate.read().await.registry.find_by_id(player_id).cloned()
    }
}
