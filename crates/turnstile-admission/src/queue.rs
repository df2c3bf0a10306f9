//! The admission queue: accounts waiting for a free slot, first come first served.
//!
//! Entries sit in a `VecDeque` in join order, so the front is always the
//! earliest joiner and a position is just the 1-based index. Two side maps
//! give O(1) membership by account and by ticket; positions are computed
//! by scanning, which is fine for queues in the thousands.
//!
//! Like the session registry this type has no lock of its own. The
//! admission controller guards it together with the registry.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use turnstile_protocol::PlayerProfile;

use crate::QueueError;

/// One account waiting for admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub account: String,
    /// Token handed to the client at enqueue time. Used to poll the queue
    /// and, after promotion, as the session token.
    pub ticket: String,
    /// The device the session will be bound to on promotion.
    pub device_id: String,
    /// Profile captured at login, shown once admitted.
    pub snapshot: PlayerProfile,
    pub join_time: Instant,
}

/// A 1-based position and the queue length at the time of the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePosition {
    pub position: usize,
    pub total: usize,
}

/// FIFO wait list.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    entries: VecDeque<QueueEntry>,
    /// account → ticket
    accounts: HashMap<String, String>,
    /// ticket → account
    tickets: HashMap<String, String>,
}

impl AdmissionQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an account to the back of the queue and returns its position.
    ///
    /// # Errors
    /// Returns [`QueueError::AlreadyQueued`] if the account already waits.
    pub fn enqueue(
        &mut self,
        account: String,
        ticket: String,
        device_id: String,
        snapshot: PlayerProfile,
    ) -> Result<usize, QueueError> {
        if self.accounts.contains_key(&account) {
            return Err(QueueError::AlreadyQueued(account));
        }

        self.accounts.insert(account.clone(), ticket.clone());
        self.tickets.insert(ticket.clone(), account.clone());
        self.entries.push_back(QueueEntry {
            account,
            ticket,
            device_id,
            snapshot,
            join_time: Instant::now(),
        });
        Ok(self.entries.len())
    }

    /// Puts a previously dequeued entry back at the front.
    ///
    /// Used when a promotion could not complete and must be retried on
    /// the next tick. The entry keeps its original `join_time`.
    pub fn requeue_front(&mut self, entry: QueueEntry) -> Result<(), QueueError> {
        if self.accounts.contains_key(&entry.account) {
            return Err(QueueError::AlreadyQueued(entry.account));
        }
        self.accounts
            .insert(entry.account.clone(), entry.ticket.clone());
        self.tickets
            .insert(entry.ticket.clone(), entry.account.clone());
        self.entries.push_front(entry);
        Ok(())
    }

    /// Position of an account.
    ///
    /// # Errors
    /// Returns [`QueueError::NotInQueue`] if the account isn't waiting.
    pub fn position_of(&self, account: &str) -> Result<QueuePosition, QueueError> {
        self.entries
            .iter()
            .position(|e| e.account == account)
            .map(|idx| QueuePosition {
                position: idx + 1,
                total: self.entries.len(),
            })
            .ok_or_else(|| QueueError::NotInQueue(account.to_string()))
    }

    /// Position of the entry holding `ticket`.
    ///
    /// # Errors
    /// Returns [`QueueError::NotInQueue`] if no entry holds the ticket.
    pub fn position_of_ticket(&self, ticket: &str) -> Result<QueuePosition, QueueError> {
        let account = self
            .tickets
            .get(ticket)
            .ok_or_else(|| QueueError::NotInQueue("ticket".to_string()))?;
        self.position_of(account)
    }

    /// The account holding `ticket`, if queued.
    pub fn account_of(&self, ticket: &str) -> Option<&str> {
        self.tickets.get(ticket).map(String::as_str)
    }

    /// The ticket of a queued account.
    pub fn ticket_of(&self, account: &str) -> Option<&str> {
        self.accounts.get(account).map(String::as_str)
    }

    /// Removes and returns the earliest-joined entry.
    pub fn dequeue_front(&mut self) -> Option<QueueEntry> {
        let entry = self.entries.pop_front()?;
        self.forget(&entry);
        Some(entry)
    }

    /// Removes an arbitrary entry (the account gave up waiting).
    ///
    /// Returns `None` if the account wasn't queued. Everyone behind it
    /// moves up one position.
    pub fn remove(&mut self, account: &str) -> Option<QueueEntry> {
        let idx = self.entries.iter().position(|e| e.account == account)?;
        let entry = self.entries.remove(idx)?;
        self.forget(&entry);
        Some(entry)
    }

    /// Returns `true` if the account is waiting.
    pub fn contains(&self, account: &str) -> bool {
        self.accounts.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    fn forget(&mut self, entry: &QueueEntry) {
        self.accounts.remove(&entry.account);
        self.tickets.remove(&entry.ticket);
    }
}
