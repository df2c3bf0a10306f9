//! Error types for the admission layer.

use turnstile_session::SessionError;

/// Errors from the wait queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The account already has an entry. An account is queued at most once.
    #[error("account {0} is already queued")]
    AlreadyQueued(String),

    /// No entry matches the given account or ticket.
    #[error("{0} is not in the queue")]
    NotInQueue(String),
}

/// Errors from the admission controller.
///
/// Wraps the two structures the controller coordinates, so callers can
/// match on the precise cause.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
