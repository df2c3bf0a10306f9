//! Unified error type for the Turnstile crates.

use turnstile_admission::AdmissionError;
use turnstile_protocol::ProtocolError;
use turnstile_session::{AccountError, SessionError};

use crate::config::ConfigError;
use crate::lifecycle::ServiceError;
use crate::transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `turnstile` crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
///
/// RPC handlers never surface these to clients; they map failures to
/// status codes instead. This type is for setup, transport, and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum TurnstileError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (token, device binding, duplicate login).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An admission-level error (capacity gate, queue).
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// An account store error (credentials, registration, hashing).
    #[error(transparent)]
    Account(#[from] AccountError),

    /// A configuration error (malformed environment variable).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A lifecycle error (service failed to start).
    #[error(transparent)]
    Service(#[from] ServiceError),
}
