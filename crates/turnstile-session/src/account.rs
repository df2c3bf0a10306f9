//! Credential hook for verifying logins and creating accounts.
//!
//! Turnstile doesn't store passwords itself. Persistence and hashing
//! belong to an account service (a database, an identity provider, or
//! the in-memory store shipped with the `turnstile` crate). The login
//! tier talks to it only through the [`AccountStore`] trait.

use turnstile_protocol::{PlayerProfile, RegisterRequest};

/// Failures reported by an [`AccountStore`].
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Unknown account or wrong password. Deliberately doesn't say which.
    #[error("invalid account or password")]
    InvalidCredentials,

    /// Registration for an account name that is taken.
    #[error("account {0} already exists")]
    AccountExists(String),

    /// The store itself failed (hashing, storage, a panicked worker).
    #[error("account store failure: {0}")]
    Internal(String),
}

/// Verifies credentials and registers accounts.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because one store is shared by every
/// connection task for the lifetime of the server, and the returned
/// futures must be `Send` so Tokio can move them between worker threads.
///
/// # Example
///
/// ```rust
/// use turnstile_protocol::{PlayerId, PlayerProfile, RegisterRequest};
/// use turnstile_session::{AccountError, AccountStore};
///
/// /// Accepts any account whose password equals its name.
/// /// Only for local testing.
/// struct EchoStore;
///
/// impl AccountStore for EchoStore {
///     async fn verify(
///         &self,
///         account: &str,
///         password: &str,
///     ) -> Result<PlayerProfile, AccountError> {
///         if account != password {
///             return Err(AccountError::InvalidCredentials);
///         }
///         Ok(PlayerProfile {
///             id: PlayerId::for_account(account),
///             nickname: account.to_string(),
///             level: 1,
///             exp: 0,
///             vip_level: 0,
///             items: Vec::new(),
///         })
///     }
///
///     async fn register(&self, req: &RegisterRequest) -> Result<(), AccountError> {
///         Err(AccountError::AccountExists(req.account.clone()))
///     }
/// }
/// ```
pub trait AccountStore: Send + Sync + 'static {
    /// Checks `password` for `account` and returns the profile to show
    /// once the player is admitted.
    ///
    /// # Errors
    /// - [`AccountError::InvalidCredentials`]: unknown account or bad password
    /// - [`AccountError::Internal`]: the store could not answer
    fn verify(
        &self,
        account: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<PlayerProfile, AccountError>> + Send;

    /// Creates a new account.
    ///
    /// # Errors
    /// - [`AccountError::AccountExists`]: the name is taken
    /// - [`AccountError::Internal`]: hashing or persistence failed
    fn register(
        &self,
        req: &RegisterRequest,
    ) -> impl std::future::Future<Output = Result<(), AccountError>> + Send;
}
