//! Player session management for Turnstile.
//!
//! This crate owns the record of who is online:
//!
//! 1. **Token issuance**: minting opaque bearer tokens ([`TokenIssuer`])
//! 2. **Session tracking**: one [`Session`] per online account, reachable
//!    by account, token, or player id ([`SessionRegistry`])
//! 3. **Reconnection**: re-authenticating by token with a device-binding
//!    check ([`SessionRegistry::reconnect`])
//! 4. **Credentials**: the [`AccountStore`] hook through which logins are
//!    verified (implemented outside this crate)
//!
//! # How it fits in the stack
//!
//! ```text
//! Admission layer (above)  ← decides who gets a session, owns the lock
//!     ↕
//! Session layer (this crate)  ← multi-indexed session bookkeeping
//!     ↕
//! Protocol layer (below)  ← PlayerId, PlayerProfile, request types
//! ```

#![allow(async_fn_in_trait)]

mod account;
mod error;
mod reconnect;
mod registry;
mod session;
mod token;

pub use account::{AccountError, AccountStore};
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{NewSession, Session};
pub use token::{RandomTokenIssuer, TokenIssuer};
