//! # Turnstile
//!
//! Login admission tier for game backends.
//!
//! Turnstile sits behind a gateway and answers its login RPCs. It checks
//! credentials through an [`AccountStore`](turnstile_session::AccountStore),
//! issues session tokens, caps concurrent players at a configured
//! capacity, and holds everyone beyond that in a FIFO queue that drains
//! automatically as slots free up.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use turnstile::prelude::*;
//!
//! # async fn run() -> Result<(), TurnstileError> {
//! let config = ServerConfig::from_env()?;
//! let accounts = MemoryAccountStore::new(config.bcrypt_cost)?;
//! let server = TurnstileServerBuilder::new().config(&config).build(accounts).await?;
//! server.serve_until(std::future::pending()).await
//! # }
//! ```

mod accounts;
mod config;
mod error;
mod handler;
mod lifecycle;
mod server;
mod service;
mod transport;

pub use accounts::{MAX_BCRYPT_COST, MIN_BCRYPT_COST, MemoryAccountStore};
pub use config::{ConfigError, DEFAULT_BIND_ADDR, ServerConfig};
pub use error::TurnstileError;
pub use lifecycle::{Service, ServiceError, ServiceSet};
pub use server::{
    DEFAULT_CONNECTION_IDLE_TIMEOUT, PromoterService, RpcService, TurnstileServer,
    TurnstileServerBuilder,
};
pub use service::{LoginService, ToStatus};
pub use transport::{ConnectionId, RpcConnection, RpcListener, TransportError};

/// Everything needed to embed a login tier.
pub mod prelude {
    pub use crate::{
        LoginService, MemoryAccountStore, ServerConfig, Service, ServiceSet, TurnstileError,
        TurnstileServer, TurnstileServerBuilder,
    };
    pub use turnstile_admission::{
        Admission, AdmissionConfig, AdmissionController, ReloginPolicy, run_promoter,
    };
    pub use turnstile_protocol::{
        Call, CommonReply, LoginReply, PlayerId, PlayerProfile, QueueInfoReply, Reply, Request,
        Response, StatusCode,
    };
    pub use turnstile_session::{AccountError, AccountStore, Session, SessionError};
}
