//! Wire protocol for Turnstile.
//!
//! This crate defines the contract between the gateway tier and the
//! login tier:
//!
//! - **Types** ([`Request`], [`Call`], [`Response`], [`Reply`],
//!   [`StatusCode`], etc.): the RPC frames that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding
//!   or decoding.
//!
//! # Architecture
//!
//! ```text
//! Gateway (HTTP) → Protocol (Request/Response) → Login tier (admission)
//! ```
//!
//! The protocol layer knows nothing about sessions or queues. It only
//! describes the shape of each operation and its reply.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Call, CommonReply, KickPlayerRequest, LeaveQueueRequest, LoginReply,
    LoginRequest, PlayerId, PlayerProfile, QueueInfoReply, QueueInfoRequest,
    ReconnectRequest, RegisterRequest, Reply, Request, Response, StatusCode,
};
