//! Capacity-gated admission for Turnstile.
//!
//! Sits between the login RPCs and the session registry and decides, for
//! each authenticated login, whether the account gets a session now or
//! waits in line.
//!
//! - [`AdmissionController`] owns the [`SessionRegistry`] and the
//!   [`AdmissionQueue`] behind one lock, so capacity checks are atomic
//!   with respect to every other mutation.
//! - [`run_promoter`] is the background task that moves waiting accounts
//!   into slots freed by kicks and idle eviction.
//!
//! [`SessionRegistry`]: turnstile_session::SessionRegistry

mod config;
mod controller;
mod error;
mod promoter;
mod queue;

pub use config::{AdmissionConfig, ReloginPolicy};
pub use controller::{Admission, AdmissionController, PromotionReport, QueueStatus};
pub use error::{AdmissionError, QueueError};
pub use promoter::run_promoter;
pub use queue::{AdmissionQueue, QueueEntry, QueuePosition};
