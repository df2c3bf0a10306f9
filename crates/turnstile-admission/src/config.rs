//! Admission configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ReloginPolicy
// ---------------------------------------------------------------------------

/// What happens when an account that is already online logs in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloginPolicy {
    /// The new login fails with `AlreadyOnline`; the existing session is
    /// untouched.
    #[default]
    Reject,
    /// Kick-then-admit: the existing session is removed and a fresh one
    /// (new token, new device binding) takes its slot, in one critical
    /// section. The queue is not consulted because no capacity is gained.
    Replace,
}

impl FromStr for ReloginPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown relogin policy {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// AdmissionConfig
// ---------------------------------------------------------------------------

/// Capacity and timing knobs for the admission gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Maximum concurrent sessions. Logins beyond this wait in the queue.
    pub capacity: usize,

    /// Policy for a login from an account that is already online.
    pub relogin: ReloginPolicy,

    /// How often the promoter moves queued accounts into free slots.
    pub promote_interval: Duration,

    /// Per-position wait used for the advisory ETA
    /// (`position × average_service_time`).
    pub average_service_time: Duration,

    /// Sessions with no login or reconnect for this long are evicted by
    /// the promoter. `None` disables eviction.
    pub idle_timeout: Option<Duration>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            relogin: ReloginPolicy::Reject,
            promote_interval: Duration::from_millis(500),
            average_service_time: Duration::from_secs(5),
            idle_timeout: None,
        }
    }
}

impl AdmissionConfig {
    /// Smallest promote interval accepted; anything lower busy-loops the lock.
    pub const MIN_PROMOTE_INTERVAL: Duration = Duration::from_millis(10);

    /// Creates a config with the given capacity and defaults elsewhere.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`AdmissionController::new`](crate::AdmissionController::new).
    /// - `capacity` of 0 becomes 1 (otherwise nobody is ever admitted).
    /// - `promote_interval` is raised to [`Self::MIN_PROMOTE_INTERVAL`].
    /// - A zero `idle_timeout` is treated as disabled.
    pub fn validated(mut self) -> Self {
        if self.capacity == 0 {
            tracing::warn!("capacity 0 would admit nobody, using 1");
            self.capacity = 1;
        }
        if self.promote_interval < Self::MIN_PROMOTE_INTERVAL {
            tracing::warn!(
                interval_ms = self.promote_interval.as_millis() as u64,
                min_ms = Self::MIN_PROMOTE_INTERVAL.as_millis() as u64,
                "promote_interval below minimum, clamping"
            );
            self.promote_interval = Self::MIN_PROMOTE_INTERVAL;
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            self.idle_timeout = None;
        }
        self
    }

    /// Advisory wait for a 1-based queue position.
    pub fn estimated_wait(&self, position: usize) -> Duration {
        self.average_service_time
            .saturating_mul(u32::try_from(position).unwrap_or(u32::MAX))
    }
}
