//! Server configuration loaded from environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use turnstile_admission::{AdmissionConfig, ReloginPolicy};

use crate::accounts::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8090";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub admission: AdmissionConfig,
    /// bcrypt work factor for the in-memory account store.
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            admission: AdmissionConfig::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    ///
    /// Every variable is optional; unset ones keep their defaults.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = vars.get("TURNSTILE_BIND_ADDR") {
            config.bind_addr = addr.clone();
        }
        if let Some(capacity) = parse_var::<usize>(vars, "TURNSTILE_CAPACITY")? {
            config.admission.capacity = capacity;
        }
        if let Some(policy) = parse_var::<ReloginPolicy>(vars, "TURNSTILE_RELOGIN_POLICY")? {
            config.admission.relogin = policy;
        }
        if let Some(ms) = parse_var::<u64>(vars, "TURNSTILE_PROMOTE_INTERVAL_MS")? {
            config.admission.promote_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(vars, "TURNSTILE_AVG_SERVICE_SECS")? {
            config.admission.average_service_time = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(vars, "TURNSTILE_IDLE_TIMEOUT_SECS")? {
            // 0 disables eviction
            config.admission.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(cost) = parse_var::<u32>(vars, "TURNSTILE_BCRYPT_COST")? {
            if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
                return Err(ConfigError::InvalidValue {
                    var: "TURNSTILE_BCRYPT_COST".to_string(),
                    value: cost.to_string(),
                    reason: format!("must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"),
                });
            }
            config.bcrypt_cost = cost;
        }

        Ok(config)
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(value) = vars.get(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.clone(),
            reason: e.to_string(),
        })
}
