//! In-memory [`AccountStore`] with bcrypt password hashing.
//!
//! Suitable for development and tests. Accounts live only as long as the
//! process. bcrypt is CPU-bound, so hashing and verification run on the
//! blocking pool instead of a runtime worker.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tokio::sync::RwLock;
use turnstile_protocol::{PlayerId, PlayerProfile, RegisterRequest};
use turnstile_session::{AccountError, AccountStore};

pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Items every new player starts with.
const STARTER_ITEMS: [u32; 2] = [1001, 1002];

struct StoredAccount {
    password_hash: String,
    nickname: String,
}

/// Account store backed by a `HashMap`.
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, StoredAccount>>,
    cost: u32,
    /// Verified against when the account doesn't exist, so unknown
    /// accounts cost the same as wrong passwords.
    dummy_hash: String,
}

impl MemoryAccountStore {
    /// Creates an empty store hashing at the given bcrypt cost.
    ///
    /// # Errors
    /// [`AccountError::Internal`] if `cost` is outside
    /// `MIN_BCRYPT_COST..=MAX_BCRYPT_COST`.
    pub fn new(cost: u32) -> Result<Self, AccountError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(AccountError::Internal(format!(
                "invalid bcrypt cost {cost} (must be {MIN_BCRYPT_COST}-{MAX_BCRYPT_COST})"
            )));
        }
        let dummy_hash = bcrypt::hash("turnstile-absent-account", cost)
            .map_err(|e| AccountError::Internal(format!("password hashing failed: {e}")))?;
        Ok(Self {
            accounts: RwLock::new(HashMap::new()),
            cost,
            dummy_hash,
        })
    }

    /// Number of registered accounts.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

fn profile_for(account: &str, nickname: &str) -> PlayerProfile {
    PlayerProfile {
        id: PlayerId::for_account(account),
        nickname: nickname.to_string(),
        level: 1,
        exp: 0,
        vip_level: 0,
        items: STARTER_ITEMS.to_vec(),
    }
}

impl AccountStore for MemoryAccountStore {
    async fn verify(&self, account: &str, password: &str) -> Result<PlayerProfile, AccountError> {
        let (hash, nickname) = {
            let accounts = self.accounts.read().await;
            match accounts.get(account) {
                Some(stored) => (stored.password_hash.clone(), Some(stored.nickname.clone())),
                None => (self.dummy_hash.clone(), None),
            }
        };

        let password = password.to_string();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AccountError::Internal(format!("verify task failed: {e}")))?
            .map_err(|e| AccountError::Internal(format!("password verification failed: {e}")))?;

        match nickname {
            Some(nickname) if valid => Ok(profile_for(account, &nickname)),
            _ => Err(AccountError::InvalidCredentials),
        }
    }

    async fn register(&self, req: &RegisterRequest) -> Result<(), AccountError> {
        if self.accounts.read().await.contains_key(&req.account) {
            return Err(AccountError::AccountExists(req.account.clone()));
        }

        let password = req.password.clone();
        let cost = self.cost;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AccountError::Internal(format!("hash task failed: {e}")))?
            .map_err(|e| AccountError::Internal(format!("password hashing failed: {e}")))?;

        let nickname = if req.nickname.is_empty() {
            format!("Player_{}", req.account)
        } else {
            req.nickname.clone()
        };

        // Re-checked under the write lock: another registration for the
        // same name may have finished while we were hashing.
        match self.accounts.write().await.entry(req.account.clone()) {
            Entry::Occupied(_) => Err(AccountError::AccountExists(req.account.clone())),
            Entry::Vacant(slot) => {
                slot.insert(StoredAccount {
                    password_hash,
                    nickname,
                });
                tracing::info!(
                    account = %req.account,
                    client_ip = %req.client_ip,
                    "account registered"
                );
                Ok(())
            }
        }
    }
}
