//! Session token generation.
//!
//! A token is the only credential a client needs to resume its session,
//! so guessing one must be infeasible. [`RandomTokenIssuer`] draws 128 bits
//! from the thread-local CSPRNG and appends a nanosecond timestamp, so two
//! tokens collide only if both the random part and the clock agree.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Mints opaque bearer tokens.
///
/// A trait so tests (and deployments with their own token service) can
/// swap the generator without touching the registry.
pub trait TokenIssuer: Send + Sync + 'static {
    /// Produces a new token for `account`. Never fails.
    fn issue(&self, account: &str) -> String;
}

/// The default issuer: `{account}_{32 hex chars}_{unix nanos}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenIssuer;

impl TokenIssuer for RandomTokenIssuer {
    fn issue(&self, account: &str) -> String {
        let bytes: [u8; 16] = rand::rng().random();
        let nonce: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        // A clock before 1970 only weakens the timestamp part; the random
        // part still carries the uniqueness.
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        format!("{account}_{nonce}_{nanos}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// Extracts the random segment of a token minted for `account`.
    fn nonce_of<'a>(token: &'a str, account: &str) -> &'a str {
        let rest = token
            .strip_prefix(account)
            .and_then(|r| r.strip_prefix('_'))
            .expect("token starts with account");
        rest.split('_').next().expect("nonce segment")
    }

    #[test]
    fn test_issue_has_account_nonce_and_timestamp() {
        let token = RandomTokenIssuer.issue("alice");

        let parts: Vec<&str> = token.split('_').collect();
        assert_eq!(parts.len(), 3, "token was {token}");
        assert_eq!(parts[0], "alice");
        assert_eq!(parts[1].len(), 32);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[2].parse::<u128>().is_ok());
    }

    #[test]
    fn test_issue_large_sample_has_no_duplicates() {
        let issuer = RandomTokenIssuer;
        let mut seen = HashSet::new();

        for _ in 0..20_000 {
            assert!(seen.insert(issuer.issue("same-account")));
        }
    }

    #[test]
    fn test_issue_nonces_are_not_sequential() {
        // Consecutive tokens for one account must not be derivable from
        // each other: the random parts differ in most positions.
        let issuer = RandomTokenIssuer;
        let a = issuer.issue("acct");
        let b = issuer.issue("acct");

        let differing = nonce_of(&a, "acct")
            .chars()
            .zip(nonce_of(&b, "acct").chars())
            .filter(|(x, y)| x != y)
            .count();
        // Expected ~30 of 32; 16 leaves a wide margin.
        assert!(differing >= 16, "only {differing} hex digits differ");
    }

    #[test]
    fn test_issue_nonce_digits_cover_hex_alphabet() {
        // Every position should see most of the 16 hex digits across a
        // modest sample; a weak or constant source fails this quickly.
        let issuer = RandomTokenIssuer;
        let nonces: Vec<String> = (0..2_000)
            .map(|_| nonce_of(&issuer.issue("x"), "x").to_string())
            .collect();

        for pos in 0..32 {
            let distinct: HashSet<u8> =
                nonces.iter().map(|n| n.as_bytes()[pos]).collect();
            assert!(distinct.len() >= 14, "position {pos}: {}", distinct.len());
        }
    }
}
