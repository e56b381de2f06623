//! Expiring key-value store and OTP challenge types.
//!
//! Pending OTP challenges live only here, never in the database. The store
//! is a thin typed wrapper over `moka` with per-entry TTL; expiry is passive
//! (checked on read), no sweeper thread.

use std::hash::Hash;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::{Expiry, future::Cache};

use sugarloaf_core::{CustomerId, Email};

/// How long an issued OTP stays valid.
pub const OTP_TTL: Duration = Duration::from_secs(10 * 60);

/// How long a reset authorization stays valid after OTP verification.
pub const RESET_GRANT_TTL: Duration = Duration::from_secs(10 * 60);

/// A stored value with its own time-to-live.
#[derive(Debug, Clone)]
struct Timed<V> {
    value: V,
    ttl: Duration,
}

/// Expiry policy that reads the TTL off each entry.
struct PerEntryTtl;

impl<K, V> Expiry<K, Timed<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &K,
        value: &Timed<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// A TTL key-value store.
///
/// Contract: `put` replaces any existing value under the key and makes it
/// visible until the TTL elapses, after which `get` reports absent.
/// `forget` is unconditional and idempotent. Per-key operations are atomic;
/// there is no ordering guarantee across keys.
pub struct ExpiringStore<K, V> {
    cache: Cache<K, Timed<V>>,
}

impl<K, V> ExpiringStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any existing value
    /// (last write wins).
    pub async fn put(&self, key: K, value: V, ttl: Duration) {
        self.cache.insert(key, Timed { value, ttl }).await;
    }

    /// Get the live value under `key`, if any.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key).await.map(|timed| timed.value)
    }

    /// Remove the value under `key`. Absent keys are not an error.
    pub async fn forget(&self, key: &K) {
        self.cache.invalidate(key).await;
    }
}

impl<K, V> Default for ExpiringStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// What an OTP challenge proves.
///
/// The two purposes use disjoint keys, so a reset code can never satisfy a
/// signup verification or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpPurpose {
    Signup,
    PasswordReset,
}

/// Composite store key: one live challenge per (purpose, email).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OtpKey {
    pub purpose: OtpPurpose,
    pub email: Email,
}

/// A pending OTP challenge.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    /// Six decimal digits, kept as a string to preserve leading digits.
    pub code: String,
    /// Customer the challenge was issued for. Checked on verification so a
    /// stale challenge can't survive an account deletion/recreation.
    pub customer_id: CustomerId,
    /// When the challenge was issued.
    pub issued_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// True if `code` and `customer_id` both match this challenge.
    #[must_use]
    pub fn matches(&self, code: &str, customer_id: CustomerId) -> bool {
        self.code == code && self.customer_id == customer_id
    }

    /// True if the challenge is older than the OTP TTL at `now`.
    ///
    /// The store already expires entries; this is the defense-in-depth
    /// recheck against clock skew between issue and check.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(OTP_TTL) else {
            return true;
        };
        now - self.issued_at > ttl
    }
}

/// A single-use authorization to reset a password, minted by reset-OTP
/// verification and consumed by the reset itself.
#[derive(Debug, Clone)]
pub struct ResetGrant {
    pub customer_id: CustomerId,
    pub granted_at: DateTime<Utc>,
}

/// Store for pending OTP challenges.
pub type OtpStore = ExpiringStore<OtpKey, OtpChallenge>;

/// Store for pending reset authorizations, keyed by email.
pub type ResetGrantStore = ExpiringStore<Email, ResetGrant>;

/// Generate a six-digit OTP code, uniform over `100000..=999999`.
#[must_use]
pub fn generate_otp_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn challenge(code: &str, customer: i32) -> OtpChallenge {
        OtpChallenge {
            code: code.to_owned(),
            customer_id: CustomerId::new(customer),
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_otp_code_format() {
        for _ in 0..100 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn test_challenge_matches() {
        let c = challenge("482913", 7);
        assert!(c.matches("482913", CustomerId::new(7)));
        assert!(!c.matches("482914", CustomerId::new(7)));
        assert!(!c.matches("482913", CustomerId::new(8)));
    }

    #[test]
    fn test_challenge_staleness() {
        let mut c = challenge("123456", 1);
        assert!(!c.is_stale(Utc::now()));

        c.issued_at = Utc::now() - chrono::Duration::minutes(11);
        assert!(c.is_stale(Utc::now()));
    }

    #[tokio::test]
    async fn test_put_get_forget() {
        let store: OtpStore = ExpiringStore::new();
        let key = OtpKey {
            purpose: OtpPurpose::Signup,
            email: email("a@x.com"),
        };

        assert!(store.get(&key).await.is_none());

        store.put(key.clone(), challenge("111111", 1), OTP_TTL).await;
        assert_eq!(store.get(&key).await.unwrap().code, "111111");

        store.forget(&key).await;
        assert!(store.get(&key).await.is_none());

        // Forgetting an absent key is not an error
        store.forget(&key).await;
    }

    #[tokio::test]
    async fn test_put_supersedes_prior_value() {
        let store: OtpStore = ExpiringStore::new();
        let key = OtpKey {
            purpose: OtpPurpose::Signup,
            email: email("a@x.com"),
        };

        store.put(key.clone(), challenge("111111", 1), OTP_TTL).await;
        store.put(key.clone(), challenge("222222", 1), OTP_TTL).await;

        assert_eq!(store.get(&key).await.unwrap().code, "222222");
    }

    #[tokio::test]
    async fn test_purposes_use_disjoint_keys() {
        let store: OtpStore = ExpiringStore::new();
        let signup = OtpKey {
            purpose: OtpPurpose::Signup,
            email: email("a@x.com"),
        };
        let reset = OtpKey {
            purpose: OtpPurpose::PasswordReset,
            email: email("a@x.com"),
        };

        store
            .put(signup.clone(), challenge("111111", 1), OTP_TTL)
            .await;
        store
            .put(reset.clone(), challenge("222222", 1), OTP_TTL)
            .await;

        assert_eq!(store.get(&signup).await.unwrap().code, "111111");
        assert_eq!(store.get(&reset).await.unwrap().code, "222222");
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store: OtpStore = ExpiringStore::new();
        let key = OtpKey {
            purpose: OtpPurpose::Signup,
            email: email("a@x.com"),
        };

        store
            .put(
                key.clone(),
                challenge("111111", 1),
                Duration::from_millis(50),
            )
            .await;
        assert!(store.get(&key).await.is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.get(&key).await.is_none());
    }
}
