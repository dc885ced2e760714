//! Persistent, per-origin bearer tokens held as salted scrypt hashes.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use scrypt::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use scrypt::Scrypt;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use gd_domain::error::{DaemonError, Result};

/// One record per origin, persisted to `tokens.json`. The plaintext token
/// is never stored — only its scrypt hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub origin: String,
    #[serde(rename = "tokenHash")]
    pub token_hash: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TokenFile {
    pub entries: Vec<TokenRecord>,
}

/// Callback invoked after every mutation so the caller can persist to
/// disk; kept generic over a closure rather than hardcoding a path so
/// the store stays testable without touching the filesystem.
pub trait TokenPersist: Send + Sync {
    fn save(&self, file: &TokenFile) -> Result<()>;
}

pub struct TokenStore<P: TokenPersist> {
    records: RwLock<HashMap<String, TokenRecord>>,
    persist: P,
}

impl<P: TokenPersist> TokenStore<P> {
    pub fn new(initial: Vec<TokenRecord>, persist: P) -> Self {
        let records = initial
            .into_iter()
            .map(|r| (r.origin.clone(), r))
            .collect();
        Self {
            records: RwLock::new(records),
            persist,
        }
    }

    fn prune_expired_locked(records: &mut HashMap<String, TokenRecord>) {
        let now = Utc::now();
        records.retain(|_, r| r.expires_at > now);
    }

    fn persist_locked(&self, records: &HashMap<String, TokenRecord>) -> Result<()> {
        let file = TokenFile {
            entries: records.values().cloned().collect(),
        };
        self.persist.save(&file)
    }

    /// Generate a fresh token for `origin`, replacing any prior record.
    /// Returns the plaintext token (shown to the caller exactly once) and
    /// its expiry.
    pub fn issue_token(&self, origin: &str, ttl_days: u32) -> Result<(String, DateTime<Utc>)> {
        use base64::Engine as _;
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);

        let salt = SaltString::generate(&mut rand::rngs::OsRng);
        let hash = Scrypt
            .hash_password(token.as_bytes(), &salt)
            .map_err(|e| DaemonError::InternalError(format!("hashing token: {e}")))?
            .to_string();

        let now = Utc::now();
        let expires_at = now + Duration::days(ttl_days as i64);
        let record = TokenRecord {
            origin: origin.to_string(),
            token_hash: hash,
            created_at: now,
            expires_at,
        };

        let mut records = self.records.write();
        records.insert(origin.to_string(), record);
        self.persist_locked(&records)?;

        Ok((token, expires_at))
    }

    /// Verify `presented` against the live record for `origin`. Pruning
    /// happens first so an expired record never verifies. Any mismatch —
    /// wrong token, no record, expired record — returns `false`; callers
    /// must not distinguish these cases (spec §4.2).
    pub fn verify_token(&self, origin: &str, presented: &str) -> bool {
        let mut records = self.records.write();
        Self::prune_expired_locked(&mut records);
        let Some(record) = records.get(origin) else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(&record.token_hash) else {
            return false;
        };
        Scrypt
            .verify_password(presented.as_bytes(), &parsed)
            .is_ok()
    }

    /// True iff `origin` has a non-expired token record.
    pub fn has_active(&self, origin: &str) -> bool {
        let mut records = self.records.write();
        Self::prune_expired_locked(&mut records);
        records.contains_key(origin)
    }

    /// Live record count, after pruning — used by `diagnostics`.
    pub fn record_count(&self) -> usize {
        let mut records = self.records.write();
        Self::prune_expired_locked(&mut records);
        records.len()
    }

    pub fn revoke(&self, origin: &str) -> Result<()> {
        let mut records = self.records.write();
        records.remove(origin);
        self.persist_locked(&records)
    }
}

/// Constant-time comparison helper used where two hashes/digests of equal
/// expected length must be compared without leaking timing information.
/// Length mismatches are treated as unequal, never panicking.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
