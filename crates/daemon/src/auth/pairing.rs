//! Pairing manager — ephemeral in-memory origin → code map with a short
//! TTL. Does not require bearer auth; separately rate-limited upstream.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;

use gd_domain::error::{DaemonError, Result};

use super::token_store::{TokenPersist, TokenStore};

struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
}

pub struct PairingManager {
    pending: Mutex<HashMap<String, PendingCode>>,
}

pub struct StartResult {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub instructions: &'static str,
}

pub struct ConfirmResult {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

impl Default for PairingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PairingManager {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Count of pending pairing codes — used by `diagnostics`. Does not
    /// prune expired entries; those are only ever cleared on `confirm`.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn start(&self, origin: &str) -> StartResult {
        let code = random_hex_code(8);
        let expires_at = Utc::now() + Duration::minutes(10);
        self.pending.lock().insert(
            origin.to_string(),
            PendingCode {
                code: code.clone(),
                expires_at,
            },
        );
        StartResult {
            code,
            expires_at,
            instructions: "Enter this code in the browser extension within 10 minutes.",
        }
    }

    /// Consume a pending code and mint a token via the token store. The
    /// code is single-use: it is removed only once it is found to match
    /// and be unexpired, so a mistyped or stale attempt leaves a still-live
    /// pending code in place for a later correct `confirm`, while a replay
    /// of an already-consumed code always fails.
    pub fn confirm<P: TokenPersist>(
        &self,
        origin: &str,
        code: &str,
        tokens: &TokenStore<P>,
        ttl_days: u32,
    ) -> Result<ConfirmResult> {
        {
            let mut map = self.pending.lock();
            let matches = match map.get(origin) {
                Some(pending) => pending.expires_at >= Utc::now() && pending.code == code,
                None => false,
            };

            if !matches {
                return Err(DaemonError::Validation("pairing code expired or mismatched".into()));
            }

            // Only a matching, unexpired code is single-use; a mistyped
            // attempt must not destroy a still-live pending code.
            map.remove(origin);
        }

        let (access_token, expires_at) = tokens.issue_token(origin, ttl_days)?;
        Ok(ConfirmResult {
            access_token,
            token_type: "Bearer",
            expires_at,
        })
    }
}

fn random_hex_code(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}
