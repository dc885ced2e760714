//! Shared application state passed to all HTTP handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gd_domain::config::Config;
use parking_lot::RwLock;

use crate::auth::{PairingManager, TokenStore};
use crate::config_io::JsonTokenPersist;
use crate::jobs::JobManager;
use crate::rate_limit::RateLimiter;

/// Global admission rate limit: 300 requests / 5 minutes per peer (spec
/// §4.1).
pub const GLOBAL_RATE_LIMIT: usize = 300;
pub const GLOBAL_RATE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Pairing-route rate limit: 10 requests / 10 minutes per peer (spec
/// §4.1).
pub const PAIRING_RATE_LIMIT: usize = 10;
pub const PAIRING_RATE_WINDOW: Duration = Duration::from_secs(10 * 60);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub config_path: PathBuf,
    pub tokens: Arc<TokenStore<JsonTokenPersist>>,
    pub pairing: Arc<PairingManager>,
    pub jobs: JobManager,
    pub global_limiter: Arc<RateLimiter>,
    pub pairing_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, config_path: PathBuf, tokens: Vec<crate::auth::TokenRecord>) -> Self {
        let jobs = JobManager::new(config.jobs.max_concurrent, config.jobs.timeout_seconds);
        let tokens_path = crate::config_io::tokens_path();
        Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
            tokens: Arc::new(TokenStore::new(tokens, JsonTokenPersist { path: tokens_path })),
            pairing: Arc::new(PairingManager::new()),
            jobs,
            global_limiter: Arc::new(RateLimiter::new(GLOBAL_RATE_LIMIT, GLOBAL_RATE_WINDOW)),
            pairing_limiter: Arc::new(RateLimiter::new(PAIRING_RATE_LIMIT, PAIRING_RATE_WINDOW)),
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
