//! Per-peer sliding-window rate limiting (spec §4.1: global 300 req / 5
//! min, pairing 10 req / 10 min). Hand-rolled rather than layered through
//! `tower_governor`: governor's token-bucket model expresses one fixed
//! rate per layer and returns its own rejection response, but the
//! admission pipeline needs two independently-windowed counters feeding
//! a single `rate_limited` error body — easier to keep as one
//! unbounded-channel-free, lock-protected ring per key.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a hit for `peer` and report whether it is still within the
    /// allowed rate. Entries older than the window are pruned first, so
    /// long-lived processes don't leak memory per distinct peer.
    pub fn check(&self, peer: IpAddr) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock();
        let entry = hits.entry(peer).or_default();
        while let Some(oldest) = entry.front() {
            if now.duration_since(*oldest) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() >= self.max_requests {
            return false;
        }
        entry.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> IpAddr {
        IpAddr::from([127, 0, 0, 1])
    }

    #[test]
    fn allows_up_to_the_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check(peer()));
        assert!(limiter.check(peer()));
        assert!(limiter.check(peer()));
        assert!(!limiter.check(peer()));
    }

    #[test]
    fn tracks_peers_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(IpAddr::from([127, 0, 0, 1])));
        assert!(limiter.check(IpAddr::from([127, 0, 0, 2])));
        assert!(!limiter.check(IpAddr::from([127, 0, 0, 1])));
    }

    #[test]
    fn old_hits_expire_out_of_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check(peer()));
        assert!(!limiter.check(peer()));
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(peer()));
    }
}
