//! Two-tier fixed-window rate limiter: a stricter write tier for attestation
//! submission and sync triggers, a looser default tier for reads.
//!
//! Uses a `DashMap` keyed by client IP, each entry guarding its own small
//! piece of mutable state, avoiding a single global lock across unrelated
//! keys.

use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Window {
    started_at: Instant,
    count: u32,
}

struct Tier {
    window: Duration,
    max_requests: u32,
    buckets: DashMap<IpAddr, Mutex<Window>>,
}

impl Tier {
    fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: DashMap::new(),
        }
    }

    fn check(&self, client: IpAddr) -> bool {
        let entry = self
            .buckets
            .entry(client)
            .or_insert_with(|| {
                Mutex::new(Window {
                    started_at: Instant::now(),
                    count: 0,
                })
            });
        let mut window = entry.lock().expect("rate limit bucket poisoned");
        if window.started_at.elapsed() >= self.window {
            window.started_at = Instant::now();
            window.count = 0;
        }
        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

pub enum RateLimitTier {
    Default,
    Write,
}

pub struct RateLimiter {
    default_tier: Tier,
    write_tier: Tier,
}

impl RateLimiter {
    pub fn new(window_ms: u64, default_max: u32) -> Self {
        let window = Duration::from_millis(window_ms);
        // Write tier is fixed at 10/min; the default tier is fully
        // configurable since reads dominate normal traffic.
        let write_window = Duration::from_secs(60);
        Self {
            default_tier: Tier::new(window, default_max),
            write_tier: Tier::new(write_window, 10),
        }
    }

    /// Returns `true` if the request is allowed under `tier`.
    pub fn check(&self, tier: RateLimitTier, client: IpAddr) -> bool {
        match tier {
            RateLimitTier::Default => self.default_tier.check(client),
            RateLimitTier::Write => self.write_tier.check(client),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(n: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, n])
    }

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let tier = Tier::new(Duration::from_secs(60), 3);
        let client = ip(1);
        assert!(tier.check(client));
        assert!(tier.check(client));
        assert!(tier.check(client));
        assert!(!tier.check(client));
    }

    #[test]
    fn tracks_each_client_independently() {
        let tier = Tier::new(Duration::from_secs(60), 1);
        assert!(tier.check(ip(1)));
        assert!(!tier.check(ip(1)));
        assert!(tier.check(ip(2)));
    }

    #[test]
    fn write_tier_is_stricter_than_default() {
        let limiter = RateLimiter::new(60_000, 100);
        let client = ip(3);
        for _ in 0..10 {
            assert!(limiter.check(RateLimitTier::Write, client));
        }
        assert!(!limiter.check(RateLimitTier::Write, client));
        assert!(limiter.check(RateLimitTier::Default, client));
    }
}
