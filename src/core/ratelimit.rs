use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::core::config::RateLimitConfig;

/// Entries are pruned lazily once the map grows past this size.
const PRUNE_THRESHOLD: usize = 4096;

struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client address.
///
/// Windows reset in place when a request arrives after the window has
/// elapsed; there is no background sweeper.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request from `addr`. Returns false once the address has
    /// exhausted its allowance for the current window.
    pub async fn check(&self, addr: IpAddr) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started_at) <= window);
        }

        let entry = windows.entry(addr).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) > self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests,
            window_secs,
        })
    }

    #[tokio::test]
    async fn test_allows_up_to_limit_then_denies() {
        let limiter = limiter(3, 60);
        let addr = IpAddr::V4(Ipv4Addr::LOCALHOST);

        assert!(limiter.check(addr).await);
        assert!(limiter.check(addr).await);
        assert!(limiter.check(addr).await);
        assert!(!limiter.check(addr).await);
        assert!(!limiter.check(addr).await);
    }

    #[tokio::test]
    async fn test_addresses_are_independent() {
        let limiter = limiter(1, 60);
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check(a).await);
        assert!(!limiter.check(a).await);
        assert!(limiter.check(b).await);
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = limiter(1, 0);
        let addr = IpAddr::V4(Ipv4Addr::LOCALHOST);

        assert!(limiter.check(addr).await);
        // window_secs = 0: the window has always elapsed by the next call
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(limiter.check(addr).await);
    }
}
