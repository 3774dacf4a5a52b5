// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use std::{
    collections::HashMap,
    net::IpAddr,
    time::{Duration, Instant},
};

/// Token bucket fill rate for outbound sends to a single remote
///
pub const SEND_FILL_RATE_BYTES_PER_SEC: f64 = 128.0;
const BUCKET_CAPACITY_BYTES: f64 = SEND_FILL_RATE_BYTES_PER_SEC * 4.0;

/// Per-remote outbound token bucket. `try_consume` rejects a send rather
/// than queuing past capacity.
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(now: Instant) -> Self {
        Self {
            tokens: BUCKET_CAPACITY_BYTES,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * SEND_FILL_RATE_BYTES_PER_SEC).min(BUCKET_CAPACITY_BYTES);
        self.last_refill = now;
    }

    fn try_consume(&mut self, bytes: usize, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= bytes as f64 {
            self.tokens -= bytes as f64;
            true
        } else {
            false
        }
    }
}

#[derive(Default)]
pub struct SendThrottle {
    buckets: HashMap<IpAddr, Bucket>,
}

impl SendThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_consume(&mut self, remote: IpAddr, bytes: usize) -> bool {
        let now = Instant::now();
        self.buckets
            .entry(remote)
            .or_insert_with(|| Bucket::new(now))
            .try_consume(bytes, now)
    }
}

/// Datagrams-per-second threshold above which a remote is considered spam
/// and silently dropped for a cooldown window.
pub const SPAM_RATE_THRESHOLD: f64 = 50.0;
const SPAM_EWMA_ALPHA: f64 = 0.3;
const SPAM_COOLDOWN: Duration = Duration::from_secs(30);

struct SpamTracker {
    rate_ewma: f64,
    last_datagram: Instant,
    cooldown_until: Option<Instant>,
}

impl SpamTracker {
    fn new(now: Instant) -> Self {
        Self {
            rate_ewma: 0.0,
            last_datagram: now,
            cooldown_until: None,
        }
    }
}

/// Tracks inbound datagram rate per remote address; `observe` returns
/// `false` while the remote is in its cooldown window.
#[derive(Default)]
pub struct SpamFilter {
    trackers: HashMap<IpAddr, SpamTracker>,
}

impl SpamFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, remote: IpAddr) -> bool {
        let now = Instant::now();
        let tracker = self.trackers.entry(remote).or_insert_with(|| SpamTracker::new(now));

        if let Some(until) = tracker.cooldown_until {
            if now < until {
                return false;
            }
            tracker.cooldown_until = None;
        }

        let interval = now.duration_since(tracker.last_datagram).as_secs_f64().max(1e-6);
        let instantaneous_rate = 1.0 / interval;
        tracker.rate_ewma = SPAM_EWMA_ALPHA * instantaneous_rate + (1.0 - SPAM_EWMA_ALPHA) * tracker.rate_ewma;
        tracker.last_datagram = now;

        if tracker.rate_ewma > SPAM_RATE_THRESHOLD {
            tracker.cooldown_until = Some(now + SPAM_COOLDOWN);
            false
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_throttle_rejects_once_capacity_exhausted() {
        let mut throttle = SendThrottle::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(throttle.try_consume(ip, BUCKET_CAPACITY_BYTES as usize));
        assert!(!throttle.try_consume(ip, 1));
    }

    #[test]
    fn spam_filter_allows_sparse_datagrams() {
        let mut filter = SpamFilter::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(filter.observe(ip));
    }

    #[test]
    fn spam_filter_cools_down_a_flooding_remote() {
        let mut filter = SpamFilter::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let mut allowed_eventually_false = false;
        for _ in 0..200 {
            if !filter.observe(ip) {
                allowed_eventually_false = true;
                break;
            }
        }
        assert!(allowed_eventually_false);
    }
}
