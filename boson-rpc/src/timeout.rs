// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use std::{collections::HashMap, net::IpAddr, time::Duration};

/// Floor on the adaptive per-remote timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(2);
/// Ceiling on the adaptive per-remote timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30);
const RTT_EWMA_ALPHA: f64 = 0.2;

/// Per-remote round-trip-time tracker. The RPC base timeout is adaptive:
/// `min(maxTimeout, max(minTimeout, 2*EWMA(rtt)))`
#[derive(Default)]
pub struct AdaptiveTimeouts {
    rtt_ewma: HashMap<IpAddr, f64>,
}

impl AdaptiveTimeouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rtt(&mut self, remote: IpAddr, rtt: Duration) {
        let sample = rtt.as_secs_f64();
        self.rtt_ewma
            .entry(remote)
            .and_modify(|ewma| *ewma = RTT_EWMA_ALPHA * sample + (1.0 - RTT_EWMA_ALPHA) * *ewma)
            .or_insert(sample);
    }

    pub fn timeout_for(&self, remote: &IpAddr) -> Duration {
        let Some(&ewma) = self.rtt_ewma.get(remote) else {
            return super::txn::BASE_TIMEOUT;
        };
        let candidate = Duration::from_secs_f64(2.0 * ewma);
        candidate.clamp(MIN_TIMEOUT, MAX_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_remote_uses_base_timeout() {
        let timeouts = AdaptiveTimeouts::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(timeouts.timeout_for(&ip), super::super::txn::BASE_TIMEOUT);
    }

    #[test]
    fn fast_remote_gets_a_short_timeout_bounded_below() {
        let mut timeouts = AdaptiveTimeouts::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..10 {
            timeouts.record_rtt(ip, Duration::from_millis(10));
        }
        assert_eq!(timeouts.timeout_for(&ip), MIN_TIMEOUT);
    }

    #[test]
    fn slow_remote_gets_a_timeout_bounded_above() {
        let mut timeouts = AdaptiveTimeouts::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        timeouts.record_rtt(ip, Duration::from_secs(120));
        assert_eq!(timeouts.timeout_for(&ip), MAX_TIMEOUT);
    }
}
