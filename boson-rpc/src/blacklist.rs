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

/// Strikes at or above this count put a remote on the blacklist
///
pub const STRIKE_THRESHOLD: u32 = 3;

/// Each decay tick halves a remote's strike count; once it reaches zero the
/// entry is forgotten.
const DECAY_INTERVAL: Duration = Duration::from_secs(5 * 60);

struct Entry {
    strikes: u32,
    last_strike: Instant,
}

/// Time-decaying record of remotes producing malformed messages or
/// signature failures. Datagrams from a blacklisted remote are dropped
/// before parsing beyond the envelope.
#[derive(Default)]
pub struct Blacklist {
    entries: HashMap<IpAddr, Entry>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strike(&mut self, remote: IpAddr) {
        let now = Instant::now();
        let entry = self.entries.entry(remote).or_insert_with(|| Entry {
            strikes: 0,
            last_strike: now,
        });
        entry.strikes += 1;
        entry.last_strike = now;
    }

    pub fn is_blacklisted(&self, remote: &IpAddr) -> bool {
        self.entries
            .get(remote)
            .map(|entry| entry.strikes >= STRIKE_THRESHOLD)
            .unwrap_or(false)
    }

    /// Halves the strike count of every remote whose last strike is older
    /// than [`DECAY_INTERVAL`], dropping entries that reach zero. Driven by
    /// the node scheduler's blacklist-decay tick.
    pub fn decay(&mut self, now: Instant) {
        self.entries.retain(|_, entry| {
            if now.duration_since(entry.last_strike) >= DECAY_INTERVAL {
                entry.strikes /= 2;
                entry.last_strike = now;
            }
            entry.strikes > 0
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_is_blacklisted_after_enough_strikes() {
        let mut blacklist = Blacklist::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..STRIKE_THRESHOLD - 1 {
            blacklist.strike(ip);
            assert!(!blacklist.is_blacklisted(&ip));
        }
        blacklist.strike(ip);
        assert!(blacklist.is_blacklisted(&ip));
    }

    #[test]
    fn decay_eventually_forgets_a_remote() {
        let mut blacklist = Blacklist::new();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        blacklist.strike(ip);
        let far_future = Instant::now() + Duration::from_secs(5 * 60 * 10);
        blacklist.decay(far_future);
        assert!(!blacklist.entries.contains_key(&ip));
    }
}
