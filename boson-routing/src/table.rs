// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::bucket::{Disposition, KBucket};
use boson_core::{sort_by_distance, Id, NodeContact};
use std::time::SystemTime;
use tracing::debug;

/// A contact is evicted once it has failed this many consecutive requests
///
pub const MAX_TIMEOUTS: u32 = 5;

/// Interval between refresh passes over buckets not recently touched
///
pub const REFRESH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(15 * 60);

/// Ordered, disjoint cover of the 256-bit id space by [`KBucket`]s.
/// Starts as a single bucket and refines by
/// splitting the bucket that owns the local id's prefix.
pub struct RoutingTable {
    local_id: Id,
    buckets: Vec<KBucket>,
    last_refreshed: Vec<SystemTime>,
}

impl RoutingTable {
    pub fn new(local_id: Id) -> Self {
        Self {
            local_id,
            buckets: vec![KBucket::covering_whole_space()],
            last_refreshed: vec![SystemTime::now()],
        }
    }

    pub fn local_id(&self) -> Id {
        self.local_id
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_index_for(&self, id: &Id) -> usize {
        self.buckets
            .iter()
            .position(|b| b.covers(&self.local_id, id))
            .expect("routing table buckets form a disjoint cover of the id space")
    }

    /// Places `contact` in the bucket covering its id, splitting and
    /// retrying if that bucket is full and splittable.
    pub fn insert(&mut self, contact: NodeContact) -> Disposition {
        if contact.id == self.local_id {
            return Disposition::Rejected;
        }
        let idx = self.bucket_index_for(&contact.id);
        if self.buckets[idx].is_full()
            && self.buckets[idx].find(&contact.id).is_none()
            && self.buckets[idx].contains_own_prefix()
            && self.buckets[idx].high_bits - self.buckets[idx].low_bits > 1
        {
            self.split_bucket(idx);
            return self.insert(contact);
        }
        let disposition = self.buckets[idx].insert(contact);
        if matches!(disposition, Disposition::Inserted | Disposition::Updated) {
            self.last_refreshed[idx] = SystemTime::now();
        }
        disposition
    }

    fn split_bucket(&mut self, idx: usize) {
        let bucket = self.buckets.remove(idx);
        self.last_refreshed.remove(idx);
        let (lower, upper) = bucket.split(&self.local_id);
        debug!(low = lower.low_bits, high = upper.high_bits, "split routing table bucket");
        let now = SystemTime::now();
        self.buckets.insert(idx, upper);
        self.last_refreshed.insert(idx, now);
        self.buckets.insert(idx, lower);
        self.last_refreshed.insert(idx, now);
    }

    pub fn remove(&mut self, id: &Id) -> bool {
        let idx = self.bucket_index_for(id);
        self.buckets[idx].remove(id, SystemTime::now())
    }

    pub fn mark_responded(&mut self, id: &Id) -> bool {
        let idx = self.bucket_index_for(id);
        self.buckets[idx].mark_responded(id, SystemTime::now())
    }

    pub fn mark_failed(&mut self, id: &Id) -> bool {
        let idx = self.bucket_index_for(id);
        self.buckets[idx].mark_failed(id, MAX_TIMEOUTS, SystemTime::now())
    }

    /// Up to `k` contacts closest to `target`, starting at target's own
    /// bucket and expanding to adjacent buckets until enough are gathered
    ///
    pub fn closest(&self, target: &Id, k: usize) -> Vec<NodeContact> {
        let start = self.bucket_index_for(target);
        let mut gathered: Vec<NodeContact> = Vec::with_capacity(k * 2);
        let mut lo = start as isize;
        let mut hi = start as isize;
        let mut visited_lo = false;
        let mut visited_hi = false;
        loop {
            if !visited_lo && lo >= 0 {
                gathered.extend(self.buckets[lo as usize].contacts().iter().cloned());
                visited_lo = true;
            }
            if lo != hi && !visited_hi && (hi as usize) < self.buckets.len() {
                gathered.extend(self.buckets[hi as usize].contacts().iter().cloned());
            }
            if gathered.len() >= k {
                break;
            }
            let mut advanced = false;
            if lo > 0 {
                lo -= 1;
                visited_lo = false;
                advanced = true;
            }
            if (hi as usize) + 1 < self.buckets.len() {
                hi += 1;
                visited_hi = false;
                advanced = true;
            } else {
                visited_hi = true;
            }
            if !advanced {
                break;
            }
        }
        sort_by_distance(target, &mut gathered, |c| c.id);
        gathered.truncate(k);
        gathered
    }

    /// Marks failed the contact currently bound to `addr`, if any.
    /// The RPC layer only
    /// knows the address a request timed out against; bucket lookup is
    /// keyed by id, so this resolves address to id first.
    pub fn mark_failed_by_addr(&mut self, addr: &std::net::SocketAddr) -> bool {
        let Some(id) = self.all_contacts().into_iter().find(|c| &c.address == addr).map(|c| c.id) else {
            return false;
        };
        self.mark_failed(&id)
    }

    /// Every contact currently held across all buckets, in no particular
    /// order. Used by liveness-refresh scheduling, which filters by
    /// reachability itself rather than asking the table to do so.
    pub fn all_contacts(&self) -> Vec<NodeContact> {
        self.buckets.iter().flat_map(|b| b.contacts().iter().cloned()).collect()
    }

    /// Buckets that haven't been touched (inserted/updated into) within
    /// [`REFRESH_INTERVAL`], paired with a random id inside their range —
    /// the scheduler issues a find-node for each.
    pub fn buckets_needing_refresh(&self, now: SystemTime) -> Vec<Id> {
        self.buckets
            .iter()
            .zip(self.last_refreshed.iter())
            .filter(|(_, last)| now.duration_since(**last).map(|age| age >= REFRESH_INTERVAL).unwrap_or(true))
            .map(|(bucket, _)| random_id_in_range(&self.local_id, bucket.low_bits, bucket.high_bits))
            .collect()
    }
}

/// Builds an id sharing exactly `low_bits` leading bits with `owner`: copy
/// `owner`'s bits up to `low_bits`, flip the next bit so the ids diverge
/// there, and randomize the rest. That makes `shared_prefix_bits(owner,
/// result) == low_bits`, always inside `[low_bits, high_bits)`.
fn random_id_in_range(owner: &Id, low_bits: u16, high_bits: u16) -> Id {
    debug_assert!(low_bits < high_bits);
    let mut bytes = *Id::random().as_bytes();
    let owner_bytes = owner.as_bytes();
    let full_bytes = (low_bits / 8) as usize;
    bytes[..full_bytes].copy_from_slice(&owner_bytes[..full_bytes]);
    let bit_in_byte = (low_bits % 8) as u8;
    let byte_idx = full_bytes;
    if byte_idx < 32 {
        let mask_shared = 0xFFu8.checked_shl(8 - bit_in_byte as u32).unwrap_or(0);
        let flip_mask = 0x80u8 >> bit_in_byte;
        let shared_part = owner_bytes[byte_idx] & mask_shared;
        let flipped_bit = (owner_bytes[byte_idx] ^ 0xFF) & flip_mask;
        let random_tail = bytes[byte_idx] & !(mask_shared | flip_mask);
        bytes[byte_idx] = shared_part | flipped_bit | random_tail;
    }
    Id::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn addr() -> SocketAddr {
        "127.0.0.1:9090".parse().unwrap()
    }

    #[test]
    fn every_id_is_claimed_by_exactly_one_bucket() {
        let local = Id::random();
        let table = RoutingTable::new(local);
        for _ in 0..64 {
            let id = Id::random();
            let matches: Vec<_> = table
                .buckets
                .iter()
                .filter(|b| b.covers(&local, &id))
                .collect();
            assert_eq!(matches.len(), 1);
        }
    }

    #[test]
    fn insert_and_closest_round_trip() {
        let local = Id::random();
        let mut table = RoutingTable::new(local);
        let mut ids = Vec::new();
        for _ in 0..20 {
            let id = Id::random();
            ids.push(id);
            table.insert(NodeContact::new(id, addr()));
        }
        let target = Id::random();
        let closest = table.closest(&target, 8);
        assert!(closest.len() <= 8);
        // ascending distance
        for pair in closest.windows(2) {
            let d0 = target.distance(&pair[0].id);
            let d1 = target.distance(&pair[1].id);
            assert!(d0 <= d1);
        }
    }

    #[test]
    fn mark_failed_past_threshold_evicts_contact() {
        let local = Id::random();
        let mut table = RoutingTable::new(local);
        let id = Id::random();
        table.insert(NodeContact::new(id, addr()));
        for _ in 0..MAX_TIMEOUTS {
            table.mark_failed(&id);
        }
        let idx = table.bucket_index_for(&id);
        assert!(table.buckets[idx].find(&id).is_none());
    }

    #[test]
    fn own_prefix_bucket_splits_when_full() {
        let local = Id::from_bytes([0u8; 32]);
        let mut table = RoutingTable::new(local);
        // All ids close to `local` share many prefix bits and land in the
        // bucket covering local's own prefix, forcing a split once full.
        for i in 0..(crate::bucket::K + 4) {
            let mut bytes = [0u8; 32];
            bytes[31] = i as u8 + 1;
            table.insert(NodeContact::new(Id::from_bytes(bytes), addr()));
        }
        assert!(table.bucket_count() > 1);
    }
}
