// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use boson_core::{Id, NodeContact, Reachability};
use std::{collections::VecDeque, time::SystemTime};

/// Bucket capacity.
pub const K: usize = 8;

/// A contact is still "verified alive" if it replied within this long
///
pub const FRESHNESS_WINDOW: std::time::Duration = std::time::Duration::from_secs(15 * 60);

/// A bucket covers all ids sharing `[low_bits, high_bits)` prefix bits with
/// the owning table's local id. `high_bits == 256` marks the bucket that
/// contains the local id itself — the only one allowed to split
///
#[derive(Debug, Clone)]
pub struct KBucket {
    pub low_bits: u16,
    pub high_bits: u16,
    contacts: Vec<NodeContact>,
    replacements: VecDeque<NodeContact>,
}

/// Outcome of a routing-table `insert`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Added as a new entry in the bucket's main list.
    Inserted,
    /// An existing entry with the same id had its address/timestamps merged.
    Updated,
    /// The bucket was full and not splittable; placed in the replacement cache.
    CachedAsReplacement,
    /// The bucket and its replacement cache were both full; dropped.
    Rejected,
}

impl KBucket {
    pub fn covering_whole_space() -> Self {
        Self {
            low_bits: 0,
            high_bits: 256,
            contacts: Vec::with_capacity(K),
            replacements: VecDeque::with_capacity(K),
        }
    }

    fn new(low_bits: u16, high_bits: u16) -> Self {
        Self {
            low_bits,
            high_bits,
            contacts: Vec::with_capacity(K),
            replacements: VecDeque::with_capacity(K),
        }
    }

    pub fn covers(&self, owner: &Id, id: &Id) -> bool {
        id.in_prefix_range(owner, self.low_bits, self.high_bits)
    }

    pub fn contains_own_prefix(&self) -> bool {
        self.high_bits == 256
    }

    pub fn is_full(&self) -> bool {
        self.contacts.len() >= K
    }

    pub fn contacts(&self) -> &[NodeContact] {
        &self.contacts
    }

    pub fn find(&self, id: &Id) -> Option<&NodeContact> {
        self.contacts.iter().find(|c| &c.id == id)
    }

    pub fn find_mut(&mut self, id: &Id) -> Option<&mut NodeContact> {
        self.contacts.iter_mut().find(|c| &c.id == id)
    }

    /// Attempts to place `contact`. Does not split — splitting is the
    /// routing table's job since it may require relocating this bucket's
    /// contents into two new buckets.
    pub fn insert(&mut self, contact: NodeContact) -> Disposition {
        if let Some(existing) = self.find_mut(&contact.id) {
            existing.address = contact.address;
            existing.last_seen = contact.last_seen.or(existing.last_seen);
            if contact.version.is_some() {
                existing.version = contact.version;
            }
            return Disposition::Updated;
        }
        if !self.is_full() {
            self.contacts.push(contact);
            return Disposition::Inserted;
        }
        self.offer_replacement(contact)
    }

    fn offer_replacement(&mut self, contact: NodeContact) -> Disposition {
        if let Some(pos) = self.replacements.iter().position(|c| c.id == contact.id) {
            self.replacements.remove(pos);
        }
        if self.replacements.len() >= K {
            self.replacements.pop_front();
        }
        self.replacements.push_back(contact);
        Disposition::CachedAsReplacement
    }

    /// Removes `id` from the main list, promoting the most recently seen
    /// verified-alive replacement if one exists.
    pub fn remove(&mut self, id: &Id, now: SystemTime) -> bool {
        let Some(pos) = self.contacts.iter().position(|c| &c.id == id) else {
            return false;
        };
        self.contacts.remove(pos);
        if let Some(promote_pos) = self
            .replacements
            .iter()
            .rposition(|c| is_verified_alive(c, now))
        {
            if let Some(promoted) = self.replacements.remove(promote_pos) {
                self.contacts.push(promoted);
            }
        }
        true
    }

    pub fn mark_responded(&mut self, id: &Id, now: SystemTime) -> bool {
        if let Some(contact) = self.find_mut(id) {
            contact.mark_responded(now);
            true
        } else {
            false
        }
    }

    /// Marks `id` failed; evicts and promotes a replacement if the contact
    /// has now failed too many times.
    pub fn mark_failed(&mut self, id: &Id, max_timeouts: u32, now: SystemTime) -> bool {
        let Some(contact) = self.find_mut(id) else {
            return false;
        };
        contact.mark_failed();
        if contact.failed_request_count >= max_timeouts {
            self.remove(id, now);
        }
        true
    }

    /// Splits this bucket at the midpoint of its bit range, redistributing
    /// contacts (and replacements) into the two halves by `owner`'s
    /// shared-prefix-bit count.
    pub fn split(self, owner: &Id) -> (KBucket, KBucket) {
        debug_assert!(self.high_bits - self.low_bits > 1, "cannot split a single-bit bucket");
        let mid = self.low_bits + (self.high_bits - self.low_bits) / 2;
        let mut lower = KBucket::new(self.low_bits, mid);
        let mut upper = KBucket::new(mid, self.high_bits);
        for contact in self.contacts {
            if contact.id.in_prefix_range(owner, self.low_bits, mid) {
                lower.contacts.push(contact);
            } else {
                upper.contacts.push(contact);
            }
        }
        for contact in self.replacements {
            if contact.id.in_prefix_range(owner, self.low_bits, mid) {
                lower.offer_replacement(contact);
            } else {
                upper.offer_replacement(contact);
            }
        }
        (lower, upper)
    }
}

pub fn is_verified_alive(contact: &NodeContact, now: SystemTime) -> bool {
    matches!(contact.reachability, Reachability::Good)
        && contact
            .last_reply
            .and_then(|t| now.duration_since(t).ok())
            .map(|age| age <= FRESHNESS_WINDOW)
            .unwrap_or(false)
}
