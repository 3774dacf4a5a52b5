// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use boson_core::{sort_by_distance, Id, NodeContact};

/// Lifecycle of a candidate within one lookup's closest-set
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateStatus {
    Fresh,
    InFlight,
    Replied,
    Failed,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub contact: NodeContact,
    pub status: CandidateStatus,
}

/// The closest-set a single iterative lookup maintains: entries keyed by
/// id, sorted by XOR distance to `target`, bounded to `k * 3` entries
///
pub struct CandidateSet {
    target: Id,
    k: usize,
    entries: Vec<Candidate>,
}

impl CandidateSet {
    pub fn new(target: Id, k: usize) -> Self {
        Self {
            target,
            k,
            entries: Vec::with_capacity(k * 3),
        }
    }

    pub fn target(&self) -> Id {
        self.target
    }

    fn capacity(&self) -> usize {
        self.k * 3
    }

    /// Merges freshly learned contacts in as `Fresh`, skipping ids already
    /// tracked, then re-sorts and truncates to the capacity bound.
    pub fn merge(&mut self, contacts: impl IntoIterator<Item = NodeContact>) {
        for contact in contacts {
            if contact.id == self.target || self.entries.iter().any(|e| e.contact.id == contact.id) {
                continue;
            }
            self.entries.push(Candidate {
                contact,
                status: CandidateStatus::Fresh,
            });
        }
        sort_by_distance(&self.target, &mut self.entries, |c| c.contact.id);
        let capacity = self.capacity();
        self.entries.truncate(capacity);
    }

    pub fn mark_in_flight(&mut self, id: &Id) {
        self.set_status(id, CandidateStatus::InFlight);
    }

    pub fn mark_replied(&mut self, id: &Id) {
        self.set_status(id, CandidateStatus::Replied);
    }

    pub fn mark_failed(&mut self, id: &Id) {
        self.set_status(id, CandidateStatus::Failed);
    }

    fn set_status(&mut self, id: &Id, status: CandidateStatus) {
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.contact.id == id) {
            entry.status = status;
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.entries.iter().filter(|e| e.status == CandidateStatus::InFlight).count()
    }

    /// The k-th replied entry's distance to target, if at least k have
    /// replied (used as the loop's progress bound).
    fn kth_replied_distance(&self) -> Option<Id> {
        let mut replied_distances: Vec<Id> = self
            .entries
            .iter()
            .filter(|e| e.status == CandidateStatus::Replied)
            .map(|e| self.target.distance(&e.contact.id))
            .collect();
        replied_distances.sort();
        replied_distances.into_iter().nth(self.k.saturating_sub(1))
    }

    /// The next fresh candidate to query, if any fresh entry is closer than
    /// the k-th replied entry.
    pub fn next_fresh(&self) -> Option<Id> {
        let bound = self.kth_replied_distance();
        self.entries
            .iter()
            .filter(|e| e.status == CandidateStatus::Fresh)
            .find(|e| {
                bound
                    .map(|b| self.target.distance(&e.contact.id) < b)
                    .unwrap_or(true)
            })
            .map(|e| e.contact.id)
    }

    pub fn contact(&self, id: &Id) -> Option<&NodeContact> {
        self.entries.iter().find(|e| &e.contact.id == id).map(|e| &e.contact)
    }

    /// `true` once no fresh candidate remains closer than the k-th replied
    /// entry — the natural termination condition.
    pub fn exhausted(&self) -> bool {
        self.next_fresh().is_none()
    }

    /// The k nearest replied entries, ascending by distance
    ///
    pub fn replied(&self, k: usize) -> Vec<NodeContact> {
        let mut replied: Vec<NodeContact> = self
            .entries
            .iter()
            .filter(|e| e.status == CandidateStatus::Replied)
            .map(|e| e.contact.clone())
            .collect();
        sort_by_distance(&self.target, &mut replied, |c| c.id);
        replied.truncate(k);
        replied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn contact() -> NodeContact {
        NodeContact::new(Id::random(), "127.0.0.1:9090".parse::<SocketAddr>().unwrap())
    }

    #[test]
    fn merge_deduplicates_and_bounds_capacity() {
        let mut set = CandidateSet::new(Id::random(), 8);
        for _ in 0..100 {
            set.merge(std::iter::once(contact()));
        }
        assert!(set.entries.len() <= 24);
    }

    #[test]
    fn next_fresh_is_none_once_exhausted() {
        let target = Id::random();
        let mut set = CandidateSet::new(target, 8);
        let c = contact();
        let id = c.id;
        set.merge(std::iter::once(c));
        assert!(set.next_fresh().is_some());
        set.mark_replied(&id);
        assert!(set.exhausted());
    }
}
