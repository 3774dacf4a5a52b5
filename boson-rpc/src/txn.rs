// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::error::{Error, Result};
use boson_core::Id;
use boson_wire::{Envelope, Method};
use std::{collections::HashMap, net::SocketAddr, time::Instant};
use tokio::sync::oneshot;

/// Default per-request timeout before adaptive tracking has any samples
///
pub const BASE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

pub type Completion = oneshot::Sender<std::result::Result<Envelope, Error>>;

struct PendingTransaction {
    method: Method,
    expected_addr: SocketAddr,
    expected_id: Option<Id>,
    deadline: Instant,
    completion: Completion,
}

/// Maps outstanding 32-bit transaction ids to their expected response shape
/// and completion handle.
#[derive(Default)]
pub struct TransactionTable {
    next_id: u32,
    pending: HashMap<u32, PendingTransaction>,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Allocates a fresh txid and registers the expected response shape,
    /// returning a future-side receiver. Monotonically increasing with
    /// wrap-around; collisions (an id still live from a previous wrap) are
    /// rejected with [`Error::TransactionTableFull`].
    pub fn begin(
        &mut self,
        method: Method,
        expected_addr: SocketAddr,
        expected_id: Option<Id>,
        timeout: std::time::Duration,
    ) -> Result<(u32, oneshot::Receiver<std::result::Result<Envelope, Error>>)> {
        if self.pending.len() as u32 >= u32::MAX - 1 {
            return Err(Error::TransactionTableFull);
        }
        let mut txid = self.next_id;
        let mut attempts = 0u32;
        while self.pending.contains_key(&txid) {
            txid = txid.wrapping_add(1);
            attempts += 1;
            if attempts == 0 {
                return Err(Error::TransactionTableFull);
            }
        }
        self.next_id = txid.wrapping_add(1);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            txid,
            PendingTransaction {
                method,
                expected_addr,
                expected_id,
                deadline: Instant::now() + timeout,
                completion: tx,
            },
        );
        Ok((txid, rx))
    }

    /// Delivers an inbound response/error envelope to its waiter, iff the
    /// sender matches the expected address or id. Returns `true` if delivered, `false` if this looked
    /// suspicious (unknown txid, or neither address nor id matched).
    pub fn complete(&mut self, txid: u32, from_addr: SocketAddr, from_id: Option<Id>, envelope: Envelope) -> bool {
        let Some(pending) = self.pending.get(&txid) else {
            return false;
        };
        let addr_matches = pending.expected_addr == from_addr;
        let id_matches = match (pending.expected_id, from_id) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => false,
        };
        if !addr_matches && !id_matches {
            return false;
        }
        if let Some(pending) = self.pending.remove(&txid) {
            let _ = pending.completion.send(Ok(envelope));
        }
        true
    }

    pub fn cancel(&mut self, txid: u32) {
        if let Some(pending) = self.pending.remove(&txid) {
            let _ = pending.completion.send(Err(Error::Canceled));
        }
    }

    /// Expected (method, address) of a still-pending transaction, if any —
    /// used by the timeout sweep to mark the routing-table contact failed.
    pub fn peek(&self, txid: u32) -> Option<(Method, SocketAddr)> {
        self.pending.get(&txid).map(|p| (p.method, p.expected_addr))
    }

    /// Removes and fails every transaction whose deadline has passed,
    /// returning their (txid, address) for routing-table bookkeeping.
    pub fn sweep_timeouts(&mut self, now: Instant) -> Vec<(u32, SocketAddr)> {
        let expired: Vec<u32> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(txid, _)| *txid)
            .collect();
        let mut failed = Vec::with_capacity(expired.len());
        for txid in expired {
            if let Some(pending) = self.pending.remove(&txid) {
                failed.push((txid, pending.expected_addr));
                let _ = pending.completion.send(Err(Error::Timeout(pending.expected_addr)));
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_allocates_distinct_ids() {
        let mut table = TransactionTable::new();
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let (id1, _rx1) = table.begin(Method::Ping, addr, None, BASE_TIMEOUT).unwrap();
        let (id2, _rx2) = table.begin(Method::Ping, addr, None, BASE_TIMEOUT).unwrap();
        assert_ne!(id1, id2);
    }

    #[tokio::test]
    async fn complete_delivers_on_address_match() {
        let mut table = TransactionTable::new();
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let (txid, rx) = table.begin(Method::Ping, addr, None, BASE_TIMEOUT).unwrap();
        let envelope = Envelope::response(Method::Ping, txid, None, &boson_wire::messages::PingResponse {}).unwrap();
        assert!(table.complete(txid, addr, None, envelope));
        assert!(rx.await.unwrap().is_ok());
    }

    #[test]
    fn complete_rejects_address_and_id_mismatch() {
        let mut table = TransactionTable::new();
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let other: SocketAddr = "127.0.0.1:9191".parse().unwrap();
        let (txid, _rx) = table.begin(Method::Ping, addr, None, BASE_TIMEOUT).unwrap();
        let envelope = Envelope::response(Method::Ping, txid, None, &boson_wire::messages::PingResponse {}).unwrap();
        assert!(!table.complete(txid, other, None, envelope));
    }

    #[test]
    fn sweep_timeouts_removes_expired_entries() {
        let mut table = TransactionTable::new();
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let (_txid, _rx) = table.begin(Method::Ping, addr, None, std::time::Duration::from_secs(0)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let expired = table.sweep_timeouts(Instant::now());
        assert_eq!(expired.len(), 1);
        assert!(table.is_empty());
    }
}
