// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::{
    entry::{PeerEntry, ValueEntry},
    error::Result,
};
use async_trait::async_trait;
use boson_core::{Id, PeerAnnounce, Value};
use std::time::{Duration, SystemTime};

/// The schema version this code expects. See `DESIGN.md` for why this
/// implementation targets the richer, later schema rather than the
/// minimal original one.
pub const SCHEMA_VERSION: u32 = 5;

/// Value-record half of the storage tier contract.
/// Implemented identically by the in-memory and SQL-backed stores so RPC
/// handlers and maintenance code are backend-agnostic.
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// Opens (creating on first use) the backing store, checking or writing
    /// the `schema_version` row. Fails with `Error::SchemaMismatch` if an
    /// existing store's version differs from [`SCHEMA_VERSION`], and with
    /// `Error::AlreadyInitialized` if this handle was already initialized.
    async fn initialize(&self, value_ttl: Duration, peer_ttl: Duration) -> Result<()>;

    /// Validates and writes `value`. An immutable value may never replace
    /// another value already stored under the same id; a mutable value must
    /// carry a strictly greater (or, if `expected_seq` is given, exactly
    /// matching) sequence number than what is on record, and a signature
    /// that verifies.
    async fn put_value(&self, value: Value, persistent: bool, expected_seq: Option<i64>) -> Result<()>;

    /// `None` iff absent or expired and non-persistent.
    async fn get_value(&self, id: &Id) -> Result<Option<Value>>;

    /// Stable, id-ascending paginated scan, optionally filtered by
    /// persistence and/or an `announced_before` cutoff.
    async fn get_values(
        &self,
        persistent: Option<bool>,
        announced_before: Option<SystemTime>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ValueEntry>>;

    /// Bumps `announced_at` to now, returning the new timestamp, or `None`
    /// if no record exists under `id`.
    async fn update_value_announced_time(&self, id: &Id) -> Result<Option<SystemTime>>;

    async fn remove_value(&self, id: &Id) -> Result<bool>;

    /// Deletes every non-persistent record whose `updated_at` is older than
    /// this store's configured value TTL, returning the count removed.
    async fn purge_values(&self, now: SystemTime) -> Result<usize>;
}

/// Peer-announce half of the storage tier contract,
/// keyed by `(peer_id, fingerprint)`.
#[async_trait]
pub trait PeerStore: Send + Sync {
    /// Atomic batch insert.
    async fn put_peers(&self, peers: Vec<PeerAnnounce>, persistent: bool) -> Result<()>;

    /// Newest-first by `updated_at`, so a republisher's most recent
    /// announcement comes first.
    async fn get_peers(&self, peer_id: &Id, offset: usize, limit: usize) -> Result<Vec<PeerEntry>>;

    async fn update_peer_announced_time(&self, peer_id: &Id, fingerprint: [u8; 8]) -> Result<Option<SystemTime>>;

    /// Removes every announcement stored under `peer_id`, returning the count removed.
    async fn remove_peers(&self, peer_id: &Id) -> Result<usize>;

    async fn purge_peers(&self, now: SystemTime) -> Result<usize>;
}

/// A backend implementing both halves of the storage tier. Blanket-derived
/// for any type implementing both traits, so callers can hold a single
/// type-erased `Arc<dyn Storage>` regardless of which backend is behind it.
pub trait Storage: ValueStore + PeerStore {}
impl<T: ValueStore + PeerStore> Storage for T {}
