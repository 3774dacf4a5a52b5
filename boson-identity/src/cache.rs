// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The two-tier resolver cache : a bounded in-memory LRU with
//! a 5-minute TTL backed by a persistent file-system tier with a 24-hour
//! TTL. Only successful resolutions are cached — a not-found or invalid
//! result is never worth remembering, since the record may simply not have
//! propagated yet.

use crate::{
    card::Card,
    result::{ResolutionMetadata, ResolutionResult, ResolutionStatus},
};
use boson_core::Id;
use lru_time_cache::LruCache;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use tokio::sync::Mutex;
use tracing::warn;

/// In-memory tier capacity.
pub const MEMORY_CAPACITY: usize = 10_000;

/// In-memory tier TTL.
pub const MEMORY_TTL: Duration = Duration::from_secs(5 * 60);

/// Persistent tier default TTL.
pub const PERSISTENT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    subject: [u8; 32],
    sequence_number: i64,
    signed_at: i64,
    deactivated: bool,
    payload: Vec<u8>,
    fetched_at: i64,
}

impl PersistedEntry {
    fn from_card(card: &Card, fetched_at: i64) -> Self {
        PersistedEntry {
            subject: *card.subject.as_bytes(),
            sequence_number: card.sequence_number,
            signed_at: card.signed_at,
            deactivated: card.deactivated,
            payload: card.payload.to_vec(),
            fetched_at,
        }
    }

    fn into_card(self) -> Card {
        Card {
            subject: Id::from_bytes(self.subject),
            sequence_number: self.sequence_number,
            signed_at: self.signed_at,
            deactivated: self.deactivated,
            payload: self.payload.into(),
        }
    }
}

/// The cache's two tiers. `persistent_dir` is optional: a resolver with no
/// directory configured runs in-memory only.
pub struct Cache {
    memory: Mutex<LruCache<Id, ResolutionResult>>,
    persistent_dir: Option<PathBuf>,
    persistent_ttl: Duration,
}

impl Cache {
    pub fn new(persistent_dir: Option<PathBuf>, persistent_ttl: Duration) -> Self {
        Cache {
            memory: Mutex::new(LruCache::with_expiry_duration_and_capacity(MEMORY_TTL, MEMORY_CAPACITY)),
            persistent_dir,
            persistent_ttl,
        }
    }

    /// Checks the in-memory tier, then (on miss) the persistent tier,
    /// promoting a persistent hit back into memory.
    pub async fn get(&self, id: &Id, now: i64) -> Option<ResolutionResult> {
        if let Some(hit) = self.memory.lock().await.get(id).cloned() {
            return Some(hit);
        }
        let hit = self.get_persistent(id, now).await?;
        self.memory.lock().await.insert(*id, hit.clone());
        Some(hit)
    }

    /// Write-through insert into both tiers. Persistent-tier failures are
    /// logged and swallowed.
    pub async fn put(&self, id: Id, result: ResolutionResult) {
        self.memory.lock().await.insert(id, result.clone());
        if let Some(card) = &result.payload {
            self.put_persistent(&id, card, result.metadata.resolved).await;
        }
    }

    async fn get_persistent(&self, id: &Id, now: i64) -> Option<ResolutionResult> {
        let dir = self.persistent_dir.as_ref()?;
        let path = dir.join(format!("{}.json", id.to_base58()));
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(%err, path = %path.display(), "persistent identity cache read failed");
                return None;
            }
        };
        let persisted: PersistedEntry = match serde_json::from_slice(&bytes) {
            Ok(p) => p,
            Err(err) => {
                warn!(%err, path = %path.display(), "persistent identity cache entry is corrupt");
                return None;
            }
        };
        let age = now.saturating_sub(persisted.fetched_at).max(0) as u64;
        if age > self.persistent_ttl.as_secs() {
            return None;
        }
        let card = persisted.into_card();
        Some(ResolutionResult {
            status: ResolutionStatus::Success,
            metadata: ResolutionMetadata {
                created: Some(card.signed_at),
                updated: Some(card.signed_at),
                resolved: now,
                deactivated: card.deactivated,
                version: card.sequence_number,
            },
            payload: Some(card),
        })
    }

    async fn put_persistent(&self, id: &Id, card: &Card, fetched_at: i64) {
        let Some(dir) = &self.persistent_dir else {
            return;
        };
        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            warn!(%err, dir = %dir.display(), "failed to create persistent identity cache directory");
            return;
        }
        let entry = PersistedEntry::from_card(card, fetched_at);
        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, "failed to encode persistent identity cache entry");
                return;
            }
        };
        let path = dir.join(format!("{}.json", id.to_base58()));
        if let Err(err) = tokio::fs::write(&path, bytes).await {
            warn!(%err, path = %path.display(), "persistent identity cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boson_crypto::KeyPair;

    fn sample_result(card_signed_at: i64) -> (Id, ResolutionResult) {
        let keypair = KeyPair::random();
        let id = Id::from(keypair.public_key());
        let card = Card {
            subject: id,
            sequence_number: 1,
            signed_at: card_signed_at,
            deactivated: false,
            payload: b"payload"[..].into(),
        };
        (id, ResolutionResult::success(card, card_signed_at, None))
    }

    #[tokio::test]
    async fn memory_tier_round_trips() {
        let cache = Cache::new(None, PERSISTENT_TTL);
        let (id, result) = sample_result(100);
        cache.put(id, result.clone()).await;
        assert_eq!(cache.get(&id, 101).await, Some(result));
    }

    #[tokio::test]
    async fn persistent_tier_survives_memory_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(Some(dir.path().to_path_buf()), PERSISTENT_TTL);
        let (id, result) = sample_result(100);
        cache.put(id, result).await;
        // Simulate memory-tier eviction by constructing a fresh cache over
        // the same directory.
        let reopened = Cache::new(Some(dir.path().to_path_buf()), PERSISTENT_TTL);
        let hit = reopened.get(&id, 150).await.expect("persistent hit");
        assert_eq!(hit.payload.unwrap().signed_at, 100);
    }

    #[tokio::test]
    async fn persistent_tier_expires_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(Some(dir.path().to_path_buf()), Duration::from_secs(10));
        let (id, result) = sample_result(100);
        cache.put(id, result).await;
        let reopened = Cache::new(Some(dir.path().to_path_buf()), Duration::from_secs(10));
        assert!(reopened.get(&id, 1_000).await.is_none());
    }
}
