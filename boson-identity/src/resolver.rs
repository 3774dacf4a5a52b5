// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! `Resolver`: the identifier layer's external interface.
//! `resolve` consults the two-tier [`Cache`] before falling back to a DHT
//! `find-value` lookup, coalescing concurrent misses for the same id into a
//! single in-flight lookup. `register` publishes a signed Card.

use crate::{
    cache::{Cache, PERSISTENT_TTL},
    card::Card,
    error::Result,
    result::ResolutionResult,
};
use async_trait::async_trait;
use boson_core::{Id, Value};
use boson_node::Node;
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::sync::{watch, Mutex};
use tracing::warn;

/// The only DHT surface the identifier layer needs. A trait rather than a direct `Node`
/// dependency so `Resolver` can be driven by a fake in tests without
/// standing up real UDP sockets, exactly as `boson_storage::Storage`
/// type-erases the storage tier for `boson-node`.
#[async_trait]
pub trait ValueLookup: Send + Sync {
    async fn find_value(&self, id: Id) -> Result<Option<Value>>;
    async fn store_value(&self, value: Value) -> Result<usize>;
}

#[async_trait]
impl ValueLookup for Node {
    async fn find_value(&self, id: Id) -> Result<Option<Value>> {
        Ok(Node::find_value(self, id).await?)
    }

    async fn store_value(&self, value: Value) -> Result<usize> {
        Ok(Node::store_value(self, value).await?)
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Resolves and publishes identity [`Card`]s over a [`ValueLookup`], with a
/// two-tier cache and at-most-one-concurrent-resolution-per-id coalescing
///
pub struct Resolver {
    dht: Arc<dyn ValueLookup>,
    cache: Cache,
    inflight: Mutex<HashMap<Id, watch::Receiver<Option<ResolutionResult>>>>,
}

impl Resolver {
    /// Builds a resolver over `dht` (typically a running [`Node`]), with an
    /// in-memory-only cache.
    pub fn new(dht: Arc<dyn ValueLookup>) -> Self {
        Self::with_persistent_cache(dht, None)
    }

    /// Builds a resolver with a file-system persistent cache tier rooted at
    /// `persistent_dir`, if given.
    pub fn with_persistent_cache(dht: Arc<dyn ValueLookup>, persistent_dir: Option<PathBuf>) -> Self {
        Resolver {
            dht,
            cache: Cache::new(persistent_dir, PERSISTENT_TTL),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves `id` to a Card. `use_cache = false` forces a fresh DHT
    /// lookup; `valid_ttl`, when given, overrides the cache's default
    /// freshness window for this call only.
    pub async fn resolve(&self, id: Id, use_cache: bool, valid_ttl: Option<Duration>) -> Result<ResolutionResult> {
        let now = now_unix();
        if use_cache {
            if let Some(cached) = self.cache_get(&id, now, valid_ttl).await {
                return Ok(cached);
            }
        }

        // Join an in-flight resolution for this id if one exists, else become it.
        let mut guard = self.inflight.lock().await;
        if let Some(existing) = guard.get(&id) {
            let mut rx = existing.clone();
            drop(guard);
            return Ok(self.await_inflight(&mut rx, now).await);
        }
        let (tx, rx) = watch::channel(None);
        guard.insert(id, rx);
        drop(guard);

        let outcome = self.fetch(id, now).await;
        self.inflight.lock().await.remove(&id);

        match outcome {
            Ok(result) => {
                self.cache.put(id, result.clone()).await;
                let _ = tx.send(Some(result.clone()));
                Ok(result)
            }
            Err(err) => {
                // Unblock anyone who joined this lookup with a conservative
                // not-found rather than leaving their `watch` waiting forever;
                // the original caller still observes the real error.
                let _ = tx.send(Some(ResolutionResult::not_found(now)));
                Err(err)
            }
        }
    }

    /// Publishes a Card (built with [`Card::sign`]) to the k nodes closest
    /// to its subject id.
    pub async fn register(&self, card: Value) -> Result<()> {
        self.dht.store_value(card).await?;
        Ok(())
    }

    async fn cache_get(&self, id: &Id, now: i64, valid_ttl: Option<Duration>) -> Option<ResolutionResult> {
        let cached = self.cache.get(id, now).await?;
        if let Some(ttl) = valid_ttl {
            let age = now.saturating_sub(cached.metadata.resolved).max(0) as u64;
            if age >= ttl.as_secs() {
                return None;
            }
        }
        Some(cached)
    }

    async fn await_inflight(&self, rx: &mut watch::Receiver<Option<ResolutionResult>>, now: i64) -> ResolutionResult {
        loop {
            if let Some(result) = rx.borrow().clone() {
                return result;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without sending: the original resolver task
                // errored. Report a conservative not-found rather than hang.
                return ResolutionResult::not_found(now);
            }
        }
    }

    async fn fetch(&self, id: Id, now: i64) -> Result<ResolutionResult> {
        match self.dht.find_value(id).await? {
            Some(value) => match Card::from_value(&value) {
                Ok(card) => Ok(ResolutionResult::success(card, now, None)),
                Err(err) => {
                    warn!(%id, %err, "resolved value is not a valid Card");
                    Ok(ResolutionResult::invalid(now))
                }
            },
            None => Ok(ResolutionResult::not_found(now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResolutionStatus;
    use boson_crypto::KeyPair;
    use std::{collections::HashMap as StdHashMap, time::Duration};
    use tokio::sync::Mutex as AsyncMutex;

    /// An in-process stand-in DHT: a shared map keyed by value id, with an
    /// optional artificial per-lookup delay so coalescing can be observed
    /// deterministically instead of racing real UDP round-trips.
    #[derive(Default)]
    struct FakeDht {
        values: AsyncMutex<StdHashMap<Id, Value>>,
        lookups: std::sync::atomic::AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeDht {
        fn new() -> Arc<Self> {
            Arc::new(FakeDht::default())
        }

        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(FakeDht {
                delay: Some(delay),
                ..Default::default()
            })
        }

        fn lookup_count(&self) -> usize {
            self.lookups.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ValueLookup for FakeDht {
        async fn find_value(&self, id: Id) -> Result<Option<Value>> {
            self.lookups.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.values.lock().await.get(&id).cloned())
        }

        async fn store_value(&self, value: Value) -> Result<usize> {
            self.values.lock().await.insert(value.id(), value);
            Ok(1)
        }
    }

    #[tokio::test]
    async fn resolve_missing_id_is_not_found() {
        let dht = FakeDht::new();
        let resolver = Resolver::new(dht);
        let result = resolver.resolve(Id::random(), true, None).await.unwrap();
        assert_eq!(result.status, ResolutionStatus::NotFound);
    }

    #[tokio::test]
    async fn register_then_resolve_round_trips() {
        let dht = FakeDht::new();
        let keypair = KeyPair::random();
        let id = Id::from(keypair.public_key());
        let resolver = Resolver::new(dht);
        let value = Card::sign(&keypair, 1, 1_700_000_000, false, &b"hello"[..]).unwrap();
        resolver.register(value).await.unwrap();
        let result = resolver.resolve(id, false, None).await.unwrap();
        assert_eq!(result.status, ResolutionStatus::Success);
        assert_eq!(result.payload.unwrap().payload.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn concurrent_resolves_for_same_id_issue_one_lookup() {
        let dht = FakeDht::with_delay(Duration::from_millis(50));
        let keypair = KeyPair::random();
        let id = Id::from(keypair.public_key());
        let value = Card::sign(&keypair, 1, 1, false, &b"data"[..]).unwrap();
        dht.store_value(value).await.unwrap();
        let resolver = Arc::new(Resolver::new(dht.clone()));

        let a = { let r = resolver.clone(); tokio::spawn(async move { r.resolve(id, true, None).await }) };
        let b = { let r = resolver.clone(); tokio::spawn(async move { r.resolve(id, true, None).await }) };
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap().unwrap().status, ResolutionStatus::Success);
        assert_eq!(b.unwrap().unwrap().status, ResolutionStatus::Success);
        // Both calls landed inside the same in-flight window, so only one
        // `find_value` ever reached the DHT 
        assert_eq!(dht.lookup_count(), 1);
    }

    #[tokio::test]
    async fn cached_result_needs_no_further_lookup_within_ttl() {
        let dht = FakeDht::new();
        let keypair = KeyPair::random();
        let id = Id::from(keypair.public_key());
        let resolver = Resolver::new(dht.clone());
        let value = Card::sign(&keypair, 1, 1, false, &b"cached"[..]).unwrap();
        resolver.register(value).await.unwrap();
        let first = resolver.resolve(id, true, None).await.unwrap();
        assert_eq!(first.status, ResolutionStatus::Success);
        assert_eq!(dht.lookup_count(), 1);

        // Remove it from the DHT; a cache hit should still serve the earlier
        // payload within the TTL window without another lookup.
        dht.values.lock().await.remove(&id);
        let second = resolver
            .resolve(id, true, Some(Duration::from_secs(300)))
            .await
            .unwrap();
        assert_eq!(second.status, ResolutionStatus::Success);
        assert_eq!(dht.lookup_count(), 1);
    }

    #[tokio::test]
    async fn expired_cache_entry_triggers_a_fresh_lookup() {
        let dht = FakeDht::new();
        let keypair = KeyPair::random();
        let id = Id::from(keypair.public_key());
        let resolver = Resolver::new(dht.clone());
        let value = Card::sign(&keypair, 1, 1, false, &b"stale"[..]).unwrap();
        resolver.register(value).await.unwrap();
        resolver.resolve(id, true, None).await.unwrap();
        assert_eq!(dht.lookup_count(), 1);

        // A near-zero TTL forces the cached entry to be treated as stale.
        let refreshed = resolver.resolve(id, true, Some(Duration::from_secs(0))).await.unwrap();
        assert_eq!(refreshed.status, ResolutionStatus::Success);
        assert_eq!(dht.lookup_count(), 2);
    }
}
