// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! Exercises the same scenario against every storage backend so they stay
//! behaviorally interchangeable.

use boson_core::{PeerAnnounce, Value};
use boson_crypto::KeyPair;
use boson_storage::{MemoryStore, PeerStore, SqliteStore, ValueStore};
use std::time::Duration;

async fn exercise(store: &(impl ValueStore + PeerStore + Sync)) {
    store.initialize(Duration::from_millis(50), Duration::from_secs(3600)).await.unwrap();

    let owner = KeyPair::random();
    let mutable_id = boson_core::Id::from(owner.public_key());
    store.put_value(Value::signed(&owner, 1, &b"v1"[..]).unwrap(), false, None).await.unwrap();
    store.put_value(Value::signed(&owner, 2, &b"v2"[..]).unwrap(), false, None).await.unwrap();
    assert_eq!(store.get_value(&mutable_id).await.unwrap().unwrap().data().as_ref(), b"v2");

    let stale = store.put_value(Value::signed(&owner, 2, &b"v3"[..]).unwrap(), false, None).await;
    assert!(stale.is_err());

    let announce = PeerAnnounce::sign(&owner, boson_core::Id::random(), [7; 8], "198.51.100.9:4222", None).unwrap();
    store.put_peers(vec![announce.clone()], false).await.unwrap();
    let fetched = store.get_peers(&announce.id(), 0, 10).await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].peer.endpoint, "198.51.100.9:4222");

    tokio::time::sleep(Duration::from_millis(80)).await;
    let purged = store.purge_values(std::time::SystemTime::now()).await.unwrap();
    assert!(purged >= 1);
    assert!(store.get_value(&mutable_id).await.unwrap().is_none());
}

#[tokio::test]
async fn memory_backend_satisfies_the_contract() {
    exercise(&MemoryStore::new()).await;
}

#[tokio::test]
async fn sqlite_backend_satisfies_the_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("boson.sqlite")).unwrap();
    exercise(&store).await;
}

#[tokio::test]
async fn sqlite_rejects_reopen_with_mismatched_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boson.sqlite");
    {
        let store = SqliteStore::open(&path).unwrap();
        store.initialize(Duration::from_secs(60), Duration::from_secs(60)).await.unwrap();
    }
    // Simulate a store written by a future schema version.
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute("UPDATE schema_version SET version = 999", []).unwrap();
    drop(conn);

    let store = SqliteStore::open(&path).unwrap();
    let err = store.initialize(Duration::from_secs(60), Duration::from_secs(60)).await.unwrap_err();
    assert!(matches!(err, boson_storage::Error::SchemaMismatch { .. }));
}
