// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The single-node embedded SQL backend  `rusqlite` is a synchronous driver, so
//! every call here is dispatched through `tokio::task::spawn_blocking` — the
//! concrete reason the async model's §5 needs a worker pool for storage calls.

use crate::{
    entry::{PeerEntry, ValueEntry},
    error::{Error, Result},
    traits::{PeerStore, ValueStore, SCHEMA_VERSION},
};
use async_trait::async_trait;
use boson_core::{Id, MutableValue, PeerAnnounce, Value};
use boson_crypto::{Nonce, PublicKey, Signature};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

const SCHEMA_SQL: &str = include_str!("../sql/sqlite_schema.sql");

fn unix_secs(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn from_unix_secs(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn encode_value(value: &Value) -> (Vec<u8>, Option<Vec<u8>>, Option<Vec<u8>>, Option<Vec<u8>>, Option<i64>, Option<Vec<u8>>, Vec<u8>) {
    match value {
        Value::Immutable { id, data } => (id.as_bytes().to_vec(), None, None, None, None, None, data.to_vec()),
        Value::Mutable(mv) => (
            mv.public_key.as_bytes().to_vec(),
            Some(mv.public_key.as_bytes().to_vec()),
            mv.recipient.map(|r| r.as_bytes().to_vec()),
            Some(mv.nonce.0.to_vec()),
            Some(mv.sequence_number),
            Some(mv.signature.as_bytes().to_vec()),
            mv.data.to_vec(),
        ),
    }
}

fn decode_value(
    id: Vec<u8>,
    public_key: Option<Vec<u8>>,
    recipient: Option<Vec<u8>>,
    nonce: Option<Vec<u8>>,
    seq: Option<i64>,
    signature: Option<Vec<u8>>,
    data: Vec<u8>,
) -> Result<Value> {
    match public_key {
        None => Ok(Value::Immutable {
            id: Id::from_bytes(to_array32(&id)?),
            data: data.into(),
        }),
        Some(pk) => Ok(Value::Mutable(MutableValue {
            public_key: PublicKey::from_bytes(to_array32(&pk)?),
            recipient: recipient.map(|r| to_array32(&r)).transpose()?.map(PublicKey::from_bytes),
            nonce: Nonce(to_array24(&nonce.unwrap_or_default())?),
            sequence_number: seq.unwrap_or(0),
            signature: Signature::from_bytes(to_array64(&signature.unwrap_or_default())?),
            data: data.into(),
        })),
    }
}

fn to_array32(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected 32 bytes")))
}

fn to_array24(bytes: &[u8]) -> Result<[u8; 24]> {
    bytes
        .try_into()
        .map_err(|_| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected 24 bytes")))
}

fn to_array64(bytes: &[u8]) -> Result<[u8; 64]> {
    bytes
        .try_into()
        .map_err(|_| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected 64 bytes")))
}

/// Single-node embedded storage backend over a `rusqlite` connection shared
/// behind a blocking mutex; every operation is dispatched to the tokio
/// blocking thread pool.
pub struct SqliteStore {
    conn: Arc<StdMutex<Connection>>,
    value_ttl: StdMutex<Option<Duration>>,
    peer_ttl: StdMutex<Option<Duration>>,
    initialized: AtomicBool,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        Ok(Self {
            conn: Arc::new(StdMutex::new(conn)),
            value_ttl: StdMutex::new(None),
            peer_ttl: StdMutex::new(None),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(StdMutex::new(conn)),
            value_ttl: StdMutex::new(None),
            peer_ttl: StdMutex::new(None),
            initialized: AtomicBool::new(false),
        })
    }

    fn require_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("sqlite connection mutex poisoned");
            f(&guard)
        })
        .await?
    }

    fn value_ttl(&self) -> Option<Duration> {
        *self.value_ttl.lock().expect("value_ttl mutex poisoned")
    }

    fn peer_ttl(&self) -> Option<Duration> {
        *self.peer_ttl.lock().expect("peer_ttl mutex poisoned")
    }
}

#[async_trait]
impl ValueStore for SqliteStore {
    async fn initialize(&self, value_ttl: Duration, peer_ttl: Duration) -> Result<()> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyInitialized);
        }
        *self.value_ttl.lock().expect("value_ttl mutex poisoned") = Some(value_ttl);
        *self.peer_ttl.lock().expect("peer_ttl mutex poisoned") = Some(peer_ttl);

        self.with_conn(move |conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            let existing: Option<u32> = conn
                .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
                .optional()?;
            match existing {
                Some(version) if version != SCHEMA_VERSION => {
                    return Err(Error::SchemaMismatch {
                        expected: SCHEMA_VERSION,
                        found: version,
                    })
                }
                Some(_) => {}
                None => {
                    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", params![SCHEMA_VERSION])?;
                }
            }
            Ok(())
        })
        .await
    }

    async fn put_value(&self, value: Value, persistent: bool, expected_seq: Option<i64>) -> Result<()> {
        self.require_initialized()?;
        if value.data().len() > boson_core::MAX_VALUE_SIZE {
            return Err(Error::DataTooLarge {
                actual: value.data().len(),
                max: boson_core::MAX_VALUE_SIZE,
            });
        }
        value.verify()?;

        let now = unix_secs(SystemTime::now());
        self.with_conn(move |conn| {
            let id_bytes = value.id().as_bytes().to_vec();
            let existing: Option<(bool, Option<i64>, i64, i64)> = conn
                .query_row(
                    "SELECT public_key IS NULL, seq, created_at, announced_at FROM value WHERE id = ?1",
                    params![id_bytes],
                    |row| Ok((row.get::<_, bool>(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()?;

            let (created_at, announced_at) = match existing {
                None => (now, now),
                Some((existing_is_immutable, existing_seq, created_at, announced_at)) => {
                    if existing_is_immutable && value.is_mutable() {
                        return Err(Error::ImmutableSubstitution);
                    }
                    if let Value::Mutable(mv) = &value {
                        let existing_seq = existing_seq.unwrap_or(0);
                        if mv.sequence_number <= existing_seq {
                            return Err(Error::SeqNotMonotonic {
                                existing: existing_seq,
                                new: mv.sequence_number,
                            });
                        }
                        if let Some(expected) = expected_seq {
                            if existing_seq != expected {
                                return Err(Error::SeqNotExpected {
                                    expected,
                                    actual: existing_seq,
                                });
                            }
                        }
                    }
                    (created_at, announced_at)
                }
            };

            let (id, public_key, recipient, nonce, seq, signature, data) = encode_value(&value);
            conn.execute(
                "INSERT INTO value (id, persistent, created_at, updated_at, announced_at, public_key, recipient, nonce, seq, signature, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(id) DO UPDATE SET
                    persistent = excluded.persistent,
                    updated_at = excluded.updated_at,
                    public_key = excluded.public_key,
                    recipient = excluded.recipient,
                    nonce = excluded.nonce,
                    seq = excluded.seq,
                    signature = excluded.signature,
                    data = excluded.data",
                params![id, persistent, created_at, now, announced_at, public_key, recipient, nonce, seq, signature, data],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_value(&self, id: &Id) -> Result<Option<Value>> {
        self.require_initialized()?;
        let id_bytes = id.as_bytes().to_vec();
        let ttl = self.value_ttl();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, public_key, recipient, nonce, seq, signature, data, persistent, updated_at FROM value WHERE id = ?1",
                    params![id_bytes],
                    |row| {
                        Ok((
                            row.get::<_, Vec<u8>>(0)?,
                            row.get::<_, Option<Vec<u8>>>(1)?,
                            row.get::<_, Option<Vec<u8>>>(2)?,
                            row.get::<_, Option<Vec<u8>>>(3)?,
                            row.get::<_, Option<i64>>(4)?,
                            row.get::<_, Option<Vec<u8>>>(5)?,
                            row.get::<_, Vec<u8>>(6)?,
                            row.get::<_, bool>(7)?,
                            row.get::<_, i64>(8)?,
                        ))
                    },
                )
                .optional()?;
            let Some((id, pk, recipient, nonce, seq, sig, data, persistent, updated_at)) = row else {
                return Ok(None);
            };
            if !persistent {
                if let Some(ttl) = ttl {
                    if SystemTime::now().duration_since(from_unix_secs(updated_at)).map(|age| age > ttl).unwrap_or(false) {
                        return Ok(None);
                    }
                }
            }
            Ok(Some(decode_value(id, pk, recipient, nonce, seq, sig, data)?))
        })
        .await
    }

    async fn get_values(
        &self,
        persistent: Option<bool>,
        announced_before: Option<SystemTime>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ValueEntry>> {
        self.require_initialized()?;
        let ttl = self.value_ttl();
        self.with_conn(move |conn| {
            let mut sql = String::from(
                "SELECT id, public_key, recipient, nonce, seq, signature, data, persistent, created_at, updated_at, announced_at FROM value WHERE 1=1",
            );
            if persistent.is_some() {
                sql.push_str(" AND persistent = ?1");
            }
            if announced_before.is_some() {
                sql.push_str(" AND announced_at < ?2");
            }
            sql.push_str(" ORDER BY id ASC LIMIT ?3 OFFSET ?4");

            let mut stmt = conn.prepare(&sql)?;
            let persistent_param = persistent.unwrap_or(false);
            let cutoff_param = announced_before.map(unix_secs).unwrap_or(i64::MAX);
            let rows = stmt.query_map(
                params![persistent_param, cutoff_param, limit as i64, offset as i64],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, Option<Vec<u8>>>(1)?,
                        row.get::<_, Option<Vec<u8>>>(2)?,
                        row.get::<_, Option<Vec<u8>>>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<Vec<u8>>>(5)?,
                        row.get::<_, Vec<u8>>(6)?,
                        row.get::<_, bool>(7)?,
                        row.get::<_, i64>(8)?,
                        row.get::<_, i64>(9)?,
                        row.get::<_, i64>(10)?,
                    ))
                },
            )?;

            let now = SystemTime::now();
            let mut out = Vec::new();
            for row in rows {
                let (id, pk, recipient, nonce, seq, sig, data, persistent, created_at, updated_at, announced_at) = row?;
                if !persistent {
                    if let Some(ttl) = ttl {
                        if now.duration_since(from_unix_secs(updated_at)).map(|age| age > ttl).unwrap_or(false) {
                            continue;
                        }
                    }
                }
                out.push(ValueEntry {
                    value: decode_value(id, pk, recipient, nonce, seq, sig, data)?,
                    persistent,
                    created_at: from_unix_secs(created_at),
                    updated_at: from_unix_secs(updated_at),
                    announced_at: from_unix_secs(announced_at),
                });
            }
            Ok(out)
        })
        .await
    }

    async fn update_value_announced_time(&self, id: &Id) -> Result<Option<SystemTime>> {
        self.require_initialized()?;
        let id_bytes = id.as_bytes().to_vec();
        let now = SystemTime::now();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE value SET announced_at = ?1 WHERE id = ?2",
                params![unix_secs(now), id_bytes],
            )?;
            Ok(if changed > 0 { Some(now) } else { None })
        })
        .await
    }

    async fn remove_value(&self, id: &Id) -> Result<bool> {
        self.require_initialized()?;
        let id_bytes = id.as_bytes().to_vec();
        self.with_conn(move |conn| Ok(conn.execute("DELETE FROM value WHERE id = ?1", params![id_bytes])? > 0))
            .await
    }

    async fn purge_values(&self, now: SystemTime) -> Result<usize> {
        self.require_initialized()?;
        let Some(ttl) = self.value_ttl() else { return Ok(0) };
        let cutoff = unix_secs(now - ttl);
        self.with_conn(move |conn| {
            Ok(conn.execute(
                "DELETE FROM value WHERE persistent = 0 AND updated_at < ?1",
                params![cutoff],
            )?)
        })
        .await
    }
}

#[async_trait]
impl PeerStore for SqliteStore {
    async fn put_peers(&self, peers: Vec<PeerAnnounce>, persistent: bool) -> Result<()> {
        self.require_initialized()?;
        for peer in &peers {
            peer.verify().map_err(boson_core::Error::from)?;
        }
        let now = unix_secs(SystemTime::now());
        self.with_conn(move |conn| {
            for peer in &peers {
                let peer_id = peer.id().as_bytes().to_vec();
                let created_at: Option<i64> = conn
                    .query_row(
                        "SELECT created_at FROM peer WHERE peer_id = ?1 AND fingerprint = ?2",
                        params![peer_id, peer.fingerprint.to_vec()],
                        |row| row.get(0),
                    )
                    .optional()?;
                let created_at = created_at.unwrap_or(now);
                conn.execute(
                    "INSERT INTO peer (peer_id, fingerprint, node_id, endpoint, extra, signature, persistent, created_at, updated_at, announced_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
                     ON CONFLICT(peer_id, fingerprint) DO UPDATE SET
                        node_id = excluded.node_id,
                        endpoint = excluded.endpoint,
                        extra = excluded.extra,
                        signature = excluded.signature,
                        persistent = excluded.persistent,
                        updated_at = excluded.updated_at",
                    params![
                        peer_id,
                        peer.fingerprint.to_vec(),
                        peer.node_id.as_bytes().to_vec(),
                        peer.endpoint,
                        peer.metadata,
                        peer.signature.as_bytes().to_vec(),
                        persistent,
                        created_at,
                        now,
                    ],
                )?;
            }
            Ok(())
        })
        .await
    }

    async fn get_peers(&self, peer_id: &Id, offset: usize, limit: usize) -> Result<Vec<PeerEntry>> {
        self.require_initialized()?;
        let peer_id_bytes = peer_id.as_bytes().to_vec();
        let ttl = self.peer_ttl();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT peer_id, fingerprint, node_id, endpoint, extra, signature, persistent, created_at, updated_at, announced_at
                 FROM peer WHERE peer_id = ?1 ORDER BY updated_at DESC LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt.query_map(params![peer_id_bytes, limit as i64, offset as i64], |row| {
                Ok((
                    row.get::<_, Vec<u8>>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<Vec<u8>>>(4)?,
                    row.get::<_, Vec<u8>>(5)?,
                    row.get::<_, bool>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, i64>(9)?,
                ))
            })?;

            let now = SystemTime::now();
            let mut out = Vec::new();
            for row in rows {
                let (peer_id, fingerprint, node_id, endpoint, extra, signature, persistent, created_at, updated_at, announced_at) = row?;
                if !persistent {
                    if let Some(ttl) = ttl {
                        if now.duration_since(from_unix_secs(updated_at)).map(|age| age > ttl).unwrap_or(false) {
                            continue;
                        }
                    }
                }
                out.push(PeerEntry {
                    peer: PeerAnnounce {
                        peer_id: PublicKey::from_bytes(to_array32(&peer_id)?),
                        node_id: Id::from_bytes(to_array32(&node_id)?),
                        fingerprint: fingerprint.as_slice().try_into().map_err(|_| {
                            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected 8-byte fingerprint"))
                        })?,
                        endpoint,
                        metadata: extra,
                        signature: Signature::from_bytes(to_array64(&signature)?),
                    },
                    persistent,
                    created_at: from_unix_secs(created_at),
                    updated_at: from_unix_secs(updated_at),
                    announced_at: from_unix_secs(announced_at),
                });
            }
            Ok(out)
        })
        .await
    }

    async fn update_peer_announced_time(&self, peer_id: &Id, fingerprint: [u8; 8]) -> Result<Option<SystemTime>> {
        self.require_initialized()?;
        let peer_id_bytes = peer_id.as_bytes().to_vec();
        let now = SystemTime::now();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE peer SET announced_at = ?1 WHERE peer_id = ?2 AND fingerprint = ?3",
                params![unix_secs(now), peer_id_bytes, fingerprint.to_vec()],
            )?;
            Ok(if changed > 0 { Some(now) } else { None })
        })
        .await
    }

    async fn remove_peers(&self, peer_id: &Id) -> Result<usize> {
        self.require_initialized()?;
        let peer_id_bytes = peer_id.as_bytes().to_vec();
        self.with_conn(move |conn| Ok(conn.execute("DELETE FROM peer WHERE peer_id = ?1", params![peer_id_bytes])?))
            .await
    }

    async fn purge_peers(&self, now: SystemTime) -> Result<usize> {
        self.require_initialized()?;
        let Some(ttl) = self.peer_ttl() else { return Ok(0) };
        let cutoff = unix_secs(now - ttl);
        self.with_conn(move |conn| {
            Ok(conn.execute("DELETE FROM peer WHERE persistent = 0 AND updated_at < ?1", params![cutoff])?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boson_crypto::KeyPair;

    fn ttl() -> Duration {
        Duration::from_secs(3600)
    }

    #[tokio::test]
    async fn immutable_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize(ttl(), ttl()).await.unwrap();
        let value = Value::immutable(&b"hello"[..]).unwrap();
        let id = value.id();
        store.put_value(value.clone(), false, None).await.unwrap();
        assert_eq!(store.get_value(&id).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn reopen_with_matching_schema_succeeds_reinit_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize(ttl(), ttl()).await.unwrap();
        assert!(matches!(store.initialize(ttl(), ttl()).await, Err(Error::AlreadyInitialized)));
    }

    #[tokio::test]
    async fn mutable_update_wins_by_seq() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize(ttl(), ttl()).await.unwrap();
        let keypair = KeyPair::random();
        let id = Id::from(keypair.public_key());
        store.put_value(Value::signed(&keypair, 1, &b"a"[..]).unwrap(), false, None).await.unwrap();
        store.put_value(Value::signed(&keypair, 2, &b"b"[..]).unwrap(), false, None).await.unwrap();
        let current = store.get_value(&id).await.unwrap().unwrap();
        assert_eq!(current.data().as_ref(), b"b");

        let stale = store.put_value(Value::signed(&keypair, 1, &b"c"[..]).unwrap(), false, None).await;
        assert!(matches!(stale, Err(Error::SeqNotMonotonic { .. })));
    }

    #[tokio::test]
    async fn expiration_purges_non_persistent_but_keeps_persistent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize(Duration::from_millis(10), ttl()).await.unwrap();
        let transient = Value::immutable(&b"transient"[..]).unwrap();
        let transient_id = transient.id();
        store.put_value(transient, false, None).await.unwrap();
        let persistent = Value::immutable(&b"persistent"[..]).unwrap();
        let persistent_id = persistent.id();
        store.put_value(persistent.clone(), true, None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        store.purge_values(SystemTime::now()).await.unwrap();
        assert_eq!(store.get_value(&transient_id).await.unwrap(), None);
        assert_eq!(store.get_value(&persistent_id).await.unwrap(), Some(persistent));
    }
}
