// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The server-side relational backend. Writes to a single key are
//! serialized with `SELECT ... FOR UPDATE` inside a transaction rather than an
//! in-process mutex, since several node processes may share this backend.

use crate::{
    entry::{PeerEntry, ValueEntry},
    error::{Error, Result},
    traits::{PeerStore, ValueStore, SCHEMA_VERSION},
};
use async_trait::async_trait;
use boson_core::{Id, MutableValue, PeerAnnounce, Value};
use boson_crypto::{Nonce, PublicKey, Signature};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex as StdMutex,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

const SCHEMA_SQL: &str = include_str!("../sql/postgres_schema.sql");

fn unix_secs(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn from_unix_secs(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
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

/// Server-side relational backend over a shared `PgPool`, for deployments
/// where several node processes need to agree on one store.
pub struct PostgresStore {
    pool: PgPool,
    value_ttl: StdMutex<Option<Duration>>,
    peer_ttl: StdMutex<Option<Duration>>,
    initialized: AtomicBool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(16).connect(database_url).await?;
        Ok(Self {
            pool,
            value_ttl: StdMutex::new(None),
            peer_ttl: StdMutex::new(None),
            initialized: AtomicBool::new(false),
        })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            value_ttl: StdMutex::new(None),
            peer_ttl: StdMutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    fn require_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    fn value_ttl(&self) -> Option<Duration> {
        *self.value_ttl.lock().expect("value_ttl mutex poisoned")
    }

    fn peer_ttl(&self) -> Option<Duration> {
        *self.peer_ttl.lock().expect("peer_ttl mutex poisoned")
    }
}

#[async_trait]
impl ValueStore for PostgresStore {
    async fn initialize(&self, value_ttl: Duration, peer_ttl: Duration) -> Result<()> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyInitialized);
        }
        *self.value_ttl.lock().expect("value_ttl mutex poisoned") = Some(value_ttl);
        *self.peer_ttl.lock().expect("peer_ttl mutex poisoned") = Some(peer_ttl);

        for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        let existing: Option<i32> = sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        match existing {
            Some(version) if version as u32 != SCHEMA_VERSION => {
                return Err(Error::SchemaMismatch {
                    expected: SCHEMA_VERSION,
                    found: version as u32,
                })
            }
            Some(_) => {}
            None => {
                sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                    .bind(SCHEMA_VERSION as i32)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
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

        let mut tx = self.pool.begin().await?;
        let id_bytes = value.id().as_bytes().to_vec();
        let now = unix_secs(SystemTime::now());

        let existing = sqlx::query("SELECT public_key IS NULL AS is_immutable, seq, created_at, announced_at FROM value WHERE id = $1 FOR UPDATE")
            .bind(&id_bytes)
            .fetch_optional(&mut *tx)
            .await?;

        let (created_at, announced_at) = match existing {
            None => (now, now),
            Some(row) => {
                let existing_is_immutable: bool = row.try_get("is_immutable")?;
                let existing_seq: Option<i64> = row.try_get("seq")?;
                let created_at: i64 = row.try_get("created_at")?;
                let announced_at: i64 = row.try_get("announced_at")?;
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
        sqlx::query(
            "INSERT INTO value (id, persistent, created_at, updated_at, announced_at, public_key, recipient, nonce, seq, signature, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (id) DO UPDATE SET
                persistent = excluded.persistent,
                updated_at = excluded.updated_at,
                public_key = excluded.public_key,
                recipient = excluded.recipient,
                nonce = excluded.nonce,
                seq = excluded.seq,
                signature = excluded.signature,
                data = excluded.data",
        )
        .bind(id)
        .bind(persistent)
        .bind(created_at)
        .bind(now)
        .bind(announced_at)
        .bind(public_key)
        .bind(recipient)
        .bind(nonce)
        .bind(seq)
        .bind(signature)
        .bind(data)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_value(&self, id: &Id) -> Result<Option<Value>> {
        self.require_initialized()?;
        let row = sqlx::query(
            "SELECT id, public_key, recipient, nonce, seq, signature, data, persistent, updated_at FROM value WHERE id = $1",
        )
        .bind(id.as_bytes().to_vec())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };

        let persistent: bool = row.try_get("persistent")?;
        let updated_at: i64 = row.try_get("updated_at")?;
        if !persistent {
            if let Some(ttl) = self.value_ttl() {
                if SystemTime::now().duration_since(from_unix_secs(updated_at)).map(|age| age > ttl).unwrap_or(false) {
                    return Ok(None);
                }
            }
        }
        Ok(Some(decode_value(
            row.try_get("id")?,
            row.try_get("public_key")?,
            row.try_get("recipient")?,
            row.try_get("nonce")?,
            row.try_get("seq")?,
            row.try_get("signature")?,
            row.try_get("data")?,
        )?))
    }

    async fn get_values(
        &self,
        persistent: Option<bool>,
        announced_before: Option<SystemTime>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ValueEntry>> {
        self.require_initialized()?;
        let mut sql = String::from(
            "SELECT id, public_key, recipient, nonce, seq, signature, data, persistent, created_at, updated_at, announced_at FROM value WHERE 1=1",
        );
        if persistent.is_some() {
            sql.push_str(" AND persistent = $1");
        }
        if announced_before.is_some() {
            sql.push_str(" AND announced_at < $2");
        }
        sql.push_str(" ORDER BY id ASC LIMIT $3 OFFSET $4");

        let persistent_param = persistent.unwrap_or(false);
        let cutoff_param = announced_before.map(unix_secs).unwrap_or(i64::MAX);
        let rows = sqlx::query(&sql)
            .bind(persistent_param)
            .bind(cutoff_param)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        let now = SystemTime::now();
        let ttl = self.value_ttl();
        let mut out = Vec::new();
        for row in rows {
            let persistent: bool = row.try_get("persistent")?;
            let updated_at: i64 = row.try_get("updated_at")?;
            if !persistent {
                if let Some(ttl) = ttl {
                    if now.duration_since(from_unix_secs(updated_at)).map(|age| age > ttl).unwrap_or(false) {
                        continue;
                    }
                }
            }
            out.push(ValueEntry {
                value: decode_value(
                    row.try_get("id")?,
                    row.try_get("public_key")?,
                    row.try_get("recipient")?,
                    row.try_get("nonce")?,
                    row.try_get("seq")?,
                    row.try_get("signature")?,
                    row.try_get("data")?,
                )?,
                persistent,
                created_at: from_unix_secs(row.try_get("created_at")?),
                updated_at: from_unix_secs(updated_at),
                announced_at: from_unix_secs(row.try_get("announced_at")?),
            });
        }
        Ok(out)
    }

    async fn update_value_announced_time(&self, id: &Id) -> Result<Option<SystemTime>> {
        self.require_initialized()?;
        let now = SystemTime::now();
        let changed = sqlx::query("UPDATE value SET announced_at = $1 WHERE id = $2")
            .bind(unix_secs(now))
            .bind(id.as_bytes().to_vec())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(if changed > 0 { Some(now) } else { None })
    }

    async fn remove_value(&self, id: &Id) -> Result<bool> {
        self.require_initialized()?;
        let changed = sqlx::query("DELETE FROM value WHERE id = $1")
            .bind(id.as_bytes().to_vec())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(changed > 0)
    }

    async fn purge_values(&self, now: SystemTime) -> Result<usize> {
        self.require_initialized()?;
        let Some(ttl) = self.value_ttl() else { return Ok(0) };
        let cutoff = unix_secs(now - ttl);
        let changed = sqlx::query("DELETE FROM value WHERE persistent = FALSE AND updated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(changed as usize)
    }
}

#[async_trait]
impl PeerStore for PostgresStore {
    async fn put_peers(&self, peers: Vec<PeerAnnounce>, persistent: bool) -> Result<()> {
        self.require_initialized()?;
        for peer in &peers {
            peer.verify().map_err(boson_core::Error::from)?;
        }
        let now = unix_secs(SystemTime::now());
        let mut tx = self.pool.begin().await?;
        for peer in &peers {
            let peer_id = peer.id().as_bytes().to_vec();
            let created_at: Option<i64> = sqlx::query_scalar("SELECT created_at FROM peer WHERE peer_id = $1 AND fingerprint = $2")
                .bind(&peer_id)
                .bind(peer.fingerprint.to_vec())
                .fetch_optional(&mut *tx)
                .await?;
            let created_at = created_at.unwrap_or(now);

            sqlx::query(
                "INSERT INTO peer (peer_id, fingerprint, node_id, endpoint, extra, signature, persistent, created_at, updated_at, announced_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
                 ON CONFLICT (peer_id, fingerprint) DO UPDATE SET
                    node_id = excluded.node_id,
                    endpoint = excluded.endpoint,
                    extra = excluded.extra,
                    signature = excluded.signature,
                    persistent = excluded.persistent,
                    updated_at = excluded.updated_at",
            )
            .bind(peer_id)
            .bind(peer.fingerprint.to_vec())
            .bind(peer.node_id.as_bytes().to_vec())
            .bind(&peer.endpoint)
            .bind(&peer.metadata)
            .bind(peer.signature.as_bytes().to_vec())
            .bind(persistent)
            .bind(created_at)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_peers(&self, peer_id: &Id, offset: usize, limit: usize) -> Result<Vec<PeerEntry>> {
        self.require_initialized()?;
        let rows = sqlx::query(
            "SELECT peer_id, fingerprint, node_id, endpoint, extra, signature, persistent, created_at, updated_at, announced_at
             FROM peer WHERE peer_id = $1 ORDER BY updated_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(peer_id.as_bytes().to_vec())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        let now = SystemTime::now();
        let ttl = self.peer_ttl();
        let mut out = Vec::new();
        for row in rows {
            let persistent: bool = row.try_get("persistent")?;
            let updated_at: i64 = row.try_get("updated_at")?;
            if !persistent {
                if let Some(ttl) = ttl {
                    if now.duration_since(from_unix_secs(updated_at)).map(|age| age > ttl).unwrap_or(false) {
                        continue;
                    }
                }
            }
            let fingerprint: Vec<u8> = row.try_get("fingerprint")?;
            out.push(PeerEntry {
                peer: PeerAnnounce {
                    peer_id: PublicKey::from_bytes(to_array32(&row.try_get::<Vec<u8>, _>("peer_id")?)?),
                    node_id: Id::from_bytes(to_array32(&row.try_get::<Vec<u8>, _>("node_id")?)?),
                    fingerprint: fingerprint.as_slice().try_into().map_err(|_| {
                        Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected 8-byte fingerprint"))
                    })?,
                    endpoint: row.try_get("endpoint")?,
                    metadata: row.try_get("extra")?,
                    signature: Signature::from_bytes(to_array64(&row.try_get::<Vec<u8>, _>("signature")?)?),
                },
                persistent,
                created_at: from_unix_secs(row.try_get("created_at")?),
                updated_at: from_unix_secs(updated_at),
                announced_at: from_unix_secs(row.try_get("announced_at")?),
            });
        }
        Ok(out)
    }

    async fn update_peer_announced_time(&self, peer_id: &Id, fingerprint: [u8; 8]) -> Result<Option<SystemTime>> {
        self.require_initialized()?;
        let now = SystemTime::now();
        let changed = sqlx::query("UPDATE peer SET announced_at = $1 WHERE peer_id = $2 AND fingerprint = $3")
            .bind(unix_secs(now))
            .bind(peer_id.as_bytes().to_vec())
            .bind(fingerprint.to_vec())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(if changed > 0 { Some(now) } else { None })
    }

    async fn remove_peers(&self, peer_id: &Id) -> Result<usize> {
        self.require_initialized()?;
        let changed = sqlx::query("DELETE FROM peer WHERE peer_id = $1")
            .bind(peer_id.as_bytes().to_vec())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(changed as usize)
    }

    async fn purge_peers(&self, now: SystemTime) -> Result<usize> {
        self.require_initialized()?;
        let Some(ttl) = self.peer_ttl() else { return Ok(0) };
        let cutoff = unix_secs(now - ttl);
        let changed = sqlx::query("DELETE FROM peer WHERE persistent = FALSE AND updated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(changed as usize)
    }
}
