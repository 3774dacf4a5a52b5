// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Storage-tier errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Wire error code 301: a put would replace an existing immutable record with a mutable one.
    #[error("cannot replace an existing immutable value with a mutable one")]
    ImmutableSubstitution,

    /// Wire error code 302: the new sequence number did not strictly exceed the stored one.
    #[error("new sequence number {new} does not exceed the stored sequence number {existing}")]
    SeqNotMonotonic { existing: i64, new: i64 },

    /// Wire error code 303: caller's expected_seq did not match the stored one.
    #[error("expected sequence number {expected} but the stored value has {actual}")]
    SeqNotExpected { expected: i64, actual: i64 },

    /// Wire error code 304: signature verification failed.
    #[error(transparent)]
    InvalidSignature(#[from] boson_core::Error),

    #[error("value data is {actual} bytes, exceeding the {max} byte limit")]
    DataTooLarge { actual: usize, max: usize },

    #[error("store is already initialized")]
    AlreadyInitialized,

    #[error("store has not been initialized")]
    NotInitialized,

    #[error("schema version mismatch: code expects {expected}, store has {found}")]
    SchemaMismatch { expected: u32, found: u32 },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("background task panicked or was cancelled: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}
