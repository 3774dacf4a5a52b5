// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The storage tier : pluggable value and peer record stores
//! behind the [`ValueStore`]/[`PeerStore`] traits, so the RPC and
//! maintenance layers never depend on which backend a node was built with.
//!
//! Three backends ship: [`MemoryStore`] (always available, sharded
//! in-process map), [`sqlite::SqliteStore`] (single-node embedded, default),
//! and, behind the `postgres` feature, a server-side relational backend for
//! multi-process deployments.

mod entry;
mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub use entry::{PeerEntry, ValueEntry};
pub use error::{Error, Result};
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
pub use traits::{PeerStore, Storage, ValueStore, SCHEMA_VERSION};
