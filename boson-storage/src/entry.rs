// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use boson_core::{PeerAnnounce, Value};
use std::time::SystemTime;

/// A stored value plus the bookkeeping fields the spec's storage entry
/// wrapper defines  `announced_at`
/// is bumped only by an explicit announce-time update, never by a plain
/// `put`, so republish scheduling can tell "recently written" from
/// "recently announced" apart.
#[derive(Clone, Debug)]
pub struct ValueEntry {
    pub value: Value,
    pub persistent: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub announced_at: SystemTime,
}

/// A stored peer-announce record plus the same bookkeeping fields, keyed by
/// `(peer_id, fingerprint)`
#[derive(Clone, Debug)]
pub struct PeerEntry {
    pub peer: PeerAnnounce,
    pub persistent: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub announced_at: SystemTime,
}
