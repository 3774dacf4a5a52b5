// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The Kademlia routing table: k-buckets ordered by prefix distance from the
//! local id, a replacement cache per bucket, liveness tracking, and bucket
//! splitting restricted to the bucket covering the local id's own prefix.

mod bucket;
mod table;

pub use bucket::{Disposition, FRESHNESS_WINDOW, K};
pub use table::{RoutingTable, MAX_TIMEOUTS, REFRESH_INTERVAL};
