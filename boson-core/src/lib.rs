// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The Boson data model: opaque 32-byte [`Id`]s under the XOR metric, the
//! immutable/mutable/encrypted [`Value`] record types, and the routing-table
//! contact and peer-announce records built on top of them.

mod error;
mod id;
mod peer;
mod value;

pub use error::{Error, Result};
pub use id::{sort_by_distance, Id};
pub use peer::{NodeContact, PeerAnnounce, Reachability};
pub use value::{MutableValue, Value, MAX_VALUE_SIZE};
