// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The iterative-lookup task engine: a single generic driver
//! ([`lookup::run`]) plus the six method-specific tasks built on top of it
//!

mod announce_peer;
mod candidate;
mod cancel;
mod error;
mod find_node;
mod find_peer;
mod find_value;
mod lookup;
mod ping_refresh;
mod store_value;
mod wire_adapt;

pub use announce_peer::announce_peer;
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use find_node::{find_node, find_node_with_tokens};
pub use find_peer::{find_peer, FIND_PEER_LIMIT};
pub use find_value::{find_value, QUORUM};
pub use lookup::{run as run_lookup, LookupOutcome, StepOutcome, ALPHA, K, LOOKUP_TIMEOUT};
pub use ping_refresh::refresh_questionable_contacts;
pub use store_value::store_value;
