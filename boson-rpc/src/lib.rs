// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The RPC transport core: one UDP socket per address family, a transaction
//! table matching responses back to waiters, adaptive per-remote timeouts,
//! send throttling, inbound spam filtering, and a time-decaying blacklist.

mod blacklist;
mod error;
mod server;
mod throttle;
mod timeout;
mod txn;

pub use blacklist::{Blacklist, STRIKE_THRESHOLD};
pub use error::{Error, Result};
pub use server::{Inbound, RpcServer};
pub use throttle::{SendThrottle, SpamFilter, SPAM_RATE_THRESHOLD};
pub use timeout::{AdaptiveTimeouts, MAX_TIMEOUT, MIN_TIMEOUT};
pub use txn::{TransactionTable, BASE_TIMEOUT};
