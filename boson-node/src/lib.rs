// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The node runtime: bootstrap, per-address-family reactors, the token
//! manager, and periodic maintenance.

mod config;
mod dispatch;
mod error;
mod maintenance;
mod node;
mod stack;
mod token;

pub use config::{BootstrapSeed, NodeBuilder, NodeConfig, DEFAULT_PEER_TTL, DEFAULT_VALUE_TTL, REPUBLISH_INTERVAL};
pub use error::{Error, Result};
pub use node::Node;
pub use stack::{Family, Stack};
pub use token::{TokenManager, TOKEN_EPOCH};
