// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! Node construction: gather explicit settings into a [`NodeConfig`], then
//! [`NodeBuilder::build_and_run`] spawns the reactor(s) and hands back a
//! running node.

use crate::{error::Result, node::Node};
use boson_crypto::KeyPair;
use std::{net::SocketAddr, time::Duration};

/// Republish interval for owned records.
pub const REPUBLISH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default TTL for non-persistent value records before a purge sweeps them.
pub const DEFAULT_VALUE_TTL: Duration = Duration::from_secs(60 * 60);

/// Default TTL for non-persistent peer-announce records.
pub const DEFAULT_PEER_TTL: Duration = Duration::from_secs(60 * 60);

/// A seed contact used only at bootstrap to discover the rest of the network.
#[derive(Clone, Debug)]
pub struct BootstrapSeed {
    pub id: Option<boson_core::Id>,
    pub address: SocketAddr,
}

/// Explicit construction parameters for a [`Node`].
/// Building one never reads a config file; every value is provided by the
/// embedding application.
pub struct NodeConfig {
    pub(crate) keypair: KeyPair,
    pub(crate) ipv4_bind: Option<SocketAddr>,
    pub(crate) ipv6_bind: Option<SocketAddr>,
    pub(crate) bootstrap_seeds: Vec<BootstrapSeed>,
    pub(crate) value_ttl: Duration,
    pub(crate) peer_ttl: Duration,
}

/// Builds a [`NodeConfig`] then a running [`Node`]: assembles a `Node`
/// from explicit fields before spawning its reactor.
pub struct NodeBuilder {
    keypair: KeyPair,
    ipv4_bind: Option<SocketAddr>,
    ipv6_bind: Option<SocketAddr>,
    bootstrap_seeds: Vec<BootstrapSeed>,
    value_ttl: Duration,
    peer_ttl: Duration,
}

impl NodeBuilder {
    /// Starts a builder for a node identified by `keypair`'s public key.
    /// Neither address family is bound until [`Self::ipv4`]/[`Self::ipv6`]
    /// is called; at least one must be before [`Self::build_and_run`].
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            keypair,
            ipv4_bind: None,
            ipv6_bind: None,
            bootstrap_seeds: Vec::new(),
            value_ttl: DEFAULT_VALUE_TTL,
            peer_ttl: DEFAULT_PEER_TTL,
        }
    }

    pub fn ipv4(mut self, bind: SocketAddr) -> Self {
        self.ipv4_bind = Some(bind);
        self
    }

    pub fn ipv6(mut self, bind: SocketAddr) -> Self {
        self.ipv6_bind = Some(bind);
        self
    }

    pub fn bootstrap_seeds(mut self, seeds: Vec<BootstrapSeed>) -> Self {
        self.bootstrap_seeds = seeds;
        self
    }

    pub fn value_ttl(mut self, ttl: Duration) -> Self {
        self.value_ttl = ttl;
        self
    }

    pub fn peer_ttl(mut self, ttl: Duration) -> Self {
        self.peer_ttl = ttl;
        self
    }

    fn into_config(self) -> NodeConfig {
        NodeConfig {
            keypair: self.keypair,
            ipv4_bind: self.ipv4_bind,
            ipv6_bind: self.ipv6_bind,
            bootstrap_seeds: self.bootstrap_seeds,
            value_ttl: self.value_ttl,
            peer_ttl: self.peer_ttl,
        }
    }

    /// Binds the configured address-family stacks, opens `storage`, spawns
    /// one reactor per stack, and runs bootstrap against the configured seeds.
    pub async fn build_and_run(self, storage: std::sync::Arc<dyn boson_storage::Storage>) -> Result<Node> {
        let config = self.into_config();
        Node::build_and_run(config, storage).await
    }
}
