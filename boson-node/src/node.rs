// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The running node: owns one [`Stack`] per configured address family, the
//! shared storage handle, and the [`TokenManager`], and drives a reactor
//! task plus a maintenance task for each stack.

use crate::{
    config::NodeConfig,
    dispatch,
    error::{Error, Result},
    maintenance,
    stack::Stack,
    token::TokenManager,
};
use boson_core::Id;
use boson_crypto::KeyPair;
use boson_rpc::Inbound;
use boson_storage::Storage;
use boson_tasks::CancelToken;
use boson_wire::messages::PingRequest;
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{info, warn};

/// A running Boson node. Dropping this does not stop its background tasks;
/// call [`Node::shutdown`] to do that cooperatively.
pub struct Node {
    local_id: Id,
    keypair: Arc<KeyPair>,
    ipv4: Option<Arc<Stack>>,
    ipv6: Option<Arc<Stack>>,
    storage: Arc<dyn Storage>,
    tokens: Arc<Mutex<TokenManager>>,
    cancel: CancelToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    pub fn local_id(&self) -> Id {
        self.local_id
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn ipv4(&self) -> Option<&Arc<Stack>> {
        self.ipv4.as_ref()
    }

    pub fn ipv6(&self) -> Option<&Arc<Stack>> {
        self.ipv6.as_ref()
    }

    /// Picks whichever stack is configured, preferring IPv4, for a caller
    /// that doesn't care which address family carries a lookup.
    pub fn any_stack(&self) -> Arc<Stack> {
        self.ipv4
            .clone()
            .or_else(|| self.ipv6.clone())
            .expect("build_and_run refuses to construct a Node with no stacks")
    }

    /// Builds the configured stacks, opens storage, bootstraps against the
    /// configured seeds, and spawns the reactor and maintenance tasks
    ///
    pub(crate) async fn build_and_run(config: NodeConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        storage.initialize(config.value_ttl, config.peer_ttl).await?;

        let local_id = Id::from(config.keypair.public_key());
        let keypair = Arc::new(config.keypair);

        let ipv4 = match config.ipv4_bind {
            Some(addr) => Some(Arc::new(Stack::bind(local_id, addr).await?)),
            None => None,
        };
        let ipv6 = match config.ipv6_bind {
            Some(addr) => Some(Arc::new(Stack::bind(local_id, addr).await?)),
            None => None,
        };
        if ipv4.is_none() && ipv6.is_none() {
            return Err(Error::NoStackConfigured);
        }

        let node = Node {
            local_id,
            keypair,
            ipv4,
            ipv6,
            storage,
            tokens: Arc::new(Mutex::new(TokenManager::new())),
            cancel: CancelToken::new(),
            handles: Mutex::new(Vec::new()),
        };

        for stack in node.stacks() {
            node.bootstrap(&stack, &config.bootstrap_seeds).await;
        }

        let mut handles = Vec::new();
        for stack in node.stacks() {
            handles.push(node.spawn_reactor(stack.clone()));
            handles.push(node.spawn_maintenance(stack));
        }
        *node.handles.lock().await = handles;

        Ok(node)
    }

    fn stacks(&self) -> Vec<Arc<Stack>> {
        self.ipv4.iter().chain(self.ipv6.iter()).cloned().collect()
    }

    /// Pings each configured seed in turn; the first reply seeds the
    /// routing table and triggers a self-lookup to populate nearby buckets
    ///
    async fn bootstrap(&self, stack: &Arc<Stack>, seeds: &[crate::config::BootstrapSeed]) {
        let matching_family = seeds.iter().filter(|seed| stack_accepts(stack, seed.address));
        let mut bootstrapped = false;
        for seed in matching_family {
            let body = PingRequest { sender: self.local_id };
            match stack.rpc.request(seed.address, seed.id, boson_wire::Method::Ping, &body).await {
                Ok(_response) => {
                    if let Some(id) = seed.id {
                        let mut table = stack.routing.lock().await;
                        let contact = boson_core::NodeContact::new(id, seed.address);
                        table.insert(contact);
                        table.mark_responded(&id);
                    }
                    bootstrapped = true;
                }
                Err(err) => warn!(seed = %seed.address, %err, "bootstrap seed did not respond"),
            }
        }
        if bootstrapped {
            info!(local_id = %self.local_id, "bootstrap succeeded, running self-lookup");
            let _ = boson_tasks::find_node(
                stack.routing.clone(),
                stack.rpc.clone(),
                self.local_id,
                self.local_id,
                self.cancel.clone(),
            )
            .await;
        } else if !seeds.is_empty() {
            warn!("no bootstrap seed responded; starting with an empty routing table");
        }
    }

    fn spawn_reactor(&self, stack: Arc<Stack>) -> JoinHandle<()> {
        let storage = self.storage.clone();
        let tokens = self.tokens.clone();
        let keypair = self.keypair.clone();
        let local_id = self.local_id;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.canceled() => break,
                    received = stack.rpc.recv() => {
                        match received {
                            Ok(Some(Inbound::Request { from, txn_id, version, method, envelope })) => {
                                dispatch::handle_request(
                                    &stack, &storage, &tokens, local_id, &keypair,
                                    from, txn_id, version, method, envelope,
                                )
                                .await;
                            }
                            Ok(Some(Inbound::Unmatched { from, txn_id })) => {
                                tracing::debug!(%from, txn_id, "ignoring unmatched response");
                            }
                            Ok(None) => {}
                            Err(err) => {
                                warn!(%err, "reactor receive error");
                            }
                        }
                    }
                }
            }
        })
    }

    fn spawn_maintenance(&self, stack: Arc<Stack>) -> JoinHandle<()> {
        let local_id = self.local_id;
        let storage = self.storage.clone();
        let tokens = self.tokens.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            maintenance::run(stack, storage, tokens, local_id, cancel).await;
        })
    }

    /// Looks up `target`'s value across the network via whichever stack is
    /// available, returning the highest-sequence accepted record if any.
    pub async fn find_value(&self, target: Id) -> Result<Option<boson_core::Value>> {
        let stack = self.any_stack();
        Ok(boson_tasks::find_value(stack.routing.clone(), stack.rpc.clone(), self.local_id, target, self.cancel.clone()).await?)
    }

    /// Publishes `value` to the k nodes closest to its id
    ///
    pub async fn store_value(&self, value: boson_core::Value) -> Result<usize> {
        let stack = self.any_stack();
        Ok(boson_tasks::store_value(stack.routing.clone(), stack.rpc.clone(), self.local_id, value, self.cancel.clone()).await?)
    }

    /// Publishes a peer-announce record to the k nodes closest to its id
    ///
    pub async fn announce_peer(&self, announce: boson_core::PeerAnnounce) -> Result<usize> {
        let stack = self.any_stack();
        Ok(boson_tasks::announce_peer(stack.routing.clone(), stack.rpc.clone(), self.local_id, announce, self.cancel.clone()).await?)
    }

    /// Locates peer-announce records for `target` across the network
    ///
    pub async fn find_peer(&self, target: Id) -> Result<Vec<boson_core::PeerAnnounce>> {
        let stack = self.any_stack();
        Ok(boson_tasks::find_peer(stack.routing.clone(), stack.rpc.clone(), self.local_id, target, self.cancel.clone()).await?)
    }

    /// Cancels all background tasks and aborts their handles.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}

fn stack_accepts(stack: &Arc<Stack>, addr: std::net::SocketAddr) -> bool {
    matches!(
        (stack.family, addr),
        (crate::stack::Family::V4, std::net::SocketAddr::V4(_)) | (crate::stack::Family::V6, std::net::SocketAddr::V6(_))
    )
}
