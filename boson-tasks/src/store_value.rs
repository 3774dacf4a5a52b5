// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::{
    cancel::CancelToken,
    error::{Error, Result},
    find_node::find_node_with_tokens,
};
use boson_core::{Id, Value};
use boson_routing::RoutingTable;
use boson_rpc::RpcServer;
use boson_wire::{messages::StoreValueRequest, Method};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// A store succeeds once this fraction of the k closest nodes to the
/// value's id acknowledge it.
fn success_threshold(attempted: usize) -> usize {
    attempted.div_ceil(2)
}

/// Locates the value's id in the network and pushes it to the nodes
/// closest to it, returning the number of nodes that accepted it.
///
/// The token presented to each node is the one it handed back during the
/// find-node pass that located it ;
/// a node this lookup never queried directly (learned only as a
/// closest-nodes entry in someone else's response) has no captured token
/// and is sent `0`, which that node's token manager will simply reject.
pub async fn store_value(
    routing: Arc<Mutex<RoutingTable>>,
    rpc: Arc<RpcServer>,
    local_id: Id,
    value: Value,
    cancel: CancelToken,
) -> Result<usize> {
    let target = value.id();
    let (closest, tokens) = find_node_with_tokens(routing, rpc.clone(), local_id, target, cancel).await?;

    let stores = closest.into_iter().map(|contact| {
        let rpc = rpc.clone();
        let value = value.clone();
        let token = tokens.get(&contact.id).copied().unwrap_or(0);
        async move {
            let body = StoreValueRequest {
                sender: local_id,
                token,
                value,
            };
            rpc.request(contact.address, Some(contact.id), Method::StoreValue, &body)
                .await
        }
    });

    let results = join_all(stores).await;
    let attempted = results.len();
    let accepted = results.into_iter().filter(|result| result.is_ok()).count();
    debug!(%target, attempted, accepted, "store-value fan-out complete");
    if accepted < success_threshold(attempted) {
        return Err(Error::NotEnoughPeers);
    }
    Ok(accepted)
}
