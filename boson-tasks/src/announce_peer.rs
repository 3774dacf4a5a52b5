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
use boson_core::{Id, PeerAnnounce};
use boson_routing::RoutingTable;
use boson_rpc::RpcServer;
use boson_wire::{messages::AnnouncePeerRequest, Method};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Same acceptance rule as `store_value`
fn success_threshold(attempted: usize) -> usize {
    attempted.div_ceil(2)
}

/// Locates the peer id in the network and pushes the signed announce
/// record to the nodes closest to it, returning the number that accepted it.
pub async fn announce_peer(
    routing: Arc<Mutex<RoutingTable>>,
    rpc: Arc<RpcServer>,
    local_id: Id,
    announce: PeerAnnounce,
    cancel: CancelToken,
) -> Result<usize> {
    let target = announce.id();
    let (closest, tokens) = find_node_with_tokens(routing, rpc.clone(), local_id, target, cancel).await?;

    let announces = closest.into_iter().map(|contact| {
        let rpc = rpc.clone();
        let peer = announce.clone();
        let token = tokens.get(&contact.id).copied().unwrap_or(0);
        async move {
            let body = AnnouncePeerRequest {
                sender: local_id,
                token,
                peer_id: target,
                peer,
            };
            rpc.request(contact.address, Some(contact.id), Method::AnnouncePeer, &body)
                .await
        }
    });

    let results = join_all(announces).await;
    let attempted = results.len();
    let accepted = results.into_iter().filter(|result| result.is_ok()).count();
    debug!(%target, attempted, accepted, "announce-peer fan-out complete");
    if accepted < success_threshold(attempted) {
        return Err(Error::NotEnoughPeers);
    }
    Ok(accepted)
}
