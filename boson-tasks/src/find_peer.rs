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
    lookup::{self, StepOutcome, ALPHA, K, LOOKUP_TIMEOUT},
    wire_adapt::wire_node_to_contact,
};
use boson_core::{Id, PeerAnnounce};
use boson_routing::RoutingTable;
use boson_rpc::RpcServer;
use boson_wire::{
    messages::{FindPeerRequest, LookupResponse, WantFlags},
    Method,
};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;

/// Upper bound on the number of distinct peer-announce records a find-peer
/// task collects before it can end early.
pub const FIND_PEER_LIMIT: usize = 8;

/// Like find-node, but responses may also carry peer-announce records for
/// the target; a genuine record (signature verifies) is kept even if
/// multiple nodes return it.
pub async fn find_peer(
    routing: Arc<Mutex<RoutingTable>>,
    rpc: Arc<RpcServer>,
    local_id: Id,
    target: Id,
    cancel: CancelToken,
) -> Result<Vec<PeerAnnounce>> {
    let seen: Arc<Mutex<HashSet<(Id, [u8; 8])>>> = Arc::new(Mutex::new(HashSet::new()));
    let collected: Arc<Mutex<Vec<PeerAnnounce>>> = Arc::new(Mutex::new(Vec::new()));
    let collected_for_caller = collected.clone();

    lookup::run::<_, _, ()>(
        routing.as_ref(),
        target,
        ALPHA,
        K,
        LOOKUP_TIMEOUT,
        cancel,
        move |contact, cancel| {
            let rpc = rpc.clone();
            let seen = seen.clone();
            let collected = collected.clone();
            async move {
                let body = FindPeerRequest {
                    sender: local_id,
                    target,
                    want: WantFlags::new(true, true, false),
                };
                let response = tokio::select! {
                    _ = cancel.canceled() => return Err(Error::Cancelled),
                    result = rpc.request(contact.address, Some(contact.id), Method::FindPeer, &body) => result?,
                };
                let payload: LookupResponse = response.decode_body().map_err(boson_rpc::Error::from)?;
                let mut discovered = Vec::new();
                if let Some(nodes) = &payload.closest_ipv4 {
                    discovered.extend(nodes.iter().map(wire_node_to_contact));
                }
                if let Some(nodes) = &payload.closest_ipv6 {
                    discovered.extend(nodes.iter().map(wire_node_to_contact));
                }

                let mut done = false;
                if let Some(peers) = payload.peers {
                    for peer in peers {
                        if peer.id() != target || peer.verify().is_err() {
                            continue;
                        }
                        let key = (peer.id(), peer.fingerprint);
                        let mut seen = seen.lock().await;
                        if seen.insert(key) {
                            let mut collected = collected.lock().await;
                            collected.push(peer);
                            done = collected.len() >= FIND_PEER_LIMIT;
                        }
                    }
                }

                Ok(StepOutcome {
                    discovered,
                    payload: None,
                    done,
                    token: None,
                })
            }
        },
    )
    .await?;

    let mut guard = collected_for_caller.lock().await;
    Ok(std::mem::take(&mut *guard))
}
