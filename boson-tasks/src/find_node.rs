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
use boson_core::{Id, NodeContact};
use boson_routing::RoutingTable;
use boson_rpc::RpcServer;
use boson_wire::{
    messages::{FindNodeRequest, LookupResponse, WantFlags},
    Method,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

/// The plain iterative lookup: no per-response payload beyond the closer nodes it returns.
pub async fn find_node(
    routing: Arc<Mutex<RoutingTable>>,
    rpc: Arc<RpcServer>,
    local_id: Id,
    target: Id,
    cancel: CancelToken,
) -> Result<Vec<NodeContact>> {
    let (closest, _tokens) = find_node_inner(routing, rpc, local_id, target, false, cancel).await?;
    Ok(closest)
}

/// Same lookup, but asks each replying node for a write token
/// , returned alongside
/// the closest set so a subsequent store-value/announce-peer can present
/// the right token back to each node without a second round trip.
pub async fn find_node_with_tokens(
    routing: Arc<Mutex<RoutingTable>>,
    rpc: Arc<RpcServer>,
    local_id: Id,
    target: Id,
    cancel: CancelToken,
) -> Result<(Vec<NodeContact>, HashMap<Id, u32>)> {
    find_node_inner(routing, rpc, local_id, target, true, cancel).await
}

async fn find_node_inner(
    routing: Arc<Mutex<RoutingTable>>,
    rpc: Arc<RpcServer>,
    local_id: Id,
    target: Id,
    want_token: bool,
    cancel: CancelToken,
) -> Result<(Vec<NodeContact>, HashMap<Id, u32>)> {
    let outcome = lookup::run::<_, _, ()>(
        routing.as_ref(),
        target,
        ALPHA,
        K,
        LOOKUP_TIMEOUT,
        cancel,
        move |contact, cancel| {
            let rpc = rpc.clone();
            async move {
                let body = FindNodeRequest {
                    sender: local_id,
                    target,
                    want: WantFlags::new(true, true, want_token),
                };
                let response = tokio::select! {
                    _ = cancel.canceled() => return Err(Error::Cancelled),
                    result = rpc.request(contact.address, Some(contact.id), Method::FindNode, &body) => result?,
                };
                let payload: LookupResponse = response.decode_body().map_err(boson_rpc::Error::from)?;
                let mut discovered = Vec::new();
                if let Some(nodes) = &payload.closest_ipv4 {
                    discovered.extend(nodes.iter().map(wire_node_to_contact));
                }
                if let Some(nodes) = &payload.closest_ipv6 {
                    discovered.extend(nodes.iter().map(wire_node_to_contact));
                }
                Ok(StepOutcome::continuing_with_token(discovered, payload.token))
            }
        },
    )
    .await?;
    Ok((outcome.closest, outcome.tokens))
}
