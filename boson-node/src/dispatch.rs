// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! Responder side of the wire protocol: decodes an inbound request, updates
//! the routing table with the sender, performs the method-specific action
//! against storage, and replies.

use crate::{stack::Stack, token::TokenManager};
use boson_core::{Id, NodeContact, PeerAnnounce};
use boson_crypto::KeyPair;
use boson_storage::Storage;
use boson_wire::{
    messages::{
        error_code, AnnouncePeerRequest, ErrorBody, FindNodeRequest, FindPeerRequest, FindValueRequest, LookupResponse,
        PingRequest, PingResponse, StoreValueRequest, WantFlags, WireNode,
    },
    Envelope, Method,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Decodes, services, and replies to one inbound request. Never propagates an
/// error to the caller: every failure becomes either a wire error reply or a
/// dropped datagram — the RPC server never throws into the reactor.
#[allow(clippy::too_many_arguments)]
pub async fn handle_request(
    stack: &Arc<Stack>,
    storage: &Arc<dyn Storage>,
    tokens: &Arc<Mutex<TokenManager>>,
    _local_id: Id,
    _keypair: &Arc<KeyPair>,
    from: SocketAddr,
    txn_id: u32,
    version: Option<u32>,
    method: Method,
    envelope: Envelope,
) {
    let body_result = match method {
        Method::Ping => respond_ping(stack, &envelope, from, txn_id, version).await,
        Method::FindNode => respond_find_node(stack, tokens, &envelope, from, txn_id, version).await,
        Method::FindValue => respond_find_value(stack, storage, tokens, &envelope, from, txn_id, version).await,
        Method::FindPeer => respond_find_peer(stack, storage, &envelope, from, txn_id, version).await,
        Method::StoreValue => respond_store_value(stack, storage, tokens, &envelope, from, txn_id, version).await,
        Method::AnnouncePeer => respond_announce_peer(stack, storage, tokens, &envelope, from, txn_id, version).await,
    };

    let outgoing = match body_result {
        Ok(env) => env,
        Err((code, message)) => {
            debug!(%from, ?method, code, %message, "replying with wire error");
            match Envelope::error(method, txn_id, version, &ErrorBody { code, message }) {
                Ok(env) => env,
                Err(err) => {
                    warn!(%err, "failed to build error envelope");
                    return;
                }
            }
        }
    };
    if let Err(err) = stack.rpc.send(from, &outgoing).await {
        warn!(%from, %err, "failed to send response");
    }
}

async fn record_sender(stack: &Arc<Stack>, sender: Id, from: SocketAddr) {
    let mut table = stack.routing.lock().await;
    table.insert(NodeContact::new(sender, from));
    table.mark_responded(&sender);
}

fn decode<T: serde::de::DeserializeOwned>(envelope: &Envelope) -> Result<T, (u16, String)> {
    envelope.decode_body().map_err(|err| (error_code::PROTOCOL, err.to_string()))
}

fn build(method: Method, txn_id: u32, version: Option<u32>, body: &impl serde::Serialize) -> Result<Envelope, (u16, String)> {
    Envelope::response(method, txn_id, version, body).map_err(|err| (error_code::GENERIC, err.to_string()))
}

async fn respond_ping(stack: &Arc<Stack>, envelope: &Envelope, from: SocketAddr, txn_id: u32, version: Option<u32>) -> Result<Envelope, (u16, String)> {
    let body: PingRequest = decode(envelope)?;
    record_sender(stack, body.sender, from).await;
    build(Method::Ping, txn_id, version, &PingResponse {})
}

async fn respond_find_node(
    stack: &Arc<Stack>,
    tokens: &Arc<Mutex<TokenManager>>,
    envelope: &Envelope,
    from: SocketAddr,
    txn_id: u32,
    version: Option<u32>,
) -> Result<Envelope, (u16, String)> {
    let body: FindNodeRequest = decode(envelope)?;
    record_sender(stack, body.sender, from).await;

    let closest = {
        let table = stack.routing.lock().await;
        table.closest(&body.target, boson_routing::K)
    };
    let mut response = lookup_response(stack, &closest, body.want, None, None);
    if body.want.wants_token() {
        response.token = Some(tokens.lock().await.generate(from, &body.target));
    }
    build(Method::FindNode, txn_id, version, &response)
}

async fn respond_find_value(
    stack: &Arc<Stack>,
    storage: &Arc<dyn Storage>,
    tokens: &Arc<Mutex<TokenManager>>,
    envelope: &Envelope,
    from: SocketAddr,
    txn_id: u32,
    version: Option<u32>,
) -> Result<Envelope, (u16, String)> {
    let body: FindValueRequest = decode(envelope)?;
    record_sender(stack, body.sender, from).await;

    let stored = storage.get_value(&body.target).await.map_err(server_err)?;
    let closest = {
        let table = stack.routing.lock().await;
        table.closest(&body.target, boson_routing::K)
    };
    let mut response = lookup_response(stack, &closest, body.want, stored, None);
    if body.want.wants_token() {
        response.token = Some(tokens.lock().await.generate(from, &body.target));
    }
    build(Method::FindValue, txn_id, version, &response)
}

async fn respond_find_peer(
    stack: &Arc<Stack>,
    storage: &Arc<dyn Storage>,
    envelope: &Envelope,
    from: SocketAddr,
    txn_id: u32,
    version: Option<u32>,
) -> Result<Envelope, (u16, String)> {
    let body: FindPeerRequest = decode(envelope)?;
    record_sender(stack, body.sender, from).await;

    let entries = storage
        .get_peers(&body.target, 0, boson_tasks::FIND_PEER_LIMIT)
        .await
        .map_err(server_err)?;
    let peers: Vec<PeerAnnounce> = entries.into_iter().map(|entry| entry.peer).collect();
    let closest = {
        let table = stack.routing.lock().await;
        table.closest(&body.target, boson_routing::K)
    };
    let response = lookup_response(stack, &closest, body.want, None, Some(peers));
    build(Method::FindPeer, txn_id, version, &response)
}

async fn respond_store_value(
    stack: &Arc<Stack>,
    storage: &Arc<dyn Storage>,
    tokens: &Arc<Mutex<TokenManager>>,
    envelope: &Envelope,
    from: SocketAddr,
    txn_id: u32,
    version: Option<u32>,
) -> Result<Envelope, (u16, String)> {
    let body: StoreValueRequest = decode(envelope)?;
    record_sender(stack, body.sender, from).await;

    let target = body.value.id();
    if !tokens.lock().await.verify(from, &target, body.token) {
        return Err((error_code::PROTOCOL, "invalid or expired write token".into()));
    }
    if let Err(err) = body.value.verify() {
        return Err((error_code::INVALID_SIGNATURE, err.to_string()));
    }
    storage.put_value(body.value, false, None).await.map_err(storage_err)?;
    build(Method::StoreValue, txn_id, version, &LookupResponse::default())
}

async fn respond_announce_peer(
    stack: &Arc<Stack>,
    storage: &Arc<dyn Storage>,
    tokens: &Arc<Mutex<TokenManager>>,
    envelope: &Envelope,
    from: SocketAddr,
    txn_id: u32,
    version: Option<u32>,
) -> Result<Envelope, (u16, String)> {
    let body: AnnouncePeerRequest = decode(envelope)?;
    record_sender(stack, body.sender, from).await;

    if !tokens.lock().await.verify(from, &body.peer_id, body.token) {
        return Err((error_code::PROTOCOL, "invalid or expired write token".into()));
    }
    if body.peer.id() != body.peer_id || body.peer.verify().is_err() {
        return Err((error_code::INVALID_SIGNATURE, "peer-announce signature does not verify".into()));
    }
    storage.put_peers(vec![body.peer], false).await.map_err(storage_err)?;
    build(Method::AnnouncePeer, txn_id, version, &LookupResponse::default())
}

/// Fills the `LookupResponse` slots appropriate to this stack's own address
/// family and trims the closest-node list to the MTU budget.
fn lookup_response(
    stack: &Arc<Stack>,
    closest: &[NodeContact],
    want: WantFlags,
    value: Option<boson_core::Value>,
    peers: Option<Vec<PeerAnnounce>>,
) -> LookupResponse {
    let wire_nodes: Vec<WireNode> = closest.iter().map(contact_to_wire_node).collect();
    let mut response = LookupResponse {
        closest_ipv4: None,
        closest_ipv6: None,
        value,
        peers,
        token: None,
    };
    match stack.family {
        crate::stack::Family::V4 if want.wants_ipv4() => response.closest_ipv4 = Some(wire_nodes),
        crate::stack::Family::V6 if want.wants_ipv6() => response.closest_ipv6 = Some(wire_nodes),
        _ => {}
    }
    trim_to_budget(&mut response);
    response
}

fn contact_to_wire_node(contact: &NodeContact) -> WireNode {
    WireNode {
        id: contact.id,
        ip: contact.address.ip(),
        port: contact.address.port(),
    }
}

fn trim_to_budget(response: &mut LookupResponse) {
    while estimated_len(response) > boson_wire::MTU_BUDGET - 64 {
        let popped = response
            .closest_ipv4
            .as_mut()
            .filter(|v| !v.is_empty())
            .map(|v| v.pop())
            .or_else(|| response.closest_ipv6.as_mut().filter(|v| !v.is_empty()).map(|v| v.pop()));
        if popped.is_none() {
            break;
        }
    }
}

fn estimated_len(response: &LookupResponse) -> usize {
    let mut buf = Vec::with_capacity(256);
    ciborium::into_writer(response, &mut buf).map(|_| buf.len()).unwrap_or(0)
}

fn server_err(err: boson_storage::Error) -> (u16, String) {
    (error_code::SERVER, err.to_string())
}

fn storage_err(err: boson_storage::Error) -> (u16, String) {
    use boson_storage::Error as E;
    match err {
        E::ImmutableSubstitution => (error_code::IMMUTABLE_SUBSTITUTION_FAIL, err.to_string()),
        E::SeqNotMonotonic { .. } => (error_code::SEQ_NOT_MONOTONIC, err.to_string()),
        E::SeqNotExpected { .. } => (error_code::SEQ_EXPECTED, err.to_string()),
        E::InvalidSignature(_) => (error_code::INVALID_SIGNATURE, err.to_string()),
        other => (error_code::SERVER, other.to_string()),
    }
}
