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
use boson_core::{Id, Value};
use boson_routing::RoutingTable;
use boson_rpc::RpcServer;
use boson_wire::{
    messages::{FindValueRequest, LookupResponse, WantFlags},
    Method,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

/// A genuine value is accepted once this many distinct responding nodes
/// agree on the same `(id, seq, signature)` for a mutable value.
pub const QUORUM: usize = 3;

/// Responses may carry a value; the first genuine value wins (signature
/// verifies, highest seq if multiple versions collide). The lookup ends
/// early once a value is found and either it is immutable or a quorum of
/// responders agree on the same `(id, seq, signature)`.
pub async fn find_value(
    routing: Arc<Mutex<RoutingTable>>,
    rpc: Arc<RpcServer>,
    local_id: Id,
    target: Id,
    cancel: CancelToken,
) -> Result<Option<Value>> {
    let votes: Arc<Mutex<HashMap<(Id, i64, [u8; 64]), (Value, usize)>>> = Arc::new(Mutex::new(HashMap::new()));

    let outcome = lookup::run::<_, _, Value>(
        routing.as_ref(),
        target,
        ALPHA,
        K,
        LOOKUP_TIMEOUT,
        cancel,
        move |contact, cancel| {
            let rpc = rpc.clone();
            let votes = votes.clone();
            async move {
                let body = FindValueRequest {
                    sender: local_id,
                    target,
                    want: WantFlags::new(true, true, false),
                };
                let response = tokio::select! {
                    _ = cancel.canceled() => return Err(Error::Cancelled),
                    result = rpc.request(contact.address, Some(contact.id), Method::FindValue, &body) => result?,
                };
                let payload: LookupResponse = response.decode_body().map_err(boson_rpc::Error::from)?;
                let mut discovered = Vec::new();
                if let Some(nodes) = &payload.closest_ipv4 {
                    discovered.extend(nodes.iter().map(wire_node_to_contact));
                }
                if let Some(nodes) = &payload.closest_ipv6 {
                    discovered.extend(nodes.iter().map(wire_node_to_contact));
                }

                let Some(value) = payload.value else {
                    return Ok(StepOutcome::continuing(discovered));
                };
                if value.verify().is_err() {
                    return Ok(StepOutcome::continuing(discovered));
                }
                match &value {
                    Value::Immutable { .. } => Ok(StepOutcome::finished(discovered, value)),
                    Value::Mutable(mv) => {
                        let key = (value.id(), mv.sequence_number, mv.signature.0);
                        let mut votes = votes.lock().await;
                        let entry = votes.entry(key).or_insert_with(|| (value.clone(), 0));
                        entry.1 += 1;
                        if entry.1 >= QUORUM {
                            Ok(StepOutcome::finished(discovered, entry.0.clone()))
                        } else {
                            Ok(StepOutcome::continuing(discovered))
                        }
                    }
                }
            }
        },
    )
    .await?;

    // Prefer the highest-sequence mutable value if more than one distinct
    // version collected a quorum before the lookup ended.
    Ok(outcome
        .payloads
        .into_iter()
        .max_by_key(|v| v.sequence_number().unwrap_or(i64::MAX)))
}
