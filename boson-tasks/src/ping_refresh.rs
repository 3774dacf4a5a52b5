// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::error::Result;
use boson_core::{Id, Reachability};
use boson_routing::RoutingTable;
use boson_rpc::RpcServer;
use boson_wire::{messages::PingRequest, Method};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Pings every contact the table currently considers questionable, updating
/// each one's reachability from the result.
pub async fn refresh_questionable_contacts(
    routing: Arc<Mutex<RoutingTable>>,
    rpc: Arc<RpcServer>,
    local_id: Id,
) -> Result<usize> {
    let targets: Vec<_> = {
        let table = routing.lock().await;
        table
            .all_contacts()
            .into_iter()
            .filter(|contact| contact.reachability == Reachability::Questionable)
            .collect()
    };

    let pings = targets.iter().map(|contact| {
        let rpc = rpc.clone();
        let contact = contact.clone();
        async move {
            let result = rpc
                .request(
                    contact.address,
                    Some(contact.id),
                    Method::Ping,
                    &PingRequest { sender: local_id },
                )
                .await;
            (contact.id, result.is_ok())
        }
    });

    let results = join_all(pings).await;
    let mut table = routing.lock().await;
    let mut refreshed = 0;
    for (id, responded) in results {
        if responded {
            table.mark_responded(&id);
            refreshed += 1;
        } else {
            table.mark_failed(&id);
        }
    }
    debug!(probed = targets.len(), refreshed, "questionable-contact ping sweep complete");
    Ok(refreshed)
}
