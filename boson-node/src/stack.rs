// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! One address family's share of a node: its own routing table and its own
//! RPC server. `boson-tasks`' lookup functions
//! each take a single routing table and a single RPC server, so a dual-stack
//! node runs one of these per family rather than one unified table.

use boson_core::Id;
use boson_routing::RoutingTable;
use boson_rpc::RpcServer;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;

/// Which address family a [`Stack`] serves, so the dispatch layer knows
/// whether to answer lookup requests under `n4` or `n6`
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

pub struct Stack {
    pub family: Family,
    pub routing: Arc<Mutex<RoutingTable>>,
    pub rpc: Arc<RpcServer>,
}

impl Stack {
    pub async fn bind(local_id: Id, bind_addr: SocketAddr) -> crate::error::Result<Self> {
        let family = match bind_addr {
            SocketAddr::V4(_) => Family::V4,
            SocketAddr::V6(_) => Family::V6,
        };
        let rpc = RpcServer::bind(bind_addr).await?;
        Ok(Self {
            family,
            routing: Arc::new(Mutex::new(RoutingTable::new(local_id))),
            rpc,
        })
    }
}
