// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Node-runtime errors, composing every lower-tier crate's error via `#[from]`
///
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rpc(#[from] boson_rpc::Error),

    #[error(transparent)]
    Wire(#[from] boson_wire::Error),

    #[error(transparent)]
    Storage(#[from] boson_storage::Error),

    #[error(transparent)]
    Task(#[from] boson_tasks::Error),

    #[error(transparent)]
    Core(#[from] boson_core::Error),

    #[error("no address family stack is configured")]
    NoStackConfigured,

    #[error("bootstrap seed {0} did not respond to ping")]
    BootstrapUnreachable(std::net::SocketAddr),

    #[error("not enough peers accepted the write to call it a success")]
    NotEnoughPeers,
}
