// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("socket send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("socket receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    #[error("socket closed")]
    SocketClosed,

    #[error(transparent)]
    Wire(#[from] boson_wire::Error),

    #[error("request to {0} timed out")]
    Timeout(std::net::SocketAddr),

    #[error("request canceled")]
    Canceled,

    #[error("no free transaction ids available")]
    TransactionTableFull,

    #[error("send throttled for remote {0}")]
    Busy(std::net::SocketAddr),
}
