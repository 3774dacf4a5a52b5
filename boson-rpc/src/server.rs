// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::{
    blacklist::Blacklist,
    error::{Error, Result},
    throttle::{SendThrottle, SpamFilter},
    timeout::AdaptiveTimeouts,
    txn::TransactionTable,
};
use boson_core::Id;
use boson_wire::{Envelope, MessageType, Method, MTU_BUDGET};
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::UdpSocket, sync::Mutex};
use tracing::{debug, trace, warn};

/// A decoded inbound datagram handed to the reactor: a response/error
/// delivered to an already-pending transaction never reaches here (the
/// transport layer resolves it internally); this is only emitted for
/// unmatched requests and unmatched responses/errors worth logging.
pub enum Inbound {
    Request {
        from: SocketAddr,
        txn_id: u32,
        version: Option<u32>,
        method: Method,
        envelope: Envelope,
    },
    Unmatched {
        from: SocketAddr,
        txn_id: u32,
    },
}

/// Owns one UDP socket and the transaction/throttle/spam-filter/blacklist
/// state for a single address family.
pub struct RpcServer {
    socket: UdpSocket,
    transactions: Mutex<TransactionTable>,
    send_throttle: Mutex<SendThrottle>,
    spam_filter: Mutex<SpamFilter>,
    blacklist: Mutex<Blacklist>,
    timeouts: Mutex<AdaptiveTimeouts>,
}

impl RpcServer {
    pub async fn bind(local_addr: SocketAddr) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(local_addr).await.map_err(Error::ReceiveFailed)?;
        Ok(Arc::new(Self {
            socket,
            transactions: Mutex::new(TransactionTable::new()),
            send_throttle: Mutex::new(SendThrottle::new()),
            spam_filter: Mutex::new(SpamFilter::new()),
            blacklist: Mutex::new(Blacklist::new()),
            timeouts: Mutex::new(AdaptiveTimeouts::new()),
        }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Error::ReceiveFailed)
    }

    /// Sends a request and awaits its matching response, respecting the
    /// send throttle and the remote's adaptive timeout.
    pub async fn request(
        &self,
        to: SocketAddr,
        expected_id: Option<Id>,
        method: Method,
        body: &impl serde::Serialize,
    ) -> Result<Envelope> {
        let timeout = self.timeouts.lock().await.timeout_for(&to.ip());
        let (txn_id, rx) = {
            let mut table = self.transactions.lock().await;
            table.begin(method, to, expected_id, timeout)?
        };
        let envelope = Envelope::request(method, txn_id, None, body)?;
        self.send(to, &envelope).await?;

        let started = std::time::Instant::now();
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(Ok(response))) => {
                self.timeouts.lock().await.record_rtt(to.ip(), started.elapsed());
                Ok(response)
            }
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_canceled)) => Err(Error::Canceled),
            Err(_elapsed) => {
                self.transactions.lock().await.cancel(txn_id);
                Err(Error::Timeout(to))
            }
        }
    }

    /// Sends an envelope, enforcing the MTU budget and the per-remote send
    /// throttle.
    pub async fn send(&self, to: SocketAddr, envelope: &Envelope) -> Result<()> {
        let bytes = envelope.encode()?;
        if bytes.len() > MTU_BUDGET {
            return Err(Error::Wire(boson_wire::Error::MessageTooLarge {
                actual: bytes.len(),
                max: MTU_BUDGET,
            }));
        }
        if !self.send_throttle.lock().await.try_consume(to.ip(), bytes.len()) {
            return Err(Error::Busy(to));
        }
        self.socket.send_to(&bytes, to).await.map_err(Error::SendFailed)?;
        Ok(())
    }

    /// Receives and decodes the next datagram, applying the blacklist and
    /// spam filter before full parsing and routing responses to their
    /// waiting transaction.
    pub async fn recv(&self) -> Result<Option<Inbound>> {
        let mut buf = [0u8; MTU_BUDGET];
        let (len, from) = self.socket.recv_from(&mut buf).await.map_err(Error::ReceiveFailed)?;

        if self.blacklist.lock().await.is_blacklisted(&from.ip()) {
            trace!(%from, "dropping datagram from blacklisted remote");
            return Ok(None);
        }
        if !self.spam_filter.lock().await.observe(from.ip()) {
            trace!(%from, "dropping datagram from remote over spam threshold");
            return Ok(None);
        }

        let envelope = match Envelope::decode(&buf[..len]) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%from, %err, "malformed datagram");
                self.blacklist.lock().await.strike(from.ip());
                return Ok(None);
            }
        };

        match envelope.kind {
            MessageType::Request => Ok(Some(Inbound::Request {
                from,
                txn_id: envelope.txn_id,
                version: envelope.version,
                method: envelope.method,
                envelope,
            })),
            MessageType::Response | MessageType::Error => {
                let txn_id = envelope.txn_id;
                let delivered = self.transactions.lock().await.complete(txn_id, from, None, envelope);
                if delivered {
                    Ok(None)
                } else {
                    debug!(%from, txn_id, "unmatched response, counting as suspicious");
                    Ok(Some(Inbound::Unmatched { from, txn_id }))
                }
            }
        }
    }

    /// Sweeps expired transactions, returning the addresses whose requests
    /// timed out so the caller can mark the routing-table contact failed.
    pub async fn sweep_timeouts(&self) -> Vec<SocketAddr> {
        let expired = self.transactions.lock().await.sweep_timeouts(std::time::Instant::now());
        expired.into_iter().map(|(_, addr)| addr).collect()
    }

    pub async fn strike_blacklist(&self, remote: SocketAddr) {
        self.blacklist.lock().await.strike(remote.ip());
    }

    pub async fn decay_blacklist(&self) {
        self.blacklist.lock().await.decay(std::time::Instant::now());
    }

    pub async fn pending_transaction_count(&self) -> usize {
        self.transactions.lock().await.len()
    }
}
