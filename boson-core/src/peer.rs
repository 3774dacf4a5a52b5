// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::{
    error::{Error, Result},
    id::Id,
};
use boson_crypto::{KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::SystemTime};

/// Reachability as last observed for a contact, used by routing-table
/// admission and bucket-refresh policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reachability {
    /// Never exchanged a request/response with this contact.
    Unknown,
    /// Has replied to a request from us within the freshness window.
    Good,
    /// Has not replied recently but hasn't failed enough to be evicted yet.
    Questionable,
}

/// A known node in the routing table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeContact {
    pub id: Id,
    pub address: SocketAddr,
    pub last_seen: Option<SystemTime>,
    pub last_reply: Option<SystemTime>,
    pub failed_request_count: u32,
    pub reachability: Reachability,
    pub version: Option<String>,
}

impl NodeContact {
    pub fn new(id: Id, address: SocketAddr) -> Self {
        Self {
            id,
            address,
            last_seen: None,
            last_reply: None,
            failed_request_count: 0,
            reachability: Reachability::Unknown,
            version: None,
        }
    }

    pub fn mark_responded(&mut self, now: SystemTime) {
        self.last_seen = Some(now);
        self.last_reply = Some(now);
        self.failed_request_count = 0;
        self.reachability = Reachability::Good;
    }

    pub fn mark_sent(&mut self, now: SystemTime) {
        self.last_seen = Some(now);
    }

    pub fn mark_failed(&mut self) {
        self.failed_request_count += 1;
        if self.failed_request_count > 0 {
            self.reachability = Reachability::Questionable;
        }
    }
}

/// A signed claim binding a stable peer identity to a reachable network
/// endpoint, used to announce presence without re-proving node identity on
/// every lookup  `fingerprint`
/// disambiguates multiple announces under the same `peer_id`, e.g. distinct
/// services advertised by one key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAnnounce {
    pub peer_id: PublicKey,
    pub node_id: Id,
    pub fingerprint: [u8; 8],
    pub endpoint: String,
    pub metadata: Option<Vec<u8>>,
    pub signature: Signature,
}

impl PeerAnnounce {
    /// Builds and signs a new announce for `peer_id`'s owner, pointing at
    /// `node_id` serving `endpoint`.
    pub fn sign(
        keypair: &KeyPair,
        node_id: Id,
        fingerprint: [u8; 8],
        endpoint: impl Into<String>,
        metadata: Option<Vec<u8>>,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(Error::EmptyEndpoint);
        }
        let message = signing_message(&node_id, &fingerprint, &endpoint, metadata.as_deref());
        let signature = keypair.sign(&message);
        Ok(Self {
            peer_id: keypair.public_key(),
            node_id,
            fingerprint,
            endpoint,
            metadata,
            signature,
        })
    }

    /// The id this announce is stored/looked up under: the peer's public key.
    pub fn id(&self) -> Id {
        Id::from(self.peer_id)
    }

    pub fn verify(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(Error::EmptyEndpoint);
        }
        let message = signing_message(
            &self.node_id,
            &self.fingerprint,
            &self.endpoint,
            self.metadata.as_deref(),
        );
        boson_crypto::verify(&self.peer_id, &message, &self.signature)
            .map_err(|_| Error::InvalidPeerSignature)
    }
}

fn signing_message(node_id: &Id, fingerprint: &[u8; 8], endpoint: &str, metadata: Option<&[u8]>) -> Vec<u8> {
    let mut message = Vec::with_capacity(32 + 8 + endpoint.len() + metadata.map_or(0, <[u8]>::len));
    message.extend_from_slice(node_id.as_bytes());
    message.extend_from_slice(fingerprint);
    message.extend_from_slice(endpoint.as_bytes());
    if let Some(metadata) = metadata {
        message.extend_from_slice(metadata);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_transitions_on_response_and_failure() {
        let mut contact = NodeContact::new(Id::random(), "127.0.0.1:9090".parse().unwrap());
        assert_eq!(contact.reachability, Reachability::Unknown);

        contact.mark_failed();
        assert_eq!(contact.failed_request_count, 1);
        assert_eq!(contact.reachability, Reachability::Questionable);

        contact.mark_responded(SystemTime::now());
        assert_eq!(contact.failed_request_count, 0);
        assert_eq!(contact.reachability, Reachability::Good);
    }

    #[test]
    fn announce_round_trips_and_verifies() {
        let keypair = KeyPair::random();
        let node_id = Id::random();
        let announce = PeerAnnounce::sign(&keypair, node_id, [1; 8], "203.0.113.5:7070", None).unwrap();
        assert!(announce.verify().is_ok());
        assert_eq!(announce.id(), Id::from(keypair.public_key()));
    }

    #[test]
    fn announce_rejects_empty_endpoint() {
        let keypair = KeyPair::random();
        let err = PeerAnnounce::sign(&keypair, Id::random(), [0; 8], "", None).unwrap_err();
        assert!(matches!(err, Error::EmptyEndpoint));
    }

    #[test]
    fn announce_rejects_tampered_fingerprint() {
        let keypair = KeyPair::random();
        let mut announce = PeerAnnounce::sign(&keypair, Id::random(), [1; 8], "203.0.113.5:7070", None).unwrap();
        announce.fingerprint = [2; 8];
        assert!(matches!(announce.verify(), Err(Error::InvalidPeerSignature)));
    }
}
