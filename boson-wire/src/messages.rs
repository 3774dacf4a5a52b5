// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! Method-specific request/response bodies. These are decoded from an
//! [`crate::Envelope`]'s generic payload once the envelope's `method` field
//! is known to the caller.

use boson_core::{Id, PeerAnnounce, Value};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// `w` bitflags on lookup requests: bit0 = want ipv4, bit1 = want ipv6,
/// bit2 = want a store/announce token in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WantFlags(pub u8);

impl WantFlags {
    pub const IPV4: u8 = 0b001;
    pub const IPV6: u8 = 0b010;
    pub const TOKEN: u8 = 0b100;

    pub fn new(ipv4: bool, ipv6: bool, want_token: bool) -> Self {
        let mut bits = 0;
        if ipv4 {
            bits |= Self::IPV4;
        }
        if ipv6 {
            bits |= Self::IPV6;
        }
        if want_token {
            bits |= Self::TOKEN;
        }
        WantFlags(bits)
    }

    pub fn wants_ipv4(self) -> bool {
        self.0 & Self::IPV4 != 0
    }

    pub fn wants_ipv6(self) -> bool {
        self.0 & Self::IPV6 != 0
    }

    pub fn wants_token(self) -> bool {
        self.0 & Self::TOKEN != 0
    }
}

/// A contact as it appears on the wire: raw id/address/port rather than the
/// richer `boson_core::NodeContact` the routing table keeps internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireNode {
    pub id: Id,
    pub ip: IpAddr,
    pub port: u16,
}

/// Every request carries the sender's own id alongside its protocol-specific
/// body. Every request body below carries it under `i` so a responder can
/// learn of (and route a reply to) a node it has never queried itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingRequest {
    #[serde(rename = "i")]
    pub sender: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindNodeRequest {
    #[serde(rename = "i")]
    pub sender: Id,
    #[serde(rename = "t")]
    pub target: Id,
    #[serde(rename = "w")]
    pub want: WantFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindValueRequest {
    #[serde(rename = "i")]
    pub sender: Id,
    #[serde(rename = "t")]
    pub target: Id,
    #[serde(rename = "w")]
    pub want: WantFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindPeerRequest {
    #[serde(rename = "i")]
    pub sender: Id,
    #[serde(rename = "t")]
    pub target: Id,
    #[serde(rename = "w")]
    pub want: WantFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreValueRequest {
    #[serde(rename = "i")]
    pub sender: Id,
    #[serde(rename = "tok")]
    pub token: u32,
    #[serde(rename = "v")]
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncePeerRequest {
    #[serde(rename = "i")]
    pub sender: Id,
    #[serde(rename = "tok")]
    pub token: u32,
    #[serde(rename = "t")]
    pub peer_id: Id,
    #[serde(rename = "p")]
    pub peer: PeerAnnounce,
}

/// A general lookup response. Any subset of the fields may be present: a
/// find-node response carries only node lists; a find-value response may
/// carry node lists (if the value wasn't found at this hop) or a value (if
/// it was); a store/announce acknowledgement carries neither but may carry
/// `tok` if the request asked for one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupResponse {
    #[serde(rename = "n4", skip_serializing_if = "Option::is_none")]
    pub closest_ipv4: Option<Vec<WireNode>>,
    #[serde(rename = "n6", skip_serializing_if = "Option::is_none")]
    pub closest_ipv6: Option<Vec<WireNode>>,
    #[serde(rename = "v", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(rename = "p", skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<PeerAnnounce>>,
    #[serde(rename = "tok", skip_serializing_if = "Option::is_none")]
    pub token: Option<u32>,
}

/// The `e` payload: a numeric wire error code plus a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "c")]
    pub code: u16,
    #[serde(rename = "m")]
    pub message: String,
}

/// Numeric error codes carried in an `ErrorBody`.
pub mod error_code {
    pub const GENERIC: u16 = 201;
    pub const SERVER: u16 = 202;
    pub const PROTOCOL: u16 = 203;
    pub const METHOD_UNKNOWN: u16 = 204;
    pub const MESSAGE_TOO_BIG: u16 = 205;
    pub const THROTTLED: u16 = 206;
    pub const IMMUTABLE_SUBSTITUTION_FAIL: u16 = 301;
    pub const SEQ_NOT_MONOTONIC: u16 = 302;
    pub const SEQ_EXPECTED: u16 = 303;
    pub const INVALID_SIGNATURE: u16 = 304;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn want_flags_round_trip_bits() {
        let want = WantFlags::new(true, false, true);
        assert!(want.wants_ipv4());
        assert!(!want.wants_ipv6());
        assert!(want.wants_token());
    }

    #[test]
    fn lookup_response_omits_absent_fields_when_encoded() {
        let response = LookupResponse {
            closest_ipv4: Some(vec![]),
            ..Default::default()
        };
        let mut buf = Vec::new();
        ciborium::into_writer(&response, &mut buf).unwrap();
        let value: ciborium::value::Value = ciborium::from_reader(buf.as_slice()).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 1);
    }
}
