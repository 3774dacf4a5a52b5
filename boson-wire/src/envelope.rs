// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::error::{Error, Result};
use ciborium::value::Value;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Outgoing datagrams must fit within this many payload bytes.
pub const MTU_BUDGET: usize = 1200;

/// The `y` field: request, response, or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Request,
    Response,
    Error,
}

impl Serialize for MessageType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let code: u8 = match self {
            MessageType::Request => 0,
            MessageType::Response => 1,
            MessageType::Error => 2,
        };
        serializer.serialize_u8(code)
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = u8::deserialize(deserializer)?;
        match code {
            0 => Ok(MessageType::Request),
            1 => Ok(MessageType::Response),
            2 => Ok(MessageType::Error),
            other => Err(serde::de::Error::custom(format!(
                "unexpected integer {other} for MessageType"
            ))),
        }
    }
}

/// The `m` field: request/response method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Ping,
    FindNode,
    AnnouncePeer,
    FindPeer,
    FindValue,
    StoreValue,
}

impl Method {
    pub fn code(self) -> u8 {
        match self {
            Method::Ping => 0,
            Method::FindNode => 1,
            Method::AnnouncePeer => 2,
            Method::FindPeer => 3,
            Method::FindValue => 4,
            Method::StoreValue => 5,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            0 => Method::Ping,
            1 => Method::FindNode,
            2 => Method::AnnouncePeer,
            3 => Method::FindPeer,
            4 => Method::FindValue,
            5 => Method::StoreValue,
            other => return Err(Error::UnknownMethod(other)),
        })
    }
}

impl Serialize for Method {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = u8::deserialize(deserializer)?;
        Method::from_code(code).map_err(|_| serde::de::Error::custom(format!("unexpected integer {code} for Method")))
    }
}

/// The self-describing message envelope. `payload`
/// holds the `q`/`r`/`e` body as a generic CBOR value; call
/// [`Envelope::decode_body`] to interpret it as a concrete, method-specific
/// type once `method` is known.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub kind: MessageType,
    pub method: Method,
    pub txn_id: u32,
    pub version: Option<u32>,
    pub payload: Value,
}

impl Envelope {
    pub fn request(method: Method, txn_id: u32, version: Option<u32>, body: &impl Serialize) -> Result<Self> {
        Ok(Self {
            kind: MessageType::Request,
            method,
            txn_id,
            version,
            payload: Value::serialized(body)?,
        })
    }

    pub fn response(method: Method, txn_id: u32, version: Option<u32>, body: &impl Serialize) -> Result<Self> {
        Ok(Self {
            kind: MessageType::Response,
            method,
            txn_id,
            version,
            payload: Value::serialized(body)?,
        })
    }

    pub fn error(method: Method, txn_id: u32, version: Option<u32>, body: &impl Serialize) -> Result<Self> {
        Ok(Self {
            kind: MessageType::Error,
            method,
            txn_id,
            version,
            payload: Value::serialized(body)?,
        })
    }

    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T> {
        self.payload
            .deserialized()
            .map_err(|err| Error::Malformed(err.to_string()))
    }

    /// Serializes to CBOR, refusing anything past the MTU budget.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(128);
        ciborium::into_writer(&WireEnvelope::from(self), &mut buf)?;
        if buf.len() > MTU_BUDGET {
            return Err(Error::MessageTooLarge {
                actual: buf.len(),
                max: MTU_BUDGET,
            });
        }
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MTU_BUDGET {
            return Err(Error::MessageTooLarge {
                actual: bytes.len(),
                max: MTU_BUDGET,
            });
        }
        let wire: WireEnvelope = ciborium::from_reader(bytes)?;
        wire.try_into()
    }

    /// Upper bound on the encoded size without actually serializing,
    /// used by callers that need to trim a response body to fit the
    /// MTU budget before committing to an encode.
    pub fn estimated_size(&self) -> usize {
        // A cheap, conservative estimate: re-encode into a scratch buffer.
        // CBOR has no O(1) size-estimation primitive.
        let mut buf = Vec::with_capacity(128);
        ciborium::into_writer(&WireEnvelope::from(self), &mut buf).map(|_| buf.len()).unwrap_or(usize::MAX)
    }
}

/// The on-the-wire shape of [`Envelope`]: a CBOR map with single-letter keys.
/// Kept as a private derive-based mirror so the public `Envelope` can use a
/// friendlier, non-renamed field layout while this type owns the compact
/// encoding.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    y: MessageType,
    m: Method,
    t: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    v: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    r: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    e: Option<Value>,
}

impl From<&Envelope> for WireEnvelope {
    fn from(env: &Envelope) -> Self {
        let mut wire = WireEnvelope {
            y: env.kind,
            m: env.method,
            t: env.txn_id,
            v: env.version,
            q: None,
            r: None,
            e: None,
        };
        match env.kind {
            MessageType::Request => wire.q = Some(env.payload.clone()),
            MessageType::Response => wire.r = Some(env.payload.clone()),
            MessageType::Error => wire.e = Some(env.payload.clone()),
        }
        wire
    }
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = Error;

    fn try_from(wire: WireEnvelope) -> Result<Self> {
        let payload = match wire.y {
            MessageType::Request => wire.q,
            MessageType::Response => wire.r,
            MessageType::Error => wire.e,
        }
        .unwrap_or(Value::Null);
        Ok(Envelope {
            kind: wire.y,
            method: wire.m,
            txn_id: wire.t,
            version: wire.v,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::PingRequest;
    use boson_core::Id;

    #[test]
    fn request_round_trips_through_bytes() {
        let envelope = Envelope::request(
            Method::Ping,
            42,
            Some(7),
            &PingRequest { sender: Id::random() },
        )
        .unwrap();
        let bytes = envelope.encode().unwrap();
        let decoded = Envelope::decode(&bytes).unwrap();
        assert_eq!(decoded.kind, MessageType::Request);
        assert_eq!(decoded.method, Method::Ping);
        assert_eq!(decoded.txn_id, 42);
        assert_eq!(decoded.version, Some(7));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let big = vec![0u8; MTU_BUDGET * 2];
        let envelope = Envelope::request(Method::StoreValue, 1, None, &big).unwrap();
        assert!(matches!(envelope.encode(), Err(Error::MessageTooLarge { .. })));
    }
}
