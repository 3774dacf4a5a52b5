// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The `Card`: a compact signed identity document keyed by its subject's
//! `Id`. It deliberately carries no credential/service object model — just
//! the opaque bytes the embedding DID layer serializes, plus the minimal
//! metadata (sequence number, signing time, deactivation flag) needed to
//! order and authenticate updates.
//!
//! A Card rides the DHT as the `data` of a mutable [`Value`] signed by the
//! subject's own key: there is no separate Card-level signature scheme.
//! Publishing and resolving a Card only ever needs `store(value)`,
//! `findValue(id)`, and `Signature.sign`/`verify`.

use crate::error::{Error, Result};
use boson_core::{Id, Value};
use boson_crypto::KeyPair;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// The envelope actually CBOR-encoded into a mutable `Value`'s `data` field.
/// `sequence_number` and the signature live on the `Value` itself; nothing
/// here duplicates them.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct CardEnvelope {
    signed_at: i64,
    deactivated: bool,
    payload: Vec<u8>,
}

/// An identity Card resolved from (or about to be published to) the DHT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub subject: Id,
    pub sequence_number: i64,
    pub signed_at: i64,
    pub deactivated: bool,
    pub payload: Bytes,
}

impl Card {
    /// Signs a fresh Card owned by `keypair` and wraps it as the mutable
    /// `Value` that `register` publishes.
    pub fn sign(
        keypair: &KeyPair,
        sequence_number: i64,
        signed_at: i64,
        deactivated: bool,
        payload: impl Into<Bytes>,
    ) -> Result<Value> {
        let envelope = CardEnvelope {
            signed_at,
            deactivated,
            payload: payload.into().to_vec(),
        };
        let mut encoded = Vec::new();
        ciborium::into_writer(&envelope, &mut encoded)?;
        Ok(Value::signed(keypair, sequence_number, encoded)?)
    }

    /// Recovers a Card from a DHT-resolved `Value`, verifying its signature.
    /// Fails with [`Error::NotACard`] if `value` is immutable (a Card is
    /// always keyed by its subject's public key).
    pub fn from_value(value: &Value) -> Result<Self> {
        value.verify()?;
        let Value::Mutable(mv) = value else {
            return Err(Error::NotACard);
        };
        let envelope: CardEnvelope = ciborium::from_reader(mv.data.as_ref())?;
        Ok(Card {
            subject: value.id(),
            sequence_number: mv.sequence_number,
            signed_at: envelope.signed_at,
            deactivated: envelope.deactivated,
            payload: envelope.payload.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_round_trips_through_a_value() {
        let keypair = KeyPair::random();
        let value = Card::sign(&keypair, 1, 1_700_000_000, false, &b"credentials-blob"[..]).unwrap();
        let card = Card::from_value(&value).unwrap();
        assert_eq!(card.subject, Id::from(keypair.public_key()));
        assert_eq!(card.sequence_number, 1);
        assert_eq!(card.signed_at, 1_700_000_000);
        assert!(!card.deactivated);
        assert_eq!(&card.payload[..], &b"credentials-blob"[..]);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let keypair = KeyPair::random();
        let mut value = Card::sign(&keypair, 1, 1, false, &b"x"[..]).unwrap();
        if let Value::Mutable(mv) = &mut value {
            mv.sequence_number = 2;
        }
        assert!(Card::from_value(&value).is_err());
    }

    #[test]
    fn immutable_value_is_not_a_card() {
        let value = Value::immutable(&b"not a card"[..]).unwrap();
        assert!(matches!(Card::from_value(&value), Err(Error::NotACard)));
    }
}
