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
use boson_crypto::{KeyPair, Nonce, PublicKey, Signature, X25519PublicKey};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Values carry at most this many bytes of payload.
pub const MAX_VALUE_SIZE: usize = 1024;

/// A stored record. Immutable records are addressed by content hash;
/// mutable records are addressed by the signer's public key and carry a
/// monotonic sequence number so updates can be ordered and rejected when stale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Immutable { id: Id, data: Bytes },
    Mutable(MutableValue),
}

/// A signed, optionally encrypted, mutable record.
///
/// When `recipient` is `Some`, `data` holds an X25519 sealed box addressed to
/// that key rather than plaintext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableValue {
    pub public_key: PublicKey,
    pub recipient: Option<PublicKey>,
    pub nonce: Nonce,
    pub sequence_number: i64,
    pub signature: Signature,
    pub data: Bytes,
}

impl Value {
    /// The id under which this value is stored and looked up: `SHA-256(data)`
    /// for immutable values, the signer's public key for mutable ones.
    pub fn id(&self) -> Id {
        match self {
            Value::Immutable { id, .. } => *id,
            Value::Mutable(mv) => Id::from(mv.public_key),
        }
    }

    pub fn data(&self) -> &Bytes {
        match self {
            Value::Immutable { data, .. } => data,
            Value::Mutable(mv) => &mv.data,
        }
    }

    pub fn is_mutable(&self) -> bool {
        matches!(self, Value::Mutable(_))
    }

    pub fn sequence_number(&self) -> Option<i64> {
        match self {
            Value::Immutable { .. } => None,
            Value::Mutable(mv) => Some(mv.sequence_number),
        }
    }

    /// Builds and validates an immutable value, deriving its id from the data.
    pub fn immutable(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() > MAX_VALUE_SIZE {
            return Err(Error::DataTooLarge {
                actual: data.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        let id = Id::from_bytes(boson_crypto::sha256(&data));
        Ok(Value::Immutable { id, data })
    }

    /// Builds a signed, unencrypted mutable value owned by `keypair`.
    pub fn signed(keypair: &KeyPair, sequence_number: i64, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() > MAX_VALUE_SIZE {
            return Err(Error::DataTooLarge {
                actual: data.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        let nonce = Nonce::random();
        let signature = sign_mutable(keypair, None, &nonce, sequence_number, &data);
        Ok(Value::Mutable(MutableValue {
            public_key: keypair.public_key(),
            recipient: None,
            nonce,
            sequence_number,
            signature,
            data,
        }))
    }

    /// Builds a signed value whose payload is sealed to `recipient` with an
    /// X25519 box derived from `sender`'s Ed25519 seed.
    pub fn encrypted(
        sender: &KeyPair,
        recipient: &X25519PublicKey,
        sequence_number: i64,
        plaintext: &[u8],
    ) -> Result<Self> {
        let nonce = Nonce::random();
        let x25519_sender = boson_crypto::X25519KeyPair::derive_from(sender)?;
        let sealed = boson_crypto::seal(plaintext, &nonce, recipient, &x25519_sender)?;
        if sealed.len() > MAX_VALUE_SIZE {
            return Err(Error::DataTooLarge {
                actual: sealed.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        let data: Bytes = sealed.into();
        let recipient_id = PublicKey::from_bytes(*recipient.as_bytes());
        let signature = sign_mutable(sender, Some(&recipient_id), &nonce, sequence_number, &data);
        Ok(Value::Mutable(MutableValue {
            public_key: sender.public_key(),
            recipient: Some(recipient_id),
            nonce,
            sequence_number,
            signature,
            data,
        }))
    }

    /// Opens an encrypted mutable value's payload, given the recipient's
    /// Ed25519 keypair (the matching X25519 key is derived from it).
    pub fn open(&self, recipient: &KeyPair) -> Result<Vec<u8>> {
        let mv = match self {
            Value::Mutable(mv) if mv.recipient.is_some() => mv,
            _ => return Err(Error::ImmutableHasMutableFields),
        };
        let sender_x25519 = boson_crypto::X25519PublicKey::from(*mv.public_key.as_bytes());
        let recipient_x25519 = boson_crypto::X25519KeyPair::derive_from(recipient)?;
        let plaintext = boson_crypto::open(&mv.data, &mv.nonce, &sender_x25519, &recipient_x25519)?;
        Ok(plaintext)
    }

    /// Checks internal consistency: the right fields for the variant, the id
    /// matching its derivation, and (for mutable values) a valid signature.
    pub fn verify(&self) -> Result<()> {
        match self {
            Value::Immutable { id, data } => {
                if data.len() > MAX_VALUE_SIZE {
                    return Err(Error::DataTooLarge {
                        actual: data.len(),
                        max: MAX_VALUE_SIZE,
                    });
                }
                let expected = Id::from_bytes(boson_crypto::sha256(data));
                if *id != expected {
                    return Err(Error::IdDoesNotMatchDigest);
                }
                Ok(())
            }
            Value::Mutable(mv) => {
                if mv.data.len() > MAX_VALUE_SIZE {
                    return Err(Error::DataTooLarge {
                        actual: mv.data.len(),
                        max: MAX_VALUE_SIZE,
                    });
                }
                let message = signing_message(mv.recipient.as_ref(), &mv.nonce, mv.sequence_number, &mv.data);
                boson_crypto::verify(&mv.public_key, &message, &mv.signature)
                    .map_err(Error::InvalidSignature)
            }
        }
    }
}

fn signing_message(recipient: Option<&PublicKey>, nonce: &Nonce, sequence_number: i64, data: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(32 + 24 + 8 + data.len());
    if let Some(recipient) = recipient {
        message.extend_from_slice(recipient.as_bytes());
    }
    message.extend_from_slice(&nonce.0);
    message.extend_from_slice(&sequence_number.to_be_bytes());
    message.extend_from_slice(data);
    message
}

fn sign_mutable(
    keypair: &KeyPair,
    recipient: Option<&PublicKey>,
    nonce: &Nonce,
    sequence_number: i64,
    data: &[u8],
) -> Signature {
    let message = signing_message(recipient, nonce, sequence_number, data);
    keypair.sign(&message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immutable_value_verifies() {
        let value = Value::immutable(&b"hello world"[..]).unwrap();
        assert!(value.verify().is_ok());
    }

    #[test]
    fn immutable_value_rejects_tampered_id() {
        let value = Value::immutable(&b"hello world"[..]).unwrap();
        let tampered = match value {
            Value::Immutable { data, .. } => Value::Immutable { id: Id::random(), data },
            _ => unreachable!(),
        };
        assert!(matches!(tampered.verify(), Err(Error::IdDoesNotMatchDigest)));
    }

    #[test]
    fn signed_value_round_trips_and_verifies() {
        let keypair = KeyPair::random();
        let value = Value::signed(&keypair, 1, &b"payload"[..]).unwrap();
        assert!(value.verify().is_ok());
        assert_eq!(value.id(), Id::from(keypair.public_key()));
    }

    #[test]
    fn signed_value_rejects_wrong_signer() {
        let keypair = KeyPair::random();
        let other = KeyPair::random();
        let mut value = Value::signed(&keypair, 1, &b"payload"[..]).unwrap();
        if let Value::Mutable(mv) = &mut value {
            mv.public_key = other.public_key();
        }
        assert!(value.verify().is_err());
    }

    #[test]
    fn encrypted_value_round_trips() {
        let sender = KeyPair::random();
        let recipient = KeyPair::random();
        let recipient_x25519 = boson_crypto::X25519KeyPair::derive_from(&recipient).unwrap();
        let value = Value::encrypted(&sender, &recipient_x25519.public_key(), 1, b"secret").unwrap();
        assert!(value.verify().is_ok());
        let opened = value.open(&recipient).unwrap();
        assert_eq!(opened, b"secret");
    }

    #[test]
    fn oversized_data_is_rejected() {
        let data = vec![0u8; MAX_VALUE_SIZE + 1];
        assert!(matches!(
            Value::immutable(data),
            Err(Error::DataTooLarge { .. })
        ));
    }
}
