// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! X25519 sealed boxes for the "encrypted" Value variant : a
//! signed mutable record whose `data` is a box sealed from the publisher's
//! key to a named recipient.

use crate::error::{Error, Result};
use crate::keys::KeyPair;
use aes_gcm_siv::{
    aead::{Aead, KeyInit},
    Aes256GcmSiv,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret as XStaticSecret};

/// Random value mixed into both the AEAD nonce and the mutable-record
/// signature payload (`nonce ∥ seq ∥ data`). Boson inherits libsodium's
/// 24-byte `crypto_box` nonce size; only the first 12 bytes are fed to
/// AES-256-GCM-SIV, whose nonce is 96 bits.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce(pub [u8; 24]);

impl Nonce {
    pub fn random() -> Self {
        let mut bytes = [0u8; 24];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn aead_nonce(&self) -> [u8; 12] {
        let mut n = [0u8; 12];
        n.copy_from_slice(&self.0[..12]);
        n
    }
}

/// An X25519 public key, derived from a Boson [`PublicKey`](crate::keys::PublicKey)
/// holder's own Ed25519 seed via HKDF, never transmitted on its own.
pub struct X25519KeyPair {
    secret: XStaticSecret,
}

const HKDF_INFO: &[u8] = b"boson-x25519-v1";

impl X25519KeyPair {
    /// Derives an X25519 keypair from an Ed25519 identity keypair. Ed25519 and
    /// X25519 scalars are not interchangeable, so Boson expands the Ed25519
    /// seed through HKDF-SHA256 rather than reusing it directly.
    pub fn derive_from(keypair: &KeyPair) -> Result<Self> {
        let hk = Hkdf::<Sha256>::new(None, &keypair.seed_bytes());
        let mut expanded = [0u8; 32];
        hk.expand(HKDF_INFO, &mut expanded)
            .map_err(|_| Error::KeyDerivation)?;
        Ok(Self {
            secret: XStaticSecret::from(expanded),
        })
    }

    pub fn public_key(&self) -> XPublicKey {
        XPublicKey::from(&self.secret)
    }
}

/// Seals `plaintext` from `sender` to `recipient`: computes an X25519 shared
/// secret, derives a symmetric key via HKDF-SHA256, and encrypts with
/// AES-256-GCM-SIV under `nonce`.
pub fn seal(
    plaintext: &[u8],
    nonce: &Nonce,
    recipient: &XPublicKey,
    sender: &X25519KeyPair,
) -> Result<Vec<u8>> {
    let cipher = derive_cipher(&sender.secret, recipient)?;
    cipher
        .encrypt(&nonce.aead_nonce().into(), plaintext)
        .map_err(|_| Error::SealOpenFailed)
}

/// Opens a box sealed by [`seal`]; `sender` is the counterparty's public key
/// and `recipient` is the local X25519 keypair the box was addressed to.
pub fn open(
    sealed: &[u8],
    nonce: &Nonce,
    sender: &XPublicKey,
    recipient: &X25519KeyPair,
) -> Result<Vec<u8>> {
    let cipher = derive_cipher(&recipient.secret, sender)?;
    cipher
        .decrypt(&nonce.aead_nonce().into(), sealed)
        .map_err(|_| Error::SealOpenFailed)
}

fn derive_cipher(local_secret: &XStaticSecret, remote_public: &XPublicKey) -> Result<Aes256GcmSiv> {
    let shared = local_secret.diffie_hellman(remote_public);
    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut key = [0u8; 32];
    hk.expand(HKDF_INFO, &mut key)
        .map_err(|_| Error::KeyDerivation)?;
    Aes256GcmSiv::new_from_slice(&key).map_err(|_| Error::KeyDerivation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trips() {
        let sender_id = KeyPair::random();
        let recipient_id = KeyPair::random();
        let sender_box = X25519KeyPair::derive_from(&sender_id).unwrap();
        let recipient_box = X25519KeyPair::derive_from(&recipient_id).unwrap();

        let nonce = Nonce::random();
        let plaintext = b"a secret value payload";
        let sealed = seal(plaintext, &nonce, &recipient_box.public_key(), &sender_box).unwrap();
        let opened = open(&sealed, &nonce, &sender_box.public_key(), &recipient_box).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn wrong_recipient_fails_to_open() {
        let sender_id = KeyPair::random();
        let recipient_id = KeyPair::random();
        let stranger_id = KeyPair::random();
        let sender_box = X25519KeyPair::derive_from(&sender_id).unwrap();
        let recipient_box = X25519KeyPair::derive_from(&recipient_id).unwrap();
        let stranger_box = X25519KeyPair::derive_from(&stranger_id).unwrap();

        let nonce = Nonce::random();
        let sealed = seal(b"hi", &nonce, &recipient_box.public_key(), &sender_box).unwrap();
        assert!(open(&sealed, &nonce, &sender_box.public_key(), &stranger_box).is_err());
    }
}
