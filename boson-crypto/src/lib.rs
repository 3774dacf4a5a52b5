// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! Cryptographic primitives backing the Boson data model: Ed25519 sign/verify,
//! X25519 sealed boxes, nonces, random bytes, base58, and SHA-256.

mod crypto_box;
mod error;
mod hash;
mod keys;

pub use self::{
    crypto_box::{open, seal, Nonce, X25519KeyPair},
    error::{Error, Result},
    hash::sha256,
    keys::{verify, KeyPair, PublicKey, Signature},
};

pub use x25519_dalek::PublicKey as X25519PublicKey;

/// Fills `buf` with cryptographically secure random bytes.
pub fn random_bytes(buf: &mut [u8]) {
    use rand::RngCore;
    rand::rngs::OsRng.fill_bytes(buf);
}
