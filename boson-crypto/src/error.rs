// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Internal error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Signature did not verify against the given public key")]
    InvalidSignature,

    #[error("Expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Sealed box could not be opened: wrong key, nonce or corrupted ciphertext")]
    SealOpenFailed,

    #[error("base58 decode failed: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("key derivation failed")]
    KeyDerivation,
}
