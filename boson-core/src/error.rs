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
    #[error("value data is {actual} bytes, exceeding the {max} byte limit")]
    DataTooLarge { actual: usize, max: usize },

    #[error("signature on a mutable value does not verify under its own public key")]
    InvalidSignature(#[from] boson_crypto::Error),

    #[error("an immutable value must not carry a public key, nonce or signature")]
    ImmutableHasMutableFields,

    #[error("a mutable value's id must equal its public key")]
    IdDoesNotMatchPublicKey,

    #[error("an immutable value's id must equal SHA-256(data)")]
    IdDoesNotMatchDigest,

    #[error("peer-announce signature does not verify under the peer id")]
    InvalidPeerSignature,

    #[error("endpoint string is empty")]
    EmptyEndpoint,
}
