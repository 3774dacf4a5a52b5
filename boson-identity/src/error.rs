// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Identifier-layer errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] boson_core::Error),

    #[error(transparent)]
    Node(#[from] boson_node::Error),

    #[error("card payload is not valid CBOR: {0}")]
    Malformed(#[from] ciborium::de::Error<std::io::Error>),

    #[error("card payload could not be encoded as CBOR: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("value has no signature or public key; a Card must be a signed mutable value")]
    NotACard,
}
