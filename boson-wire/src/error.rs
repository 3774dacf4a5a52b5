// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Wire codec errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("encoded message is {actual} bytes, exceeding the {max} byte MTU budget")]
    MessageTooLarge { actual: usize, max: usize },

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("unknown method code {0}")]
    UnknownMethod(u8),

    #[error("unknown message type code {0}")]
    UnknownMessageType(u8),
}

impl From<ciborium::de::Error<std::io::Error>> for Error {
    fn from(err: ciborium::de::Error<std::io::Error>) -> Self {
        Error::Malformed(err.to_string())
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(err: ciborium::ser::Error<std::io::Error>) -> Self {
        Error::Malformed(err.to_string())
    }
}
