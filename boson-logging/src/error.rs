// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use thiserror::Error;

pub(super) type Result<T, E = Error> = std::result::Result<T, E>;

/// Internal error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not configure logging: {0}")]
    LoggingConfiguration(String),
}
