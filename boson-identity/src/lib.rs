// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! The identifier layer: a two-tier cache plus publish/resolve flow for
//! signed [`Card`]s, sitting on top of the DHT core's `store`/`find-value`
//! primitives. Deliberately thin: no JSON-LD/VC object mapping lives here,
//! just sign/verify of a byte blob keyed by a public key.

mod cache;
mod card;
mod error;
mod resolver;
mod result;

pub use card::Card;
pub use error::{Error, Result};
pub use resolver::Resolver;
pub use result::{ResolutionMetadata, ResolutionResult, ResolutionStatus};
