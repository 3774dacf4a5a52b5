// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! CBOR wire codec for the Boson protocol: the self-describing message
//! envelope (`y`/`m`/`t`/`v`/`q`/`r`/`e`), compact single-letter field
//! mapping for method-specific bodies, and MTU-budget size accounting.

mod envelope;
mod error;
pub mod messages;

pub use envelope::{Envelope, MessageType, Method, MTU_BUDGET};
pub use error::{Error, Result};
