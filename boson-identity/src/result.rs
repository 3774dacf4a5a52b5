// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::card::Card;

/// Outcome discriminant of a [`crate::Resolver::resolve`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionStatus {
    Success,
    Invalid,
    NotFound,
    UnsupportedRepresentation,
    UnsupportedMethod,
}

/// Timestamps and flags describing a resolved Card's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ResolutionMetadata {
    /// `signed_at` of the first version of this Card this resolver has seen, if known.
    pub created: Option<i64>,
    /// `signed_at` of the resolved version.
    pub updated: Option<i64>,
    /// Unix-seconds timestamp this resolution completed.
    pub resolved: i64,
    pub deactivated: bool,
    /// The Card's `sequence_number`.
    pub version: i64,
}

/// The result of resolving an identifier: a status, the resolved Card (if
/// any), and lifecycle metadata about that resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionResult {
    pub status: ResolutionStatus,
    pub payload: Option<Card>,
    pub metadata: ResolutionMetadata,
}

impl ResolutionResult {
    pub fn not_found(resolved: i64) -> Self {
        ResolutionResult {
            status: ResolutionStatus::NotFound,
            payload: None,
            metadata: ResolutionMetadata {
                resolved,
                ..Default::default()
            },
        }
    }

    pub fn invalid(resolved: i64) -> Self {
        ResolutionResult {
            status: ResolutionStatus::Invalid,
            payload: None,
            metadata: ResolutionMetadata {
                resolved,
                ..Default::default()
            },
        }
    }

    pub fn success(card: Card, resolved: i64, created: Option<i64>) -> Self {
        let metadata = ResolutionMetadata {
            created: created.or(Some(card.signed_at)),
            updated: Some(card.signed_at),
            resolved,
            deactivated: card.deactivated,
            version: card.sequence_number,
        };
        ResolutionResult {
            status: ResolutionStatus::Success,
            payload: Some(card),
            metadata,
        }
    }
}
