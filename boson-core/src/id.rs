// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use boson_crypto::PublicKey;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};

/// A 32-byte opaque identifier. Doubles as an Ed25519 public key whenever it
/// names a mutable record holder, a signed peer key, or a node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id(pub [u8; 32]);

impl Id {
    pub const LEN: usize = 32;

    pub const ZERO: Id = Id([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        boson_crypto::random_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base58(self) -> String {
        PublicKey::from_bytes(self.0).to_base58()
    }

    /// XOR metric: `distance(a, b) = a XOR b`.
    pub fn distance(&self, other: &Id) -> Id {
        let mut out = [0u8; 32];
        for i in 0..32 {
            out[i] = self.0[i] ^ other.0[i];
        }
        Id(out)
    }

    /// Index of the most-significant differing bit, `0..=255`, counted from
    /// the MSB of byte 0. `None` if `self == other` (no differing bit).
    pub fn prefix_distance(&self, other: &Id) -> Option<u16> {
        for (byte_index, (a, b)) in self.0.iter().zip(other.0.iter()).enumerate() {
            let diff = a ^ b;
            if diff != 0 {
                let leading = diff.leading_zeros(); // 0..=7
                return Some((byte_index as u16) * 8 + leading as u16);
            }
        }
        None
    }

    /// Number of leading bits shared between `self` and `other`, `0..=256`.
    pub fn shared_prefix_bits(&self, other: &Id) -> u16 {
        match self.prefix_distance(other) {
            Some(bit_index) => bit_index,
            None => 256,
        }
    }

    /// `true` if `self` falls within the bucket range `[low_bits, high_bits)`
    /// counted as shared-prefix-length against `owner`: i.e. the bucket that
    /// covers ids sharing at least `low_bits` prefix bits with `owner` but
    /// fewer than `high_bits`. `high_bits == 256` (the own-prefix bucket,
    /// the only range that can reach the full id length) is treated as a
    /// closed upper bound so `owner` itself — `shared_prefix_bits == 256` —
    /// falls inside its own bucket instead of matching no bucket at all.
    pub fn in_prefix_range(&self, owner: &Id, low_bits: u16, high_bits: u16) -> bool {
        let shared = owner.shared_prefix_bits(self);
        if high_bits >= 256 {
            shared >= low_bits
        } else {
            shared >= low_bits && shared < high_bits
        }
    }
}

impl From<PublicKey> for Id {
    fn from(pk: PublicKey) -> Self {
        Id(*pk.as_bytes())
    }
}

impl From<Id> for PublicKey {
    fn from(id: Id) -> Self {
        PublicKey::from_bytes(id.0)
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic ordering over the raw bytes, used to break distance ties
///
impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({}..)", &self.to_base58()[..8.min(self.to_base58().len())])
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

/// Orders candidate ids by ascending XOR distance to `target`, breaking ties
/// by the smaller id (lexicographic).
pub fn sort_by_distance<T>(target: &Id, items: &mut [T], id_of: impl Fn(&T) -> Id) {
    items.sort_by(|a, b| {
        let da = target.distance(&id_of(a));
        let db = target.distance(&id_of(b));
        da.cmp(&db).then_with(|| id_of(a).cmp(&id_of(b)))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn distance_self_is_zero() {
        let id = Id::random();
        assert_eq!(id.distance(&id), Id::ZERO);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Id::random();
        let b = Id::random();
        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn prefix_distance_of_equal_ids_is_none() {
        let id = Id::random();
        assert_eq!(id.prefix_distance(&id), None);
    }

    #[test]
    fn prefix_distance_matches_manual_bit_scan() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        a[3] = 0b0000_1000;
        b[3] = 0b0000_0000;
        let ia = Id(a);
        let ib = Id(b);
        // byte 3 spans bits 24..32; 0b0000_1000 has its set bit at position 4 from msb
        assert_eq!(ia.prefix_distance(&ib), Some(3 * 8 + 4));
    }

    proptest! {
        #[test]
        fn distance_is_always_symmetric_prop(a in any::<[u8; 32]>(), b in any::<[u8; 32]>()) {
            let ia = Id(a);
            let ib = Id(b);
            prop_assert_eq!(ia.distance(&ib), ib.distance(&ia));
        }

        #[test]
        fn distance_to_self_is_always_zero_prop(a in any::<[u8; 32]>()) {
            let ia = Id(a);
            prop_assert_eq!(ia.distance(&ia), Id::ZERO);
        }
    }
}
