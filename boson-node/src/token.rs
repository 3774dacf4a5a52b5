// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! Anti-spoofing write tokens. A responder hands a token out with a
//! find-node/find-value/find-peer response when the requester asked for one;
//! a subsequent store-value/announce-peer from the same address must present
//! it back, proving the writer actually performed a lookup through this node
//! rather than forging the write off-path.

use boson_core::Id;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::net::SocketAddr;

/// How often the node rotates its token secret.
pub const TOKEN_EPOCH: std::time::Duration = std::time::Duration::from_secs(5 * 60);

type HmacSha256 = Hmac<Sha256>;

/// Holds the current and immediately-previous HMAC secrets so a token minted
/// just before a rotation is still accepted for one more epoch.
pub struct TokenManager {
    current: [u8; 32],
    previous: [u8; 32],
}

impl TokenManager {
    pub fn new() -> Self {
        Self {
            current: random_secret(),
            previous: random_secret(),
        }
    }

    /// Mints a token for `requester` looking up `target`, derived from the
    /// current secret.
    pub fn generate(&self, requester: SocketAddr, target: &Id) -> u32 {
        token_for(&self.current, requester, target)
    }

    /// Accepts a token minted under either the current or the immediately
    /// prior secret.
    pub fn verify(&self, requester: SocketAddr, target: &Id, token: u32) -> bool {
        token_for(&self.current, requester, target) == token
            || token_for(&self.previous, requester, target) == token
    }

    /// Advances the epoch: the current secret becomes the grace-period
    /// secret, and a fresh one is drawn.
    pub fn rotate(&mut self) {
        self.previous = self.current;
        self.current = random_secret();
    }
}

impl Default for TokenManager {
    fn default() -> Self {
        Self::new()
    }
}

fn random_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    boson_crypto::random_bytes(&mut secret);
    secret
}

fn token_for(secret: &[u8; 32], requester: SocketAddr, target: &Id) -> u32 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC accepts any key length");
    match requester {
        SocketAddr::V4(addr) => {
            mac.update(&addr.ip().octets());
            mac.update(&addr.port().to_be_bytes());
        }
        SocketAddr::V6(addr) => {
            mac.update(&addr.ip().octets());
            mac.update(&addr.port().to_be_bytes());
        }
    }
    mac.update(target.as_bytes());
    let digest = mac.finalize().into_bytes();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "203.0.113.9:7070".parse().unwrap()
    }

    #[test]
    fn token_verifies_under_current_secret() {
        let manager = TokenManager::new();
        let target = Id::random();
        let token = manager.generate(addr(), &target);
        assert!(manager.verify(addr(), &target, token));
    }

    #[test]
    fn token_from_prior_epoch_still_verifies_once() {
        let mut manager = TokenManager::new();
        let target = Id::random();
        let token = manager.generate(addr(), &target);
        manager.rotate();
        assert!(manager.verify(addr(), &target, token));
        manager.rotate();
        assert!(!manager.verify(addr(), &target, token));
    }

    #[test]
    fn token_is_scoped_to_requester_and_target() {
        let manager = TokenManager::new();
        let target = Id::random();
        let token = manager.generate(addr(), &target);
        let other_addr: SocketAddr = "203.0.113.10:7070".parse().unwrap();
        assert!(!manager.verify(other_addr, &target, token));
        assert!(!manager.verify(addr(), &Id::random(), token));
    }
}
