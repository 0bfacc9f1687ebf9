//! Shared primitive types: hashes, key ids, payout scripts and network
//! parameters.

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

pub type Hash256 = [u8; 32];

/// Raw bytes of a masternode public key, used as the registry map key
pub type PubKeyBytes = [u8; 32];

/// 160-bit key id: the first 20 bytes of SHA256 over the public key
pub type KeyId = [u8; 20];

pub fn key_id(pub_key: &VerifyingKey) -> KeyId {
    let digest = Sha256::digest(pub_key.as_bytes());
    let mut id = [0u8; 20];
    id.copy_from_slice(&digest[..20]);
    id
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Regtest,
}

impl NetworkType {
    pub fn default_p2p_port(&self) -> u16 {
        match self {
            NetworkType::Mainnet => 24000,
            NetworkType::Testnet => 24100,
            NetworkType::Regtest => 24200,
        }
    }
}

/// Where block-reward shares for a masternode are sent.
///
/// Holds the raw pubkey-hash payload; the derived script is only the
/// standard 25-byte pay-to-pubkey-hash form when the payload is 20 bytes,
/// which is exactly what broadcast validation enforces.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayoutAddress {
    hash: Vec<u8>,
}

impl PayoutAddress {
    pub fn from_key_id(id: KeyId) -> Self {
        Self { hash: id.to_vec() }
    }

    pub fn from_pubkey(pub_key: &VerifyingKey) -> Self {
        Self::from_key_id(key_id(pub_key))
    }

    /// Parse the operator-supplied payout address (lowercase hex of the
    /// pubkey hash). Malformed input yields an address whose script fails
    /// the standard-size check downstream rather than an error here.
    pub fn parse(s: &str) -> Self {
        Self {
            hash: hex::decode(s).unwrap_or_default(),
        }
    }

    /// Scriptpubkey paying this address: OP_DUP OP_HASH160 <hash>
    /// OP_EQUALVERIFY OP_CHECKSIG
    pub fn script(&self) -> Vec<u8> {
        let mut script = Vec::with_capacity(self.hash.len() + 5);
        script.push(0x76); // OP_DUP
        script.push(0xa9); // OP_HASH160
        script.push(self.hash.len() as u8);
        script.extend_from_slice(&self.hash);
        script.push(0x88); // OP_EQUALVERIFY
        script.push(0xac); // OP_CHECKSIG
        script
    }

    pub fn hash_bytes(&self) -> &[u8] {
        &self.hash
    }
}

impl fmt::Display for PayoutAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.hash))
    }
}

/// Scriptpubkey paying a masternode key directly (p2pkh over its key id)
pub fn script_for_key_id(id: &KeyId) -> Vec<u8> {
    PayoutAddress::from_key_id(*id).script()
}

/// Address policy for announced endpoints: IPv4, routable and reachable.
/// The regression-test network accepts anything.
pub fn is_valid_net_addr(addr: &SocketAddr, network: NetworkType) -> bool {
    if network == NetworkType::Regtest {
        return true;
    }
    match addr.ip() {
        IpAddr::V4(ip) => {
            !ip.is_loopback()
                && !ip.is_unspecified()
                && !ip.is_broadcast()
                && !ip.is_link_local()
                && !ip.is_private()
                && !ip.is_documentation()
        }
        IpAddr::V6(_) => false,
    }
}

/// Canonical textual form of an endpoint for signed messages: the port is
/// omitted when it equals the network default, so re-announcing on the
/// default port hashes identically across nodes.
pub fn addr_string(addr: &SocketAddr, default_port: u16) -> String {
    if addr.port() == default_port {
        addr.ip().to_string()
    } else {
        addr.to_string()
    }
}
