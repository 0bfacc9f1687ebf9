//! Wire records and their signatures.
//!
//! Canonical serialization is bincode over the structs below; field
//! declaration order is the wire order and must not change, because relay
//! hashes derived here propagate through inventory messages on every node.
//!
//! Signed messages are NOT the wire form: they are fixed ASCII
//! concatenations (decimal integers, lowercase hex) so that every
//! implementation derives byte-identical strings.

use crate::constants::lifecycle::NEW_START_REQUIRED_SECONDS;
use crate::error::{RejectReason, Rejection};
use crate::types::{addr_string, key_id, Hash256, NetworkType, PayoutAddress};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;

/// Inventory tags for relayed lifecycle messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvKind {
    MasternodeAnnounce,
    MasternodePing,
    MasternodeVerify,
}

/// An inventory announcement handed to the peer layer for relay
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inv {
    pub kind: InvKind,
    pub hash: Hash256,
}

/// Derive a keypair from the operator-supplied secret (lowercase hex of
/// the 32-byte seed).
pub fn keys_from_secret(secret: &str) -> Result<(SigningKey, VerifyingKey), Rejection> {
    let bytes = hex::decode(secret).map_err(|_| RejectReason::KeyFromSecretFailed)?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|_| RejectReason::KeyFromSecretFailed)?;
    let signing = SigningKey::from_bytes(&seed);
    let verifying = signing.verifying_key();
    Ok((signing, verifying))
}

/// Sign an ASCII message and check the signature against our own public
/// key before handing it out. Signing is stateless; a failed round-trip is
/// a hard error, never a silently bad signature on the wire.
pub fn sign_message(key: &SigningKey, message: &str) -> Result<Signature, Rejection> {
    let sig = key.sign(message.as_bytes());
    verify_message(&key.verifying_key(), &sig, message)?;
    Ok(sig)
}

pub fn verify_message(
    pub_key: &VerifyingKey,
    sig: &Signature,
    message: &str,
) -> Result<(), Rejection> {
    pub_key
        .verify(message.as_bytes(), sig)
        .map_err(|_| RejectReason::BadSignature.into())
}

fn zero_signature() -> Signature {
    Signature::from_bytes(&[0u8; 64])
}

/// Signed identity fields shared by a masternode entry and its broadcast.
/// Declaration order is the broadcast wire order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub addr: SocketAddr,
    pub pub_key_masternode: VerifyingKey,
    pub payee: PayoutAddress,
    pub vch_sig: Signature,
    pub sig_time: i64,
    pub protocol_version: u32,
}

impl Identity {
    /// The ASCII string the broadcast signature covers
    pub fn signed_message(&self, network: NetworkType) -> String {
        format!(
            "{}{}{}{}{}",
            addr_string(&self.addr, network.default_p2p_port()),
            self.sig_time,
            hex::encode(key_id(&self.pub_key_masternode)),
            self.payee,
            self.protocol_version
        )
    }

    pub fn key_id_hex(&self) -> String {
        hex::encode(key_id(&self.pub_key_masternode))
    }
}

/// Periodic signed liveness beacon. Declaration order is the wire order.
///
/// Record identity (equality) is `(pub_key, block_hash)`; the relay/dedup
/// hash uses `(pub_key, sig_time)` instead, so two pings for the same
/// block at different times dedup separately.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PingRecord {
    pub pub_key_masternode: VerifyingKey,
    pub block_hash: Hash256,
    pub sig_time: i64,
    pub vch_sig: Signature,
}

impl PartialEq for PingRecord {
    fn eq(&self, other: &Self) -> bool {
        self.pub_key_masternode == other.pub_key_masternode
            && self.block_hash == other.block_hash
    }
}

impl Eq for PingRecord {}

impl PingRecord {
    pub fn new(pub_key: VerifyingKey, block_hash: Hash256, sig_time: i64) -> Self {
        Self {
            pub_key_masternode: pub_key,
            block_hash,
            sig_time,
            vch_sig: zero_signature(),
        }
    }

    pub fn relay_hash(&self) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update(self.pub_key_masternode.as_bytes());
        hasher.update(self.sig_time.to_le_bytes());
        hasher.finalize().into()
    }

    /// The ASCII string the ping signature covers
    pub fn signed_message(&self) -> String {
        format!(
            "{}{}{}",
            hex::encode(key_id(&self.pub_key_masternode)),
            hex::encode(self.block_hash),
            self.sig_time
        )
    }

    /// Stamp `sig_time` and sign; fails loudly when the self-verify
    /// round-trip does not succeed.
    pub fn sign(&mut self, key: &SigningKey, now: i64) -> Result<(), Rejection> {
        self.sig_time = now;
        self.vch_sig = sign_message(key, &self.signed_message())?;
        Ok(())
    }

    pub fn verify_signature(&self, pub_key: &VerifyingKey) -> Result<(), Rejection> {
        verify_message(pub_key, &self.vch_sig, &self.signed_message())
    }

    /// A ping this old can no longer keep its masternode out of
    /// NEW_START_REQUIRED
    pub fn is_expired(&self, now: i64) -> bool {
        now - self.sig_time > NEW_START_REQUIRED_SECONDS
    }
}

/// A masternode's self-announcement. Declaration order is the wire order;
/// `f_recovery` and `entry_state` are local processing state and never
/// serialized.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BroadcastRecord {
    pub identity: Identity,
    pub last_ping: Option<PingRecord>,
    /// Permits reprocessing an equal-or-older broadcast during recovery
    #[serde(skip)]
    pub f_recovery: bool,
    /// State the entry will carry if admitted fresh; simple-check demotes
    /// this to Expired when the embedded ping is absent or stale
    #[serde(skip)]
    pub entry_state: crate::entry::ActiveState,
}

impl BroadcastRecord {
    pub fn new(
        addr: SocketAddr,
        pub_key: VerifyingKey,
        payee: PayoutAddress,
        protocol_version: u32,
    ) -> Self {
        Self {
            identity: Identity {
                addr,
                pub_key_masternode: pub_key,
                payee,
                vch_sig: zero_signature(),
                sig_time: 0,
                protocol_version,
            },
            last_ping: None,
            f_recovery: false,
            entry_state: crate::entry::ActiveState::default(),
        }
    }

    /// Relay/dedup hash; depends only on `(pub_key, payee, sig_time)`
    pub fn relay_hash(&self) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update(self.identity.pub_key_masternode.as_bytes());
        hasher.update(self.identity.payee.hash_bytes());
        hasher.update(self.identity.sig_time.to_le_bytes());
        hasher.finalize().into()
    }

    /// Stamp `sig_time` and sign the identity fields
    pub fn sign(
        &mut self,
        key: &SigningKey,
        network: NetworkType,
        now: i64,
    ) -> Result<(), Rejection> {
        self.identity.sig_time = now;
        let message = self.identity.signed_message(network);
        self.identity.vch_sig = sign_message(key, &message)?;
        Ok(())
    }

    pub fn verify_signature(&self, network: NetworkType) -> Result<(), Rejection> {
        verify_message(
            &self.identity.pub_key_masternode,
            &self.identity.vch_sig,
            &self.identity.signed_message(network),
        )
    }
}

/// Mutual reachability attestation: two masternodes co-sign a nonce at a
/// height. Declaration order is the wire order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VerificationRecord {
    pub pub_key1: VerifyingKey,
    pub pub_key2: VerifyingKey,
    pub addr: SocketAddr,
    pub nonce: u64,
    pub block_height: u64,
    pub vch_sig1: Signature,
    pub vch_sig2: Signature,
}

impl VerificationRecord {
    pub fn new(
        pub_key1: VerifyingKey,
        pub_key2: VerifyingKey,
        addr: SocketAddr,
        nonce: u64,
        block_height: u64,
    ) -> Self {
        Self {
            pub_key1,
            pub_key2,
            addr,
            nonce,
            block_height,
            vch_sig1: zero_signature(),
            vch_sig2: zero_signature(),
        }
    }

    pub fn relay_hash(&self) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update(self.pub_key1.as_bytes());
        hasher.update(self.pub_key2.as_bytes());
        hasher.update(self.addr.to_string().as_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(self.block_height.to_le_bytes());
        hasher.finalize().into()
    }

    /// Message the challenged node signs first
    pub fn first_message(&self, network: NetworkType) -> String {
        format!(
            "{}{}{}",
            addr_string(&self.addr, network.default_p2p_port()),
            self.nonce,
            self.block_height
        )
    }

    /// Message the challenger counter-signs, binding both key ids
    pub fn second_message(&self, network: NetworkType) -> String {
        format!(
            "{}{}{}{}{}",
            addr_string(&self.addr, network.default_p2p_port()),
            self.nonce,
            self.block_height,
            hex::encode(key_id(&self.pub_key1)),
            hex::encode(key_id(&self.pub_key2)),
        )
    }

    pub fn sign_first(&mut self, key: &SigningKey, network: NetworkType) -> Result<(), Rejection> {
        self.vch_sig1 = sign_message(key, &self.first_message(network))?;
        Ok(())
    }

    pub fn sign_second(&mut self, key: &SigningKey, network: NetworkType) -> Result<(), Rejection> {
        self.vch_sig2 = sign_message(key, &self.second_message(network))?;
        Ok(())
    }

    pub fn verify_first(&self, network: NetworkType) -> Result<(), Rejection> {
        verify_message(&self.pub_key1, &self.vch_sig1, &self.first_message(network))
    }

    pub fn verify_second(&self, network: NetworkType) -> Result<(), Rejection> {
        verify_message(&self.pub_key2, &self.vch_sig2, &self.second_message(network))
    }

    pub fn relay(&self, connman: &dyn crate::context::Relay) {
        connman.relay_inv(Inv {
            kind: InvKind::MasternodeVerify,
            hash: self.relay_hash(),
        });
    }
}
