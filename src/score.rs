//! Deterministic per-block election score.
//!
//! Pure functions of the entry's identity and a block hash; the election
//! layer picks the largest score and breaks ties itself.

use crate::context::CoreContext;
use crate::entry::MasternodeEntry;
use crate::types::Hash256;
use ed25519_dalek::VerifyingKey;
use primitive_types::U256;
use sha2::{Digest, Sha256};

/// Score an entry against `block_hash`, choosing the formula by the
/// one-way activation flag.
pub fn calculate_score(entry: &MasternodeEntry, block_hash: &Hash256, ctx: &CoreContext) -> U256 {
    if ctx.dip0001_locked_in.get() {
        modern_score(
            &entry.identity.pub_key_masternode,
            &entry.collateral_min_conf_block_hash,
            block_hash,
        )
    } else {
        legacy_score(&entry.identity.pub_key_masternode, block_hash)
    }
}

/// Single-digest formula over key, collateral anchor and block hash
pub fn modern_score(
    pub_key: &VerifyingKey,
    collateral_min_conf_block_hash: &Hash256,
    block_hash: &Hash256,
) -> U256 {
    let mut hasher = Sha256::new();
    hasher.update(pub_key.as_bytes());
    hasher.update(collateral_min_conf_block_hash);
    hasher.update(block_hash);
    let digest: [u8; 32] = hasher.finalize().into();
    U256::from_big_endian(&digest)
}

/// Pre-activation formula: the absolute distance between the block-hash
/// digest and the digest salted with the key's own hash
pub fn legacy_score(pub_key: &VerifyingKey, block_hash: &Hash256) -> U256 {
    let aux: [u8; 32] = Sha256::digest(pub_key.as_bytes()).into();

    let h2_digest: [u8; 32] = Sha256::digest(block_hash).into();
    let hash2 = U256::from_big_endian(&h2_digest);

    let mut hasher = Sha256::new();
    hasher.update(block_hash);
    hasher.update(aux);
    let h3_digest: [u8; 32] = hasher.finalize().into();
    let hash3 = U256::from_big_endian(&h3_digest);

    if hash3 > hash2 {
        hash3 - hash2
    } else {
        hash2 - hash3
    }
}
