//! Collaborator seams and the context threaded through every operation.
//!
//! The core never reaches for globals: chain access, the allow-list, the
//! payments tally, the sync coordinator, the relay channel, the local
//! operator identity and the clock all arrive through [`CoreContext`].

use crate::message::Inv;
use crate::registry::Registry;
use crate::types::{Hash256, NetworkType, PubKeyBytes};
use ed25519_dalek::VerifyingKey;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Index entry for a block known to the chain view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockIndex {
    pub height: u64,
    pub hash: Hash256,
    pub time: i64,
}

/// A coinbase output as seen by the payment scanner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// The slice of a block the core cares about: its index and the coinbase
/// outputs
#[derive(Clone, Debug)]
pub struct Block {
    pub index: BlockIndex,
    pub coinbase: Vec<TxOut>,
}

impl Block {
    /// Total coinbase value, the base the masternode share is computed from
    pub fn coinbase_value(&self) -> u64 {
        self.coinbase.iter().map(|out| out.value).sum()
    }
}

/// Read access to the block store and chain tip
pub trait ChainView: Send + Sync {
    fn height(&self) -> u64;
    fn tip_hash(&self) -> Hash256;
    fn block_at(&self, height: u64) -> Option<BlockIndex>;
    fn block_index(&self, hash: &Hash256) -> Option<BlockIndex>;
    fn read_block(&self, index: &BlockIndex) -> Option<Block>;

    /// Non-blocking probe of the chain lock. Returning false makes the
    /// caller drop the message as retriable rather than stall a network
    /// thread.
    fn try_read_lock(&self) -> bool {
        true
    }

    /// True while the block store is importing or reindexing
    fn is_importing(&self) -> bool {
        false
    }
}

/// Authoritative list of currently-valid masternode keys
pub trait Allowlist: Send + Sync {
    fn contains(&self, pub_key: &PubKeyBytes) -> bool;
}

/// Payment-election tally as far as the core consumes it
pub trait PaymentsView: Send + Sync {
    /// Minimum protocol version eligible for payment
    fn min_proto(&self) -> u32;
    /// Whether the tally at `height` records `script` with at least
    /// `min_votes` votes
    fn has_payee_with_votes(&self, height: u64, script: &[u8], min_votes: u32) -> bool;
    /// Expected masternode share of a block's reward
    fn masternode_payment(&self, height: u64, block_reward: u64) -> u64;
}

/// Sync coordinator: decides when the local node considers its view of the
/// network complete
pub trait SyncTracker: Send + Sync {
    fn is_blockchain_synced(&self) -> bool;
    fn is_list_synced(&self) -> bool;
    /// Nudge the sync deadline forward after useful progress
    fn bump_asset_last_time(&self, label: &str);
}

/// Peer-layer relay channel
pub trait Relay: Send + Sync {
    fn relay_inv(&self, inv: Inv);
}

/// The locally-operated masternode, if this node runs one
pub trait ActiveNode: Send + Sync {
    fn pub_key(&self) -> Option<VerifyingKey>;
    /// Remote-activation hook fired when our own broadcast is accepted
    fn manage_state(&self);
}

/// The single clock input: a peer-median, network-adjusted time. No
/// decision path reads the wall clock directly.
pub trait TimeSource: Send + Sync {
    fn adjusted_time(&self) -> i64;
}

/// Wall clock plus a calibration offset agreed across peers
pub struct NetworkTime {
    offset_secs: AtomicI64,
}

impl NetworkTime {
    pub fn new() -> Self {
        Self {
            offset_secs: AtomicI64::new(0),
        }
    }

    /// Install a new peer-median offset
    pub fn set_offset(&self, secs: i64) {
        self.offset_secs.store(secs, Ordering::Relaxed);
    }
}

impl Default for NetworkTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for NetworkTime {
    fn adjusted_time(&self) -> i64 {
        chrono::Utc::now().timestamp() + self.offset_secs.load(Ordering::Relaxed)
    }
}

/// One-way feature-flag latch: once set it never clears, so score-mode
/// regressions are impossible by construction.
pub struct MonotonicFlag {
    set: AtomicBool,
}

impl MonotonicFlag {
    pub fn new(initial: bool) -> Self {
        Self {
            set: AtomicBool::new(initial),
        }
    }

    pub fn set(&self) {
        self.set.store(true, Ordering::Release);
    }

    pub fn get(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }
}

/// Everything a core operation needs, threaded explicitly
pub struct CoreContext {
    pub network: NetworkType,
    /// Protocol version of this build
    pub protocol_version: u32,
    pub chain: Arc<dyn ChainView>,
    pub allowlist: Arc<dyn Allowlist>,
    pub payments: Arc<dyn PaymentsView>,
    pub sync: Arc<dyn SyncTracker>,
    pub connman: Arc<dyn Relay>,
    pub active: Arc<dyn ActiveNode>,
    pub time: Arc<dyn TimeSource>,
    pub registry: Arc<Registry>,
    pub shutdown: CancellationToken,
    /// Gates the modern score formula; set at the activation height
    pub dip0001_locked_in: MonotonicFlag,
}

impl CoreContext {
    pub fn adjusted_time(&self) -> i64 {
        self.time.adjusted_time()
    }

    /// Whether `pub_key` is the masternode this node operates
    pub fn is_our_masternode(&self, pub_key: &VerifyingKey) -> bool {
        self.active
            .pub_key()
            .map(|ours| ours == *pub_key)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_flag_never_clears() {
        let flag = MonotonicFlag::new(false);
        assert!(!flag.get());
        flag.set();
        assert!(flag.get());
        flag.set();
        assert!(flag.get());
    }

    #[test]
    fn network_time_applies_offset() {
        let time = NetworkTime::new();
        let base = time.adjusted_time();
        time.set_offset(3600);
        let shifted = time.adjusted_time();
        assert!(shifted - base >= 3600 - 2 && shifted - base <= 3600 + 2);
    }

    #[test]
    fn coinbase_value_sums_outputs() {
        let block = Block {
            index: BlockIndex {
                height: 1,
                hash: [0u8; 32],
                time: 0,
            },
            coinbase: vec![
                TxOut {
                    value: 70,
                    script_pubkey: vec![],
                },
                TxOut {
                    value: 30,
                    script_pubkey: vec![],
                },
            ],
        };
        assert_eq!(block.coinbase_value(), 100);
    }
}
