//! Mock collaborators shared by the integration suites.
#![allow(dead_code)]

use ed25519_dalek::{SigningKey, VerifyingKey};
use masternode_lifecycle::constants::protocol::PROTOCOL_VERSION;
use masternode_lifecycle::context::{
    ActiveNode, Allowlist, Block, BlockIndex, ChainView, CoreContext, MonotonicFlag, PaymentsView,
    Relay, SyncTracker, TimeSource, TxOut,
};
use masternode_lifecycle::message::{BroadcastRecord, Inv, PingRecord};
use masternode_lifecycle::registry::Registry;
use masternode_lifecycle::types::{Hash256, NetworkType, PayoutAddress, PubKeyBytes};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Base timestamp all suites reason from
pub const T0: i64 = 1_700_000_000;

/// Default tip height of the mock chain
pub const TIP: u64 = 100;

/// Deterministic block hash for a mock height
pub fn block_hash_for(height: u64) -> Hash256 {
    let mut hash = [0u8; 32];
    hash[..8].copy_from_slice(&height.to_le_bytes());
    hash[31] = 0xb1;
    hash
}

pub struct MockChain {
    tip: AtomicU64,
    by_height: RwLock<HashMap<u64, BlockIndex>>,
    by_hash: RwLock<HashMap<Hash256, BlockIndex>>,
    coinbases: RwLock<HashMap<u64, Vec<TxOut>>>,
    pub busy: AtomicBool,
    pub importing: AtomicBool,
}

impl MockChain {
    /// Chain with indexes populated well past `tip` so the tip can be
    /// advanced without re-seeding; blocks are 10 minutes apart ending at
    /// `tip_time`.
    pub fn new(tip: u64, tip_time: i64) -> Self {
        let mut by_height = HashMap::new();
        let mut by_hash = HashMap::new();
        for height in 0..=tip + 200 {
            let index = BlockIndex {
                height,
                hash: block_hash_for(height),
                time: tip_time - (tip as i64 - height as i64) * 600,
            };
            by_height.insert(height, index);
            by_hash.insert(index.hash, index);
        }
        Self {
            tip: AtomicU64::new(tip),
            by_height: RwLock::new(by_height),
            by_hash: RwLock::new(by_hash),
            coinbases: RwLock::new(HashMap::new()),
            busy: AtomicBool::new(false),
            importing: AtomicBool::new(false),
        }
    }

    pub fn set_tip(&self, height: u64) {
        self.tip.store(height, Ordering::SeqCst);
    }

    pub fn set_coinbase(&self, height: u64, outputs: Vec<TxOut>) {
        self.coinbases.write().insert(height, outputs);
    }
}

impl ChainView for MockChain {
    fn height(&self) -> u64 {
        self.tip.load(Ordering::SeqCst)
    }

    fn tip_hash(&self) -> Hash256 {
        block_hash_for(self.height())
    }

    fn block_at(&self, height: u64) -> Option<BlockIndex> {
        if height > self.height() {
            return None;
        }
        self.by_height.read().get(&height).copied()
    }

    fn block_index(&self, hash: &Hash256) -> Option<BlockIndex> {
        self.by_hash
            .read()
            .get(hash)
            .copied()
            .filter(|index| index.height <= self.height())
    }

    fn read_block(&self, index: &BlockIndex) -> Option<Block> {
        let coinbase = self.coinbases.read().get(&index.height).cloned()?;
        Some(Block {
            index: *index,
            coinbase,
        })
    }

    fn try_read_lock(&self) -> bool {
        !self.busy.load(Ordering::SeqCst)
    }

    fn is_importing(&self) -> bool {
        self.importing.load(Ordering::SeqCst)
    }
}

pub struct MockAllowlist {
    denied: RwLock<HashSet<PubKeyBytes>>,
}

impl MockAllowlist {
    pub fn new() -> Self {
        Self {
            denied: RwLock::new(HashSet::new()),
        }
    }

    pub fn deny(&self, key: PubKeyBytes) {
        self.denied.write().insert(key);
    }
}

impl Allowlist for MockAllowlist {
    fn contains(&self, pub_key: &PubKeyBytes) -> bool {
        !self.denied.read().contains(pub_key)
    }
}

pub struct MockPayments {
    pub min_proto: AtomicU32,
    scheduled: RwLock<HashMap<u64, Vec<Vec<u8>>>>,
}

impl MockPayments {
    pub fn new() -> Self {
        Self {
            min_proto: AtomicU32::new(70206),
            scheduled: RwLock::new(HashMap::new()),
        }
    }

    pub fn schedule_payee(&self, height: u64, script: Vec<u8>) {
        self.scheduled.write().entry(height).or_default().push(script);
    }
}

impl PaymentsView for MockPayments {
    fn min_proto(&self) -> u32 {
        self.min_proto.load(Ordering::SeqCst)
    }

    fn has_payee_with_votes(&self, height: u64, script: &[u8], _min_votes: u32) -> bool {
        self.scheduled
            .read()
            .get(&height)
            .map(|scripts| scripts.iter().any(|s| s == script))
            .unwrap_or(false)
    }

    fn masternode_payment(&self, _height: u64, block_reward: u64) -> u64 {
        block_reward / 5
    }
}

pub struct MockSync {
    pub blockchain_synced: AtomicBool,
    pub list_synced: AtomicBool,
    pub bumps: Mutex<Vec<String>>,
}

impl MockSync {
    pub fn new() -> Self {
        Self {
            blockchain_synced: AtomicBool::new(true),
            list_synced: AtomicBool::new(true),
            bumps: Mutex::new(Vec::new()),
        }
    }
}

impl SyncTracker for MockSync {
    fn is_blockchain_synced(&self) -> bool {
        self.blockchain_synced.load(Ordering::SeqCst)
    }

    fn is_list_synced(&self) -> bool {
        self.list_synced.load(Ordering::SeqCst)
    }

    fn bump_asset_last_time(&self, label: &str) {
        self.bumps.lock().push(label.to_string());
    }
}

pub struct MockRelay {
    pub invs: Mutex<Vec<Inv>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self {
            invs: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.invs.lock().len()
    }
}

impl Relay for MockRelay {
    fn relay_inv(&self, inv: Inv) {
        self.invs.lock().push(inv);
    }
}

pub struct MockActive {
    key: Mutex<Option<VerifyingKey>>,
    pub managed: AtomicBool,
}

impl MockActive {
    pub fn new() -> Self {
        Self {
            key: Mutex::new(None),
            managed: AtomicBool::new(false),
        }
    }

    pub fn set_key(&self, key: VerifyingKey) {
        *self.key.lock() = Some(key);
    }
}

impl ActiveNode for MockActive {
    fn pub_key(&self) -> Option<VerifyingKey> {
        *self.key.lock()
    }

    fn manage_state(&self) {
        self.managed.store(true, Ordering::SeqCst);
    }
}

pub struct MockTime {
    now: AtomicI64,
}

impl MockTime {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl TimeSource for MockTime {
    fn adjusted_time(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Everything a scenario needs: the context plus handles to the mocks
/// behind it.
pub struct Harness {
    pub chain: Arc<MockChain>,
    pub allowlist: Arc<MockAllowlist>,
    pub payments: Arc<MockPayments>,
    pub sync: Arc<MockSync>,
    pub relay: Arc<MockRelay>,
    pub active: Arc<MockActive>,
    pub time: Arc<MockTime>,
    pub registry: Arc<Registry>,
    pub ctx: CoreContext,
}

pub fn harness(network: NetworkType) -> Harness {
    let chain = Arc::new(MockChain::new(TIP, T0));
    let allowlist = Arc::new(MockAllowlist::new());
    let payments = Arc::new(MockPayments::new());
    let sync = Arc::new(MockSync::new());
    let relay = Arc::new(MockRelay::new());
    let active = Arc::new(MockActive::new());
    let time = Arc::new(MockTime::new(T0));
    let registry = Arc::new(Registry::new());

    let ctx = CoreContext {
        network,
        protocol_version: PROTOCOL_VERSION,
        chain: chain.clone(),
        allowlist: allowlist.clone(),
        payments: payments.clone(),
        sync: sync.clone(),
        connman: relay.clone(),
        active: active.clone(),
        time: time.clone(),
        registry: registry.clone(),
        shutdown: CancellationToken::new(),
        dip0001_locked_in: MonotonicFlag::new(false),
    };

    Harness {
        chain,
        allowlist,
        payments,
        sync,
        relay,
        active,
        time,
        registry,
        ctx,
    }
}

pub fn test_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn default_addr(network: NetworkType) -> SocketAddr {
    SocketAddr::new(
        "93.184.216.34".parse().unwrap(),
        network.default_p2p_port(),
    )
}

/// A fully signed broadcast for `key`, optionally carrying a signed ping
/// anchored 12 blocks behind the mock tip.
pub fn signed_broadcast(
    h: &Harness,
    key: &SigningKey,
    mnb_time: i64,
    ping_time: Option<i64>,
) -> BroadcastRecord {
    let pub_key = key.verifying_key();
    let mut mnb = BroadcastRecord::new(
        default_addr(h.ctx.network),
        pub_key,
        PayoutAddress::from_pubkey(&pub_key),
        h.ctx.protocol_version,
    );

    if let Some(at) = ping_time {
        let anchor = block_hash_for(h.chain.height() - 12);
        let mut ping = PingRecord::new(pub_key, anchor, at);
        ping.sign(key, at).expect("sign ping");
        mnb.last_ping = Some(ping);
    }

    mnb.sign(key, h.ctx.network, mnb_time).expect("sign broadcast");
    mnb
}

/// A signed ping for `key` anchored 12 blocks behind the mock tip.
pub fn signed_ping(h: &Harness, key: &SigningKey, at: i64) -> PingRecord {
    let anchor = block_hash_for(h.chain.height() - 12);
    let mut ping = PingRecord::new(key.verifying_key(), anchor, at);
    ping.sign(key, at).expect("sign ping");
    ping
}
