//! In-memory masternode registry: the entry map plus the seen caches that
//! deduplicate relayed messages.
//!
//! Lock order: the map lock is taken before any entry mutex; the seen
//! caches are sharded and always acquired last. Entries are never
//! evaluated while the map lock is held for writing.

use crate::entry::MasternodeEntry;
use crate::message::{BroadcastRecord, PingRecord};
use crate::types::{Hash256, PubKeyBytes};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct Registry {
    entries: RwLock<HashMap<PubKeyBytes, Arc<Mutex<MasternodeEntry>>>>,
    seen_broadcasts: DashMap<Hash256, BroadcastRecord>,
    seen_pings: DashMap<Hash256, PingRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            seen_broadcasts: DashMap::new(),
            seen_pings: DashMap::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.entries.read().len()
    }

    pub fn has(&self, pub_key: &PubKeyBytes) -> bool {
        self.entries.read().contains_key(pub_key)
    }

    pub fn get(&self, pub_key: &PubKeyBytes) -> Option<Arc<Mutex<MasternodeEntry>>> {
        self.entries.read().get(pub_key).cloned()
    }

    /// Install an entry, replacing any previous one for the same key (two
    /// entries may never share a public key).
    pub fn insert(&self, entry: MasternodeEntry) -> Arc<Mutex<MasternodeEntry>> {
        let key = entry.identity.pub_key_masternode.to_bytes();
        let key_id = entry.identity.key_id_hex();
        let cell = Arc::new(Mutex::new(entry));
        let replaced = self.entries.write().insert(key, cell.clone()).is_some();
        if replaced {
            debug!("registry: replaced masternode {}", key_id);
        } else {
            debug!("registry: added masternode {}", key_id);
        }
        cell
    }

    pub fn remove(&self, pub_key: &PubKeyBytes) -> Option<Arc<Mutex<MasternodeEntry>>> {
        self.entries.write().remove(pub_key)
    }

    /// Snapshot of all entry cells, for iteration outside the map lock
    pub fn entries(&self) -> Vec<Arc<Mutex<MasternodeEntry>>> {
        self.entries.read().values().cloned().collect()
    }

    /// Apply a misbehaviour signal (failed verify challenge, connect
    /// failure) to an entry; the next evaluation acts on the new score.
    pub fn increase_pose_ban_score(&self, pub_key: &PubKeyBytes) -> bool {
        match self.get(pub_key) {
            Some(cell) => {
                cell.lock().increase_pose_ban_score();
                true
            }
            None => false,
        }
    }

    // --- seen-broadcast cache ---

    pub fn has_seen_broadcast(&self, hash: &Hash256) -> bool {
        self.seen_broadcasts.contains_key(hash)
    }

    pub fn note_seen_broadcast(&self, mnb: BroadcastRecord) {
        self.seen_broadcasts.insert(mnb.relay_hash(), mnb);
    }

    /// Drop a broadcast from the cache so peers may be re-asked for it
    pub fn forget_broadcast(&self, hash: &Hash256) {
        self.seen_broadcasts.remove(hash);
    }

    /// Refresh the cached broadcast's embedded ping after a newer ping is
    /// accepted, so a later re-relay carries current liveness. Callers
    /// hold the entry mutex; the cache shard lock is acquired last.
    pub fn patch_seen_broadcast_ping(&self, broadcast_hash: &Hash256, ping: &PingRecord) {
        if let Some(mut cached) = self.seen_broadcasts.get_mut(broadcast_hash) {
            cached.last_ping = Some(ping.clone());
        }
    }

    // --- seen-ping cache ---

    pub fn has_seen_ping(&self, hash: &Hash256) -> bool {
        self.seen_pings.contains_key(hash)
    }

    pub fn note_seen_ping(&self, ping: PingRecord) {
        self.seen_pings.insert(ping.relay_hash(), ping);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
