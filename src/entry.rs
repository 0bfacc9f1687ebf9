//! The central mutable record: one tracked masternode.

use crate::constants::lifecycle::POSE_BAN_MAX_SCORE;
use crate::message::{BroadcastRecord, Identity, PingRecord};
use crate::types::Hash256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Public lifecycle state of a masternode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveState {
    /// First ping seen too soon after the announce; counting down
    PreEnabled,
    #[default]
    Enabled,
    /// No ping within the expiration window
    Expired,
    /// Protocol version below the payment minimum
    UpdateRequired,
    /// Silent so long a fresh announce is required
    NewStartRequired,
    /// Banned by proof-of-service until `pose_ban_height`
    PoSeBan,
}

impl ActiveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveState::PreEnabled => "PRE_ENABLED",
            ActiveState::Enabled => "ENABLED",
            ActiveState::Expired => "EXPIRED",
            ActiveState::UpdateRequired => "UPDATE_REQUIRED",
            ActiveState::NewStartRequired => "NEW_START_REQUIRED",
            ActiveState::PoSeBan => "POSE_BAN",
        }
    }

    /// States from which the operator tooling may restart the node
    pub fn is_valid_for_auto_start(&self) -> bool {
        matches!(
            self,
            ActiveState::Enabled | ActiveState::PreEnabled | ActiveState::Expired
        )
    }
}

impl fmt::Display for ActiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracked state of one masternode, keyed by its public key. Field order
/// is the registry's persisted order and must stay stable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MasternodeEntry {
    pub identity: Identity,
    pub last_ping: Option<PingRecord>,
    pub active_state: ActiveState,
    /// Bounded misbehaviour score in [-MAX, +MAX]
    pub pose_ban_score: i32,
    /// Block height at which a PoSe ban may be reconsidered
    pub pose_ban_height: u64,
    /// Block hash captured when the collateral reached its confirmation
    /// depth; input to the election score
    pub collateral_min_conf_block_hash: Hash256,
    pub n_time_last_checked: i64,
    pub n_time_last_paid: i64,
    pub n_block_last_paid: u64,
    pub n_last_dsq: i64,
    #[serde(default)]
    pub f_unit_test: bool,
}

/// Cheap copyable snapshot of an entry for status surfaces
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MasternodeInfo {
    pub identity: Identity,
    pub active_state: ActiveState,
    pub last_ping_time: i64,
    pub n_time_last_paid: i64,
    pub n_block_last_paid: u64,
}

impl From<&BroadcastRecord> for MasternodeEntry {
    fn from(mnb: &BroadcastRecord) -> Self {
        Self {
            identity: mnb.identity.clone(),
            last_ping: mnb.last_ping.clone(),
            active_state: mnb.entry_state,
            pose_ban_score: 0,
            pose_ban_height: 0,
            collateral_min_conf_block_hash: [0u8; 32],
            n_time_last_checked: 0,
            n_time_last_paid: 0,
            n_block_last_paid: 0,
            n_last_dsq: 0,
            f_unit_test: false,
        }
    }
}

impl MasternodeEntry {
    /// Relay hash of the broadcast that would describe this entry now;
    /// used to patch the seen-broadcast cache when a fresh ping lands
    pub fn broadcast_hash(&self) -> Hash256 {
        let mut hasher = Sha256::new();
        hasher.update(self.identity.pub_key_masternode.as_bytes());
        hasher.update(self.identity.payee.hash_bytes());
        hasher.update(self.identity.sig_time.to_le_bytes());
        hasher.finalize().into()
    }

    pub fn is_pinged_within(&self, seconds: i64, at_time: i64) -> bool {
        match &self.last_ping {
            Some(ping) => at_time - ping.sig_time < seconds,
            None => false,
        }
    }

    pub fn is_broadcasted_within(&self, seconds: i64, now: i64) -> bool {
        now - self.identity.sig_time < seconds
    }

    pub fn is_enabled(&self) -> bool {
        self.active_state == ActiveState::Enabled
    }

    pub fn is_pre_enabled(&self) -> bool {
        self.active_state == ActiveState::PreEnabled
    }

    pub fn is_expired(&self) -> bool {
        self.active_state == ActiveState::Expired
    }

    pub fn is_update_required(&self) -> bool {
        self.active_state == ActiveState::UpdateRequired
    }

    pub fn is_new_start_required(&self) -> bool {
        self.active_state == ActiveState::NewStartRequired
    }

    pub fn is_pose_banned(&self) -> bool {
        self.active_state == ActiveState::PoSeBan
    }

    // NOTE: keyed off the score, not the state like everything else here
    pub fn is_pose_verified(&self) -> bool {
        self.pose_ban_score <= -POSE_BAN_MAX_SCORE
    }

    /// Only ENABLED entries take part in the payment election
    pub fn is_valid_for_payment(&self) -> bool {
        self.is_enabled()
    }

    pub fn increase_pose_ban_score(&mut self) {
        if self.pose_ban_score < POSE_BAN_MAX_SCORE {
            self.pose_ban_score += 1;
        }
    }

    pub fn decrease_pose_ban_score(&mut self) {
        if self.pose_ban_score > -POSE_BAN_MAX_SCORE {
            self.pose_ban_score -= 1;
        }
    }

    /// Slam the score to the ceiling; the next evaluation bans the entry
    pub fn pose_ban(&mut self) {
        self.pose_ban_score = POSE_BAN_MAX_SCORE;
    }

    pub fn state_string(&self) -> &'static str {
        self.active_state.as_str()
    }

    pub fn info(&self) -> MasternodeInfo {
        MasternodeInfo {
            identity: self.identity.clone(),
            active_state: self.active_state,
            last_ping_time: self.last_ping.as_ref().map_or(0, |p| p.sig_time),
            n_time_last_paid: self.n_time_last_paid,
            n_block_last_paid: self.n_block_last_paid,
        }
    }
}
