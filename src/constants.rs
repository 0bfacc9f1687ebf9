//! Protocol constants for the masternode lifecycle core.
//!
//! Centralizes the timing windows and policy thresholds the state machine
//! is built around. All durations are in seconds of network-adjusted time.

/// Lifecycle timing and proof-of-service policy
pub mod lifecycle {
    /// Evaluation results are cached this long; re-checks inside the window
    /// are skipped unless forced
    pub const CHECK_SECONDS: i64 = 5;

    /// Minimum interval between accepted re-broadcasts of one masternode (5 minutes)
    pub const MIN_MNB_SECONDS: i64 = 5 * 60;

    /// Expected ping cadence (10 minutes)
    pub const MIN_MNP_SECONDS: i64 = 10 * 60;

    /// No ping for this long moves an entry to EXPIRED (65 minutes)
    pub const EXPIRATION_SECONDS: i64 = 65 * 60;

    /// No ping for this long demands a fresh announce (3 hours)
    pub const NEW_START_REQUIRED_SECONDS: i64 = 180 * 60;

    /// PoSe score ceiling; reaching it bans the node for a payment cycle
    pub const POSE_BAN_MAX_SCORE: i32 = 5;
}

/// Timestamp acceptance policy
pub mod timing {
    /// Signed timestamps may lead network-adjusted time by at most one hour
    pub const MAX_FUTURE_SIG_TIME_SECONDS: i64 = 60 * 60;
}

/// Chain-relative message policy
pub mod chain {
    /// A ping must reference a block no deeper than this below the tip
    pub const PING_BLOCK_MAX_DEPTH: u64 = 24;

    /// Self-pings reference the block this far behind the tip, a stable
    /// confirmation horizon
    pub const PING_BLOCK_CONFIRMATIONS: u64 = 12;
}

/// Script policy
pub mod script {
    /// Length of a standard pay-to-pubkey-hash script
    pub const P2PKH_SCRIPT_LEN: usize = 25;
}

/// Protocol versioning
pub mod protocol {
    /// Protocol version of this build
    pub const PROTOCOL_VERSION: u32 = 70208;
}
