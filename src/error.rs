//! Rejection reasons and the advisory DoS channel.
//!
//! Message processing reports two orthogonal things: whether a message was
//! accepted, and how strongly the peer layer should penalise the sender
//! for a refusal. The weight is advisory; 0 means "do not penalise"
//! (local ambiguity such as an unknown block hash).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("invalid network address")]
    InvalidAddr,
    #[error("signature timestamp too far in the future")]
    FutureSigTime,
    #[error("bad signature")]
    BadSignature,
    #[error("outdated protocol version")]
    OutdatedProtocol,
    #[error("payout script has a non-standard size")]
    BadScriptSize,
    #[error("port not allowed on this network")]
    WrongPort,
    #[error("payee does not match the existing entry")]
    PayeeMismatch,
    #[error("broadcast is older than the known entry")]
    StaleBroadcast,
    #[error("ping arrived too late for the entry's state")]
    StalePing,
    #[error("ping arrived too early")]
    PingTooEarly,
    #[error("ping references a block too deep below the tip")]
    PingBlockTooOld,
    #[error("unknown block hash")]
    UnknownBlock,
    #[error("no entry for this masternode")]
    UnknownMasternode,
    #[error("masternode is banned by proof-of-service")]
    BannedByPoSe,
    #[error("chain view busy")]
    ChainBusy,
    #[error("shutdown in progress")]
    ShuttingDown,
    #[error("cannot derive keypair from the supplied secret")]
    KeyFromSecretFailed,
    #[error("chain tip too low to reference a confirmed block")]
    TipTooLow,
    #[error("blockchain sync still in progress")]
    SyncInProgress,
}

impl RejectReason {
    /// Default misbehaviour weight; processing paths override where the
    /// same reason carries a different weight in context
    pub fn default_dos(self) -> u32 {
        match self {
            RejectReason::FutureSigTime => 1,
            RejectReason::PayeeMismatch => 33,
            RejectReason::BadScriptSize => 100,
            _ => 0,
        }
    }
}

/// A refusal plus the misbehaviour weight the peer layer may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Rejection {
    pub reason: RejectReason,
    pub dos: u32,
}

impl Rejection {
    pub fn new(reason: RejectReason) -> Self {
        Self {
            reason,
            dos: reason.default_dos(),
        }
    }

    pub fn with_dos(reason: RejectReason, dos: u32) -> Self {
        Self { reason, dos }
    }
}

impl From<RejectReason> for Rejection {
    fn from(reason: RejectReason) -> Self {
        Rejection::new(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dos_weights() {
        assert_eq!(RejectReason::FutureSigTime.default_dos(), 1);
        assert_eq!(RejectReason::PayeeMismatch.default_dos(), 33);
        assert_eq!(RejectReason::BadScriptSize.default_dos(), 100);
        assert_eq!(RejectReason::UnknownBlock.default_dos(), 0);
        assert_eq!(RejectReason::InvalidAddr.default_dos(), 0);
    }

    #[test]
    fn contextual_override() {
        let r = Rejection::with_dos(RejectReason::BadSignature, 33);
        assert_eq!(r.dos, 33);
        let r = Rejection::new(RejectReason::BadSignature);
        assert_eq!(r.dos, 0);
    }
}
