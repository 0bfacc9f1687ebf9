//! Inbound ping processing: validate a liveness beacon, attach it to the
//! owning entry and refresh that entry's state.

use crate::constants::chain::PING_BLOCK_MAX_DEPTH;
use crate::constants::lifecycle::{EXPIRATION_SECONDS, MIN_MNP_SECONDS};
use crate::constants::timing::MAX_FUTURE_SIG_TIME_SECONDS;
use crate::context::CoreContext;
use crate::entry::MasternodeEntry;
use crate::error::{RejectReason, Rejection};
use crate::evaluator::evaluate;
use crate::message::{Inv, InvKind, PingRecord};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PingOutcome {
    /// Installed on the entry and relayed
    Relayed,
    /// Installed, but the entry did not come out ENABLED so the ping is
    /// not propagated
    AcceptedNotEnabled,
    /// Already processed; nothing to do
    Duplicate,
}

/// Self-contained checks needing no registry access: timestamp window and
/// a known referenced block. The chain lock is only read here.
pub fn simple_check(ctx: &CoreContext, ping: &PingRecord) -> Result<(), Rejection> {
    if ping.sig_time > ctx.adjusted_time() + MAX_FUTURE_SIG_TIME_SECONDS {
        warn!(
            "ping: signature too far into the future, masternode={}",
            hex::encode(crate::types::key_id(&ping.pub_key_masternode))
        );
        return Err(RejectReason::FutureSigTime.into());
    }

    if ctx.chain.block_index(&ping.block_hash).is_none() {
        // maybe we are stuck or forked; don't ban, just refuse this ping
        debug!(
            "ping: unknown block hash {}, masternode={}",
            hex::encode(ping.block_hash),
            hex::encode(crate::types::key_id(&ping.pub_key_masternode))
        );
        return Err(RejectReason::UnknownBlock.into());
    }

    Ok(())
}

/// Process a gossiped ping: dedup, find the owning entry and update it.
pub fn process_ping(ctx: &CoreContext, ping: PingRecord) -> Result<PingOutcome, Rejection> {
    let hash = ping.relay_hash();
    if ctx.registry.has_seen_ping(&hash) {
        debug!(
            "ping: seen, masternode={}",
            hex::encode(crate::types::key_id(&ping.pub_key_masternode))
        );
        return Ok(PingOutcome::Duplicate);
    }
    ctx.registry.note_seen_ping(ping.clone());

    let key = ping.pub_key_masternode.to_bytes();
    let Some(cell) = ctx.registry.get(&key) else {
        debug!(
            "ping: couldn't find masternode entry, masternode={}",
            hex::encode(crate::types::key_id(&ping.pub_key_masternode))
        );
        return Err(RejectReason::UnknownMasternode.into());
    };

    let mut entry = cell.lock();
    check_and_update(ctx, &mut entry, &ping, false)
}

/// Validate `ping` against its owning entry and install it. The caller
/// holds the entry mutex. `from_new_broadcast` relaxes the state gates for
/// pings embedded in a broadcast being merged.
pub(crate) fn check_and_update(
    ctx: &CoreContext,
    entry: &mut MasternodeEntry,
    ping: &PingRecord,
    from_new_broadcast: bool,
) -> Result<PingOutcome, Rejection> {
    simple_check(ctx, ping)?;

    if !from_new_broadcast {
        if entry.is_update_required() {
            debug!(
                "ping: masternode protocol is outdated, masternode={}",
                entry.identity.key_id_hex()
            );
            return Err(RejectReason::OutdatedProtocol.into());
        }
        if entry.is_new_start_required() {
            debug!(
                "ping: masternode is completely expired, new start is required, masternode={}",
                entry.identity.key_id_hex()
            );
            return Err(RejectReason::StalePing.into());
        }
    }

    match ctx.chain.block_index(&ping.block_hash) {
        Some(index) if ctx.chain.height() > index.height + PING_BLOCK_MAX_DEPTH => {
            warn!(
                "ping: block hash is too old, masternode={} blockHash={}",
                entry.identity.key_id_hex(),
                hex::encode(ping.block_hash)
            );
            return Err(RejectReason::PingBlockTooOld.into());
        }
        Some(_) => {}
        // the tip may have moved between the two lookups
        None => return Err(RejectReason::UnknownBlock.into()),
    }

    // update only when the previous ping is at least MIN_MNP_SECONDS-60
    // older; earlier arrivals happen under normal conditions and are
    // dropped without penalty
    if entry.is_pinged_within(MIN_MNP_SECONDS - 60, ping.sig_time) {
        debug!(
            "ping: arrived too early, masternode={}",
            entry.identity.key_id_hex()
        );
        return Err(RejectReason::PingTooEarly.into());
    }

    ping.verify_signature(&entry.identity.pub_key_masternode)
        .map_err(|_| Rejection::with_dos(RejectReason::BadSignature, 33))?;

    // if we are still syncing and this masternode was silent for quite a
    // while, half the expiration window should be enough to finish the
    // list sync
    if !ctx.sync.is_list_synced()
        && !entry.is_pinged_within(EXPIRATION_SECONDS / 2, ctx.adjusted_time())
    {
        debug!(
            "ping: bumping sync timeout, masternode={}",
            entry.identity.key_id_hex()
        );
        ctx.sync.bump_asset_last_time("ping::check_and_update");
    }

    debug!(
        "ping: accepted, masternode={} blockHash={}",
        entry.identity.key_id_hex(),
        hex::encode(ping.block_hash)
    );
    entry.last_ping = Some(ping.clone());

    // the cached broadcast for this masternode now carries a stale ping;
    // refresh it (cache shard lock acquired last)
    ctx.registry
        .patch_seen_broadcast_ping(&entry.broadcast_hash(), ping);

    evaluate(entry, ctx, true);
    if !entry.is_enabled() {
        return Ok(PingOutcome::AcceptedNotEnabled);
    }

    debug!(
        "ping: accepted and relayed, masternode={}",
        entry.identity.key_id_hex()
    );
    ctx.connman.relay_inv(Inv {
        kind: InvKind::MasternodePing,
        hash: ping.relay_hash(),
    });

    Ok(PingOutcome::Relayed)
}
