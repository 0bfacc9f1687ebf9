//! Inbound broadcast processing: validate a self-announcement and merge it
//! into the registry, or admit it as a new entry.

use crate::constants::lifecycle::{MIN_MNB_SECONDS, POSE_BAN_MAX_SCORE};
use crate::constants::script::P2PKH_SCRIPT_LEN;
use crate::constants::timing::MAX_FUTURE_SIG_TIME_SECONDS;
use crate::context::CoreContext;
use crate::entry::{ActiveState, MasternodeEntry};
use crate::error::{RejectReason, Rejection};
use crate::evaluator::evaluate;
use crate::message::{BroadcastRecord, Inv, InvKind};
use crate::ping;
use crate::types::{is_valid_net_addr, key_id, script_for_key_id, NetworkType};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// A new entry was created and the broadcast relayed
    Inserted,
    /// An existing entry was merged and the broadcast relayed
    Updated,
    /// Legitimate duplicate; nothing to do
    Duplicate,
    /// Valid, but inside the re-broadcast rate limit; no merge
    Throttled,
}

/// Process a gossiped broadcast end to end.
pub fn process_broadcast(
    ctx: &CoreContext,
    mut mnb: BroadcastRecord,
) -> Result<BroadcastOutcome, Rejection> {
    let hash = mnb.relay_hash();
    if ctx.registry.has_seen_broadcast(&hash) && !mnb.f_recovery {
        debug!(
            "broadcast: seen, masternode={}",
            mnb.identity.key_id_hex()
        );
        return Ok(BroadcastOutcome::Duplicate);
    }

    simple_check(ctx, &mut mnb)?;
    ctx.registry.note_seen_broadcast(mnb.clone());

    let key = mnb.identity.pub_key_masternode.to_bytes();
    match ctx.registry.get(&key) {
        Some(cell) => {
            let mut entry = cell.lock();
            update_existing(ctx, &mut entry, &mnb)
        }
        None => admit_new(ctx, mnb),
    }
}

/// Phase 1: self-contained checks, no registry access.
fn simple_check(ctx: &CoreContext, mnb: &mut BroadcastRecord) -> Result<(), Rejection> {
    if !is_valid_net_addr(&mnb.identity.addr, ctx.network) {
        warn!(
            "broadcast: invalid addr, rejected: masternode={} addr={}",
            mnb.identity.key_id_hex(),
            mnb.identity.addr
        );
        return Err(RejectReason::InvalidAddr.into());
    }

    // past is fine, the future is not
    if mnb.identity.sig_time > ctx.adjusted_time() + MAX_FUTURE_SIG_TIME_SECONDS {
        warn!(
            "broadcast: signature rejected, too far into the future: masternode={}",
            mnb.identity.key_id_hex()
        );
        return Err(RejectReason::FutureSigTime.into());
    }

    // an absent or stale embedded ping is not the peer's fault; the
    // candidate enters as expired and the remaining rules still apply
    let ping_ok = match &mnb.last_ping {
        Some(ping) => ping::simple_check(ctx, ping).is_ok(),
        None => false,
    };
    if !ping_ok {
        mnb.entry_state = ActiveState::Expired;
    }

    if mnb.identity.protocol_version < ctx.payments.min_proto() {
        warn!(
            "broadcast: ignoring outdated masternode: masternode={} protocol={}",
            mnb.identity.key_id_hex(),
            mnb.identity.protocol_version
        );
        return Err(RejectReason::OutdatedProtocol.into());
    }

    if mnb.identity.payee.script().len() != P2PKH_SCRIPT_LEN {
        warn!("broadcast: payee script has the wrong size");
        return Err(RejectReason::BadScriptSize.into());
    }

    if script_for_key_id(&key_id(&mnb.identity.pub_key_masternode)).len() != P2PKH_SCRIPT_LEN {
        warn!("broadcast: masternode key script has the wrong size");
        return Err(RejectReason::BadScriptSize.into());
    }

    let mainnet_port = NetworkType::Mainnet.default_p2p_port();
    let port = mnb.identity.addr.port();
    if ctx.network == NetworkType::Mainnet {
        if port != mainnet_port {
            return Err(RejectReason::WrongPort.into());
        }
    } else if port == mainnet_port {
        return Err(RejectReason::WrongPort.into());
    }

    Ok(())
}

/// Phase 2: merge into an existing entry. The caller holds the entry
/// mutex.
fn update_existing(
    ctx: &CoreContext,
    entry: &mut MasternodeEntry,
    mnb: &BroadcastRecord,
) -> Result<BroadcastOutcome, Rejection> {
    // the seen cache filters legit duplicates, but one can still arrive
    // right after startup; just do nothing
    if entry.identity.sig_time == mnb.identity.sig_time && !mnb.f_recovery {
        return Ok(BroadcastOutcome::Duplicate);
    }

    // older than what we hold: should never happen unless someone is
    // doing something fishy
    if entry.identity.sig_time > mnb.identity.sig_time {
        warn!(
            "broadcast: bad sig_time {} (existing broadcast is at {}) for masternode {} {}",
            mnb.identity.sig_time,
            entry.identity.sig_time,
            mnb.identity.key_id_hex(),
            mnb.identity.addr
        );
        return Err(RejectReason::StaleBroadcast.into());
    }

    evaluate(entry, ctx, false);

    if entry.is_pose_banned() {
        warn!(
            "broadcast: banned by PoSe, masternode={}",
            mnb.identity.key_id_hex()
        );
        return Err(RejectReason::BannedByPoSe.into());
    }

    if entry.identity.payee != mnb.identity.payee {
        warn!(
            "broadcast: got mismatched payee, {} vs {}",
            entry.identity.payee, mnb.identity.payee
        );
        return Err(Rejection::with_dos(RejectReason::PayeeMismatch, 33));
    }

    // misattribution is possible on this path, so no penalty
    mnb.verify_signature(ctx.network)
        .map_err(|_| Rejection::with_dos(RejectReason::BadSignature, 0))?;

    // rate-limit broadcast churn: merge only when the entry has been
    // quiet for a while, or the broadcast is our own
    let now = ctx.adjusted_time();
    let ours = ctx.is_our_masternode(&mnb.identity.pub_key_masternode);
    if entry.is_broadcasted_within(MIN_MNB_SECONDS, now) && !ours {
        debug!(
            "broadcast: rebroadcast too soon, masternode={}",
            mnb.identity.key_id_hex()
        );
        return Ok(BroadcastOutcome::Throttled);
    }

    info!("broadcast: got UPDATED masternode entry: addr={}", mnb.identity.addr);
    merge_from_broadcast(ctx, entry, mnb)?;
    evaluate(entry, ctx, false);

    ctx.connman.relay_inv(Inv {
        kind: InvKind::MasternodeAnnounce,
        hash: mnb.relay_hash(),
    });
    ctx.sync.bump_asset_last_time("broadcast::update");

    Ok(BroadcastOutcome::Updated)
}

/// Replace the entry's signed fields with the newer broadcast's, resetting
/// the proof-of-service slate.
fn merge_from_broadcast(
    ctx: &CoreContext,
    entry: &mut MasternodeEntry,
    mnb: &BroadcastRecord,
) -> Result<(), Rejection> {
    entry.identity = mnb.identity.clone();
    entry.pose_ban_score = 0;
    entry.pose_ban_height = 0;
    entry.n_time_last_checked = 0;

    if let Some(new_ping) = &mnb.last_ping {
        if ping::check_and_update(ctx, entry, new_ping, true).is_ok() {
            ctx.registry.note_seen_ping(new_ping.clone());
        }
    }

    apply_local_activation(ctx, entry)
}

/// Admit a broadcast with no existing entry.
fn admit_new(ctx: &CoreContext, mnb: BroadcastRecord) -> Result<BroadcastOutcome, Rejection> {
    let hash = mnb.relay_hash();
    let ours = ctx.is_our_masternode(&mnb.identity.pub_key_masternode);

    if ours {
        // our own announcement coming back at us; no point re-verifying
        // our own signature
        info!("broadcast: target masternode reached");
    } else {
        mnb.verify_signature(ctx.network)
            .map_err(|_| Rejection::with_dos(RejectReason::BadSignature, 100))?;

        if !ctx.chain.try_read_lock() {
            // not the broadcast's fault; evict it from the seen cache so
            // it can be re-requested and checked again later
            debug!(
                "broadcast: failed to acquire chain lock, addr={}",
                mnb.identity.addr
            );
            ctx.registry.forget_broadcast(&hash);
            return Err(RejectReason::ChainBusy.into());
        }
    }

    let mut entry = MasternodeEntry::from(&mnb);
    apply_local_activation(ctx, &mut entry)?;
    evaluate(&mut entry, ctx, true);

    if let Some(new_ping) = &mnb.last_ping {
        ctx.registry.note_seen_ping(new_ping.clone());
    }
    ctx.registry.insert(entry);

    ctx.connman.relay_inv(Inv {
        kind: InvKind::MasternodeAnnounce,
        hash,
    });
    ctx.sync.bump_asset_last_time("broadcast::insert");

    Ok(BroadcastOutcome::Inserted)
}

/// If the broadcast matches the locally-operated key, mark the entry
/// PoSe-verified and fire the activation hook; a stale local protocol
/// version instead asks the operator to reactivate.
fn apply_local_activation(ctx: &CoreContext, entry: &mut MasternodeEntry) -> Result<(), Rejection> {
    if !ctx.is_our_masternode(&entry.identity.pub_key_masternode) {
        return Ok(());
    }

    entry.pose_ban_score = -POSE_BAN_MAX_SCORE;
    if entry.identity.protocol_version == ctx.protocol_version {
        // we've been remotely activated
        ctx.active.manage_state();
        Ok(())
    } else {
        warn!(
            "broadcast: wrong protocol version, re-activate your masternode: message protocol={} ours={}",
            entry.identity.protocol_version, ctx.protocol_version
        );
        Err(RejectReason::OutdatedProtocol.into())
    }
}
