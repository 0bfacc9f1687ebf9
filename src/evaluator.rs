//! On-demand re-derivation of an entry's public state.
//!
//! Callers hold the entry mutex for the whole evaluation; the registry map
//! lock must not be held in write mode around this call.

use crate::constants::lifecycle::{
    CHECK_SECONDS, EXPIRATION_SECONDS, MIN_MNP_SECONDS, NEW_START_REQUIRED_SECONDS,
    POSE_BAN_MAX_SCORE,
};
use crate::context::CoreContext;
use crate::entry::{ActiveState, MasternodeEntry};
use tracing::{debug, info, warn};

/// Apply the expiry/ban/enable state machine to `entry`. Results are
/// cached for `CHECK_SECONDS` unless `force` is set.
pub fn evaluate(entry: &mut MasternodeEntry, ctx: &CoreContext, force: bool) {
    if ctx.shutdown.is_cancelled() {
        return;
    }

    let now = ctx.adjusted_time();
    if !force && now - entry.n_time_last_checked < CHECK_SECONDS {
        return;
    }
    entry.n_time_last_checked = now;

    debug!(
        "evaluate: masternode {} is in {} state",
        entry.identity.key_id_hex(),
        entry.state_string()
    );

    // the external list is authoritative; an unlisted key keeps whatever
    // state it had
    if !ctx
        .allowlist
        .contains(&entry.identity.pub_key_masternode.to_bytes())
    {
        debug!(
            "evaluate: masternode {} is not on the list",
            entry.identity.key_id_hex()
        );
        return;
    }

    let height = ctx.chain.height();

    if entry.is_pose_banned() {
        if height < entry.pose_ban_height {
            return; // too early
        }
        // Give it a chance to run the usual checks and change state. The
        // node stays on the edge and is banned right back if it keeps
        // ignoring verify challenges.
        info!(
            "evaluate: masternode {} is unbanned and back in list now",
            entry.identity.key_id_hex()
        );
        entry.decrease_pose_ban_score();
    } else if entry.pose_ban_score >= POSE_BAN_MAX_SCORE {
        entry.active_state = ActiveState::PoSeBan;
        // ban for the whole payment cycle
        entry.pose_ban_height = height + ctx.registry.size() as u64;
        warn!(
            "evaluate: masternode {} is banned till block {}",
            entry.identity.key_id_hex(),
            entry.pose_ban_height
        );
        return;
    }

    let prev_state = entry.active_state;
    let ours = ctx.is_our_masternode(&entry.identity.pub_key_masternode);

    // below the payment protocol floor, or our own node still waiting for
    // activation after an upgrade
    let require_update = entry.identity.protocol_version < ctx.payments.min_proto()
        || (ours && entry.identity.protocol_version < ctx.protocol_version);

    if require_update {
        set_state(entry, ActiveState::UpdateRequired, prev_state);
        return;
    }

    // keep old masternodes on start, give them a chance to receive updates
    let wait_for_ping =
        !ctx.sync.is_list_synced() && !entry.is_pinged_within(MIN_MNP_SECONDS, now);

    if wait_for_ping && !ours {
        // but an entry that was already expired before this check stays put
        if entry.is_expired() || entry.is_new_start_required() {
            debug!(
                "evaluate: masternode {} is in {} state, waiting for ping",
                entry.identity.key_id_hex(),
                entry.state_string()
            );
            return;
        }
    }

    // don't expire while still in "waiting for ping" mode unless it's ours
    if !wait_for_ping || ours {
        if !entry.is_pinged_within(NEW_START_REQUIRED_SECONDS, now) {
            set_state(entry, ActiveState::NewStartRequired, prev_state);
            return;
        }
        if !entry.is_pinged_within(EXPIRATION_SECONDS, now) {
            set_state(entry, ActiveState::Expired, prev_state);
            return;
        }
    }

    let ping_margin = entry
        .last_ping
        .as_ref()
        .map_or(i64::MIN, |ping| ping.sig_time - entry.identity.sig_time);
    if ping_margin < MIN_MNP_SECONDS {
        set_state(entry, ActiveState::PreEnabled, prev_state);
        return;
    }

    set_state(entry, ActiveState::Enabled, prev_state);
}

fn set_state(entry: &mut MasternodeEntry, state: ActiveState, prev: ActiveState) {
    entry.active_state = state;
    if prev != state {
        debug!(
            "evaluate: masternode {} is in {} state now",
            entry.identity.key_id_hex(),
            entry.state_string()
        );
    }
}
