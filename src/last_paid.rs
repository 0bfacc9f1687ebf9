//! Backward scan of recent blocks for the entry's last coinbase payment.

use crate::context::{BlockIndex, CoreContext};
use crate::entry::MasternodeEntry;
use tracing::debug;

/// Minimum tally votes for a payee to count as scheduled at a height
const MIN_PAYEE_VOTES: u32 = 2;

/// Walk back from `tip` for at most `max_blocks_to_scan` blocks and record
/// the most recent block whose coinbase actually paid this entry's payout
/// script the expected masternode share. Stops at genesis without error.
pub fn update_last_paid(
    ctx: &CoreContext,
    entry: &mut MasternodeEntry,
    tip: &BlockIndex,
    max_blocks_to_scan: u64,
) {
    let payee_script = entry.identity.payee.script();

    let mut height = tip.height;
    let mut scanned = 0u64;

    while scanned < max_blocks_to_scan && height > entry.n_block_last_paid {
        if ctx
            .payments
            .has_payee_with_votes(height, &payee_script, MIN_PAYEE_VOTES)
        {
            // shouldn't really fail to read here; skip the block if it does
            if let Some(block) = ctx
                .chain
                .block_at(height)
                .and_then(|index| ctx.chain.read_block(&index))
            {
                let payment = ctx
                    .payments
                    .masternode_payment(height, block.coinbase_value());
                for txout in &block.coinbase {
                    if txout.script_pubkey == payee_script && txout.value == payment {
                        entry.n_block_last_paid = height;
                        entry.n_time_last_paid = block.index.time;
                        debug!(
                            "last-paid: searching for block with payment to {} -- found new {}",
                            entry.identity.payee, entry.n_block_last_paid
                        );
                        return;
                    }
                }
            }
        }

        if height == 0 {
            break; // genesis
        }
        height -= 1;
        scanned += 1;
    }

    // last payment wasn't found in the scanned window, or the tally
    // recorded it but the chain never carried it; keep the old value
}
