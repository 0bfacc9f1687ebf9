//! Masternode lifecycle core.
//!
//! Tracks the gossiped set of masternodes through two signed message
//! types: broadcasts (self-announcements) and pings (liveness proofs).
//! Inbound messages are validated against adversarial input, merged into
//! the registry, and each entry's public state is re-derived on demand by
//! the evaluator. A deterministic per-block score feeds the payment
//! election upstream, and the builder assembles the locally-operated
//! masternode's own announcement.
//!
//! Transport, block storage, the election tally, key storage and sync
//! coordination are collaborators reached through [`context::CoreContext`].

pub mod broadcast;
pub mod builder;
pub mod config;
pub mod constants;
pub mod context;
pub mod entry;
pub mod error;
pub mod evaluator;
pub mod last_paid;
pub mod message;
pub mod ping;
pub mod registry;
pub mod score;
pub mod types;

pub use broadcast::{process_broadcast, BroadcastOutcome};
pub use builder::build_self_broadcast;
pub use config::CoreConfig;
pub use context::{CoreContext, NetworkTime};
pub use entry::{ActiveState, MasternodeEntry, MasternodeInfo};
pub use error::{RejectReason, Rejection};
pub use evaluator::evaluate;
pub use last_paid::update_last_paid;
pub use message::{BroadcastRecord, Inv, InvKind, PingRecord, VerificationRecord};
pub use ping::{process_ping, PingOutcome};
pub use registry::Registry;
pub use score::calculate_score;
pub use types::{NetworkType, PayoutAddress};
