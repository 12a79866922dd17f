// created = "2026-10-16"
// modified = "2026-10-16"

//! Error types for the operation engine.

use thiserror::Error;

use crate::ot::primitives::id::Order;
use crate::ot::primitives::id::Seq;
use crate::ot::primitives::id::SiteId;

/// Errors surfaced by clocks, the history buffer and the engine.
///
/// Every variant except `Serialization` indicates either malformed input
/// from a peer or a broken causality invariant. The engine does not try to
/// recover from any of them; the caller decides whether to drop the message
/// or resynchronize the site.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A clock was built from a missing context.
    #[error("vector clock has no site entries")]
    UninitializedClock,

    /// A clock difference named an operation the history no longer holds.
    #[error("no history entry for site {site} seq {seq}")]
    MissingHistoryEntry { site: SiteId, seq: Seq },

    /// This site's clock has used up every sequence number.
    #[error("site {site} has no sequence numbers left")]
    SequenceOverflow { site: SiteId },

    /// Attempted to transform or upgrade a sealed operation.
    #[error("operation is immutable")]
    ImmutableViolation,

    /// A remote echo tried to change an already assigned total order.
    #[error("op ({site}, {seq}) already has order {existing}, got {incoming}")]
    DuplicateTotalOrder {
        site: SiteId,
        seq: Seq,
        existing: Order,
        incoming: Order,
    },

    /// A remote op arrived without a total order.
    #[error("remote op ({site}, {seq}) has no total order")]
    MissingTotalOrder { site: SiteId, seq: Seq },

    /// Two operations with unequal clocks produced no difference.
    #[error("empty clock difference between unequal contexts")]
    EmptyContextDifference,

    /// Recursive transformation ended with mismatched clocks.
    #[error("operation contexts still differ after transformation")]
    UnequalContext,

    /// The operation type string is not insert, delete or update.
    #[error("unknown operation type: {0:?}")]
    UnknownOperationType(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
