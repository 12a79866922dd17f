// created = "2026-10-16"
// modified = "2026-10-16"

//! Building blocks shared by the history buffer and the engine.
//!
//! # Primitives
//!
//! ## Identifiers
//! - `SiteId`, `Seq`: site index and per-site counter
//! - `OpKey`: operation identifier (site, seq)
//! - `Order`: server-assigned total-order rank
//!
//! ## Clocks
//! - `VectorClock`: per-site counters, compared as if zero-padded
//! - `ClockDifference`: operations in one clock's past but not another's
//! - `ClockTable`: last known clock of every site, for garbage collection

pub mod clock;
pub mod clock_table;
pub mod id;

// Re-exports for convenience
pub use clock::ClockDifference;
pub use clock::VectorClock;
pub use clock_table::ClockTable;
pub use clock_table::Slot;
pub use id::OpKey;
pub use id::Order;
pub use id::Seq;
pub use id::SiteId;
