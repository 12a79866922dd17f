// created = "2026-10-16"
// modified = "2026-10-16"

//! Identifier types for operations and sites.
//!
//! # Identifier Hierarchy
//!
//! - `SiteId`: index of a participant; also its slot in every vector clock
//! - `Seq`: per-site operation counter, starting at 1
//! - `OpKey`: identifies an operation (site, seq)
//! - `Order`: server-assigned total-order rank, possibly unassigned

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// Index of a participating site.
pub type SiteId = usize;

/// Per-site sequence number. The first operation of a site has seq 1.
pub type Seq = u64;

/// History buffer key.
///
/// The (site, seq) pair is globally unique because every site numbers its
/// own operations densely and never reuses a number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpKey {
    /// The site that generated the operation.
    pub site: SiteId,
    /// The sequence number at that site.
    pub seq: Seq,
}

impl OpKey {
    /// Create a new operation key.
    pub fn new(site: SiteId, seq: Seq) -> OpKey {
        return OpKey { site, seq };
    }
}

impl PartialOrd for OpKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for OpKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Compare by site first, then by seq
        match self.site.cmp(&other.site) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            other => other,
        }
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{},{}", self.site, self.seq);
    }
}

/// A total-order rank assigned by the server.
///
/// Local operations are ranked only once their echo comes back, so the
/// rank uses a sentinel for "not yet known". Serialized as `null` in that
/// case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Order(pub u64);

impl Order {
    /// Sentinel value for an operation without a rank.
    pub const UNASSIGNED: Order = Order(u64::MAX);

    /// Create a rank.
    #[inline]
    pub fn new(rank: u64) -> Order {
        return Order(rank);
    }

    /// Check if this is the unassigned sentinel.
    #[inline]
    pub fn is_unassigned(&self) -> bool {
        return self.0 == u64::MAX;
    }

    /// The rank, if assigned.
    #[inline]
    pub fn get(&self) -> Option<u64> {
        if self.is_unassigned() {
            return None;
        }
        return Some(self.0);
    }

    /// Convert from the optional form used on the wire.
    #[inline]
    pub fn from_option(rank: Option<u64>) -> Order {
        return match rank {
            Some(r) => Order(r),
            None => Order::UNASSIGNED,
        };
    }
}

impl Default for Order {
    fn default() -> Self {
        return Order::UNASSIGNED;
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(rank) => write!(f, "{rank}"),
            None => f.write_str("unassigned"),
        }
    }
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return self.get().serialize(serializer);
    }
}

impl<'de> Deserialize<'de> for Order {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rank = Option::<u64>::deserialize(deserializer)?;
        return Ok(Order::from_option(rank));
    }
}
