// created = "2026-10-16"
// modified = "2026-10-16"

//! Vector clocks over dense site indices.
//!
//! # Vector Clock
//!
//! Index `i` of the clock is the number of operations generated by site `i`
//! that the owner has observed. Missing trailing entries are implicitly
//! zero, so clocks of different lengths compare as if padded.
//!
//! Complexity:
//! - seq_for_site / set_seq_for_site: O(1) amortized
//! - compare: O(n) where n is the longer length
//! - subtract: O(n + d) where d is the size of the difference
//!
//! # Clock Difference
//!
//! The set of (site, seq) pairs present in one clock's causal past and
//! absent from another's. Produced by `VectorClock::subtract` and
//! `VectorClock::oldest_difference`, never persisted.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use super::id::OpKey;
use super::id::Seq;
use super::id::SiteId;
use crate::Result;
use crate::error::EngineError;

/// Per-site operation counters.
#[derive(Clone, Debug, Default)]
pub struct VectorClock {
    sites: Vec<Seq>,
}

impl VectorClock {
    /// Create an empty clock.
    pub fn new() -> VectorClock {
        return VectorClock { sites: Vec::new() };
    }

    /// Create a zeroed clock covering `count` sites.
    pub fn with_count(count: usize) -> VectorClock {
        return VectorClock {
            sites: vec![0; count],
        };
    }

    /// Create a clock from raw per-site counts.
    pub fn from_sites(sites: Vec<Seq>) -> VectorClock {
        return VectorClock { sites };
    }

    /// Create a clock from an optional wire context.
    ///
    /// Fails with `UninitializedClock` when no context was supplied.
    pub fn from_state(sites: Option<Vec<Seq>>) -> Result<VectorClock> {
        match sites {
            Some(sites) => Ok(VectorClock { sites }),
            None => Err(EngineError::UninitializedClock),
        }
    }

    /// The raw per-site counts.
    #[inline]
    pub fn sites(&self) -> &[Seq] {
        return &self.sites;
    }

    /// Number of explicitly stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        return self.sites.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.sites.is_empty();
    }

    /// Count of operations observed from `site`.
    ///
    /// Indices past the end read as zero without extending the clock;
    /// callers that need the slot materialized use `grow_to`.
    #[inline]
    pub fn seq_for_site(&self, site: SiteId) -> Seq {
        return self.sites.get(site).copied().unwrap_or(0);
    }

    /// Set the count for `site`, extending the clock if needed.
    pub fn set_seq_for_site(&mut self, site: SiteId, seq: Seq) {
        if site >= self.sites.len() {
            self.grow_to(site + 1);
        }
        self.sites[site] = seq;
    }

    /// Extend to at least `count` entries. Never truncates.
    pub fn grow_to(&mut self, count: usize) {
        if count > self.sites.len() {
            self.sites.resize(count, 0);
        }
    }

    /// Lexicographic comparison over the zero-padded union of indices.
    pub fn compare(&self, other: &VectorClock) -> Ordering {
        let max = self.sites.len().max(other.sites.len());
        for i in 0..max {
            match self.seq_for_site(i).cmp(&other.seq_for_site(i)) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        return Ordering::Equal;
    }

    /// True if both clocks agree on every site.
    #[inline]
    pub fn equals(&self, other: &VectorClock) -> bool {
        return self.compare(other) == Ordering::Equal;
    }

    /// Every operation in `self`'s past that `other` has not seen.
    ///
    /// For each site where `self` is ahead, emits `other + 1 ..= self`.
    pub fn subtract(&self, other: &VectorClock) -> ClockDifference {
        let mut cd = ClockDifference::new();
        for (site, &ours) in self.sites.iter().enumerate() {
            let theirs = other.seq_for_site(site);
            for seq in (theirs + 1)..=ours {
                cd.push(site, seq);
            }
        }
        return cd;
    }

    /// The earliest missing operation per site where `self` is ahead.
    pub fn oldest_difference(&self, other: &VectorClock) -> ClockDifference {
        let mut cd = ClockDifference::new();
        for (site, &ours) in self.sites.iter().enumerate() {
            let theirs = other.seq_for_site(site);
            if ours > theirs {
                cd.push(site, theirs + 1);
            }
        }
        return cd;
    }

    /// Lower every entry to the minimum of `self` and `other`.
    ///
    /// Only the first `count` indices are considered; the result is grown
    /// to cover them.
    pub fn meet(&mut self, other: &VectorClock, count: usize) {
        self.grow_to(count);
        for site in 0..count {
            let theirs = other.seq_for_site(site);
            if theirs < self.sites[site] {
                self.sites[site] = theirs;
            }
        }
    }
}

impl PartialEq for VectorClock {
    fn eq(&self, other: &Self) -> bool {
        return self.equals(other);
    }
}

impl Eq for VectorClock {}

impl PartialOrd for VectorClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for VectorClock {
    fn cmp(&self, other: &Self) -> Ordering {
        return self.compare(other);
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, seq) in self.sites.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{seq}")?;
        }
        return write!(f, "]");
    }
}

/// An unordered set of (site, seq) pairs.
///
/// Most differences seen during transformation are a handful of entries,
/// so they stay inline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClockDifference {
    entries: SmallVec<[OpKey; 8]>,
}

impl ClockDifference {
    /// Create an empty difference.
    pub fn new() -> ClockDifference {
        return ClockDifference {
            entries: SmallVec::new(),
        };
    }

    /// Add an operation to the difference.
    #[inline]
    pub fn push(&mut self, site: SiteId, seq: Seq) {
        self.entries.push(OpKey::new(site, seq));
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Check membership of a (site, seq) pair.
    pub fn contains(&self, site: SiteId, seq: Seq) -> bool {
        return self.entries.iter().any(|k| k.site == site && k.seq == seq);
    }

    /// Iterate over the keys in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &OpKey> {
        return self.entries.iter();
    }
}

impl FromIterator<OpKey> for ClockDifference {
    fn from_iter<I: IntoIterator<Item = OpKey>>(iter: I) -> Self {
        return ClockDifference {
            entries: iter.into_iter().collect(),
        };
    }
}
