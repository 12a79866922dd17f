// created = "2026-10-16"
// modified = "2026-10-16"

//! Table of the last known clock of every site.
//!
//! The table answers one question for garbage collection: what is the
//! oldest state any participating site might still be in? Slot `i` holds
//! the clock most recently reported by site `i`.
//!
//! A slot can instead mirror the owning engine's own clock (`Slot::Local`).
//! The engine's own slot is always `Local`, and freezing a departed site
//! points its slot at the local clock too, so it no longer holds back the
//! minimum. Because the local clock lives in the engine, methods that need
//! it take it as an argument.
//!
//! Complexity:
//! - update_with_clock: O(n) when the table grows, O(1) otherwise
//! - minimum_clock: O(n²) where n is the number of slots

use super::clock::VectorClock;
use super::id::Seq;
use super::id::SiteId;
use crate::ot::op::Operation;

/// One entry of the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Mirrors the engine's own clock.
    Local,
    /// An independent copy reported by the site.
    Clock(VectorClock),
}

impl Slot {
    #[inline]
    fn resolve<'a>(&'a self, local: &'a VectorClock) -> &'a VectorClock {
        return match self {
            Slot::Local => local,
            Slot::Clock(cv) => cv,
        };
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClockTable {
    slots: Vec<Slot>,
}

impl ClockTable {
    /// Create a table owned by `site`, whose slot mirrors the local clock.
    pub fn new(site: SiteId) -> ClockTable {
        let mut table = ClockTable { slots: Vec::new() };
        table.grow_to(site + 1);
        table.slots[site] = Slot::Local;
        return table;
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        return self.slots.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.slots.is_empty();
    }

    /// Grow to `count` slots; every stored clock is grown to match.
    ///
    /// `Local` slots are not touched, so the engine grows its own clock to
    /// `len()` after any call that may have grown the table.
    pub fn grow_to(&mut self, count: usize) {
        for slot in self.slots.iter_mut() {
            if let Slot::Clock(cv) = slot {
                cv.grow_to(count);
            }
        }
        while self.slots.len() < count {
            self.slots.push(Slot::Clock(VectorClock::with_count(count)));
        }
    }

    /// The clock for `site`, growing the table to cover it.
    pub fn clock<'a>(&'a mut self, site: SiteId, local: &'a VectorClock) -> &'a VectorClock {
        if site >= self.slots.len() {
            self.grow_to(site + 1);
        }
        return self.slots[site].resolve(local);
    }

    /// Check if `site` mirrors the local clock.
    pub fn is_frozen(&self, site: SiteId) -> bool {
        return matches!(self.slots.get(site), Some(Slot::Local));
    }

    /// Store `cv` as the last known clock of `site`.
    pub fn update_with_clock(&mut self, site: SiteId, mut cv: VectorClock) {
        if site >= self.slots.len() {
            self.grow_to(site + 1);
        }
        cv.grow_to(site + 1);
        self.slots[site] = Slot::Clock(cv);
    }

    /// Store the clock an operation implies for its origin site.
    ///
    /// That is the operation's own context plus the operation itself.
    pub fn update_with_operation(&mut self, op: &Operation) {
        let mut cv = op.clock().clone();
        cv.set_seq_for_site(op.site(), op.seq());
        self.update_with_clock(op.site(), cv);
    }

    /// Point `site` at the local clock. Returns false if it already was.
    pub fn freeze(&mut self, site: SiteId) -> bool {
        if site >= self.slots.len() {
            self.grow_to(site + 1);
        }
        if self.slots[site] == Slot::Local {
            return false;
        }
        self.slots[site] = Slot::Local;
        return true;
    }

    /// Pointwise minimum over every slot, starting from slot 0.
    ///
    /// `None` when the table has no slots.
    pub fn minimum_clock(&self, local: &VectorClock) -> Option<VectorClock> {
        let first = self.slots.first()?;
        let count = self.slots.len();

        let mut mcv = first.resolve(local).clone();
        for slot in &self.slots {
            mcv.meet(slot.resolve(local), count);
        }
        return Some(mcv);
    }

    /// Slots other than `skip` whose clock equals `cv`.
    pub fn equivalents(&self, cv: &VectorClock, skip: SiteId, local: &VectorClock) -> Vec<SiteId> {
        return self
            .slots
            .iter()
            .enumerate()
            .filter(|(i, slot)| *i != skip && slot.resolve(local).equals(cv))
            .map(|(i, _)| i)
            .collect();
    }

    /// Raw clocks of every slot; local slots are written out as copies.
    pub fn state(&self, local: &VectorClock) -> Vec<Vec<Seq>> {
        return self
            .slots
            .iter()
            .map(|slot| slot.resolve(local).sites().to_vec())
            .collect();
    }

    /// Replace every slot with an independent clock.
    pub fn set_state(&mut self, rows: Vec<Vec<Seq>>) {
        self.slots = rows
            .into_iter()
            .map(|sites| Slot::Clock(VectorClock::from_sites(sites)))
            .collect();
    }
}
