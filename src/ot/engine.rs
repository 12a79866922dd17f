// created = "2026-10-16"
// modified = "2026-10-16"

//! The operation engine for one site.
//!
//! The engine owns this site's clock, its history buffer and its clock
//! table. Local edits are stamped and stored. Remote edits are transformed
//! through every stored operation they have not seen, then stored in their
//! original form.
//!
//! # Transformation
//!
//! For a remote operation `op` with clock `c`, the engine resolves
//! `own_clock - c` to stored operations ordered by total order and folds
//! each of them into a private copy of `op`. A stored operation `x` whose
//! clock differs from the copy's current clock is first brought into the
//! same context, either from `x`'s transform cache or by recursively
//! transforming `x` through `clock(op) - clock(x)`.
//!
//! Every step also produces the symmetric transform of `x` against the
//! pre-step copy of `op`. Both results are cached on the stored originals,
//! bounded to `site_count - 1` entries each.
//!
//! # Garbage Collection
//!
//! `purge` drops every operation that precedes, in causal order, the
//! oldest operation some site in the clock table has not yet seen. Frozen
//! sites mirror the local clock and so never hold anything back.

use tracing::debug;
use tracing::trace;

use super::history::HistoryBuffer;
use super::op::Edit;
use super::op::Operation;
use super::op::TransformCache;
use super::primitives::clock::ClockDifference;
use super::primitives::clock::VectorClock;
use super::primitives::clock_table::ClockTable;
use super::primitives::id::OpKey;
use super::primitives::id::Order;
use super::primitives::id::Seq;
use super::primitives::id::SiteId;
use super::state::EngineState;
use crate::Result;
use crate::error::EngineError;

/// Where an edit handed to `push` came from.
#[derive(Clone, Debug)]
pub enum Origin {
    /// Generated at this site.
    Local,
    /// Received from `site`, made against `clock` and ranked `order`.
    Remote {
        site: SiteId,
        clock: VectorClock,
        order: Order,
    },
}

#[derive(Clone, Debug)]
pub struct OperationEngine {
    site: SiteId,
    clock: VectorClock,
    table: ClockTable,
    history: HistoryBuffer,
    site_count: usize,
}

impl OperationEngine {
    /// Create an engine for `site` with an empty history.
    pub fn new(site: SiteId) -> OperationEngine {
        return OperationEngine {
            site,
            clock: VectorClock::with_count(site + 1),
            table: ClockTable::new(site),
            history: HistoryBuffer::new(),
            site_count: 1,
        };
    }

    #[inline]
    pub fn site(&self) -> SiteId {
        return self.site;
    }

    /// This site's current clock.
    #[inline]
    pub fn clock(&self) -> &VectorClock {
        return &self.clock;
    }

    /// An independent copy of the current clock.
    pub fn copy_clock(&self) -> VectorClock {
        return self.clock.clone();
    }

    /// Number of operations still held for transformation.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        return self.history.count();
    }

    /// Number of sites currently participating, including this one.
    #[inline]
    pub fn site_count(&self) -> usize {
        return self.site_count;
    }

    #[inline]
    pub fn history(&self) -> &HistoryBuffer {
        return &self.history;
    }

    #[inline]
    pub fn table(&self) -> &ClockTable {
        return &self.table;
    }

    /// Build an operation for `edit` without pushing it.
    ///
    /// The sequence number is one past the origin's own entry in the
    /// operation's clock. A remote clock already at the last sequence number
    /// names history this site cannot hold and fails with
    /// `MissingHistoryEntry`.
    pub fn create_op(&self, edit: Edit, origin: Origin) -> Result<Operation> {
        return match origin {
            Origin::Local => {
                let clock = self.clock.clone();
                let seq = clock
                    .seq_for_site(self.site)
                    .checked_add(1)
                    .ok_or(EngineError::SequenceOverflow { site: self.site })?;
                Ok(Operation::new(edit, self.site, seq, clock, Order::UNASSIGNED, true))
            }
            Origin::Remote { site, clock, order } => {
                let Some(seq) = clock.seq_for_site(site).checked_add(1) else {
                    return Err(EngineError::MissingHistoryEntry {
                        site,
                        seq: self.clock.seq_for_site(site).saturating_add(1),
                    });
                };
                Ok(Operation::new(edit, site, seq, clock, order, false))
            }
        };
    }

    /// Process an edit.
    ///
    /// Local edits always return the stamped operation. Remote edits return
    /// the copy to apply, or `None` when the edit was already processed or
    /// has been nullified by a concurrent operation.
    pub fn push(&mut self, edit: Edit, origin: Origin) -> Result<Option<Operation>> {
        let op = self.create_op(edit, origin)?;
        if op.is_local() {
            return Ok(Some(self.push_local_op(op)));
        }
        return self.push_remote_op(op);
    }

    /// Store a local operation and advance the clock.
    pub fn push_local_op(&mut self, op: Operation) -> Operation {
        self.clock.set_seq_for_site(op.site(), op.seq());
        self.sync_local_len();
        let copy = op.detached();
        self.history.add_local(op);
        return copy;
    }

    /// Transform and store a remote operation.
    pub fn push_remote_op(&mut self, op: Operation) -> Result<Option<Operation>> {
        if op.order().is_unassigned() {
            return Err(EngineError::MissingTotalOrder {
                site: op.site(),
                seq: op.seq(),
            });
        }

        if self.has_processed(&op) {
            trace!(op = %op.op_key(), "already processed");
            // purged entries stay purged
            if self.history.contains(&op.op_key()) {
                self.history.add_remote(op)?;
            }
            return Ok(None);
        }
        self.check_ready(&op)?;

        let mut pending = TransformCache::new();
        let result = if self.clock.equals(op.clock()) {
            Some(op.detached())
        } else {
            let cd = self.clock.subtract(op.clock());
            debug!(
                op = %op.op_key(),
                clock = %op.clock(),
                local = %self.clock,
                difference = cd.len(),
                "transforming remote op"
            );
            self.transform(op.detached(), &cd, &mut pending)?
        };

        if result.is_none() {
            trace!(op = %op.op_key(), "remote op nullified");
        }

        self.clock.set_seq_for_site(op.site(), op.seq());
        let mut original = op;
        original.replace_cache(pending);
        self.table.update_with_operation(&original);
        self.history.add_remote(original)?;
        self.sync_local_len();
        return Ok(result);
    }

    /// Every operation in `op`'s context from another site must already be
    /// here. Checked before any difference is built, so a corrupt context
    /// costs nothing.
    fn check_ready(&self, op: &Operation) -> Result<()> {
        for (site, &seq) in op.clock().sites().iter().enumerate() {
            let ours = self.clock.seq_for_site(site);
            if site != op.site() && seq > ours {
                debug!(op = %op.op_key(), site, seq, ours, "context ahead of local clock");
                return Err(EngineError::MissingHistoryEntry {
                    site,
                    seq: ours.saturating_add(1),
                });
            }
        }
        return Ok(());
    }

    /// True if this site has already seen `op`.
    pub fn has_processed(&self, op: &Operation) -> bool {
        return self.clock.seq_for_site(op.site()) >= op.seq();
    }

    /// Record the clock reported by another site.
    pub fn push_sync(&mut self, site: SiteId, clock: VectorClock) {
        if site == self.site {
            return;
        }
        self.table.update_with_clock(site, clock);
        self.sync_local_len();
    }

    /// Record a reported clock given as raw per-site counts.
    pub fn push_sync_with_sites(&mut self, site: SiteId, sites: Vec<Seq>) {
        self.push_sync(site, VectorClock::from_sites(sites));
    }

    /// Fold every operation named in `cd` into `op`.
    ///
    /// `pending` collects cache entries for an `op` not yet in history.
    fn transform(
        &mut self,
        mut op: Operation,
        cd: &ClockDifference,
        pending: &mut TransformCache,
    ) -> Result<Option<Operation>> {
        let keys: Vec<OpKey> = self
            .history
            .ops_for_difference(cd)?
            .iter()
            .map(|x| x.op_key())
            .collect();

        for key in keys {
            let Some(stored) = self.history.get(&key) else {
                return Err(EngineError::MissingHistoryEntry {
                    site: key.site,
                    seq: key.seq,
                });
            };

            let mut x = stored.detached();
            if !op.clock().equals(x.clock()) {
                match stored.cache().get(op.clock()) {
                    Some(cached) => x = cached,
                    None => {
                        let xcd = op.clock().subtract(x.clock());
                        if xcd.is_empty() {
                            return Err(EngineError::EmptyContextDifference);
                        }
                        match self.transform(x, &xcd, pending)? {
                            Some(upgraded) => x = upgraded,
                            None => {
                                op.include(key)?;
                                continue;
                            }
                        }
                    }
                }
                if !op.clock().equals(x.clock()) {
                    return Err(EngineError::UnequalContext);
                }
            }

            let before = op.detached();
            op = match op.transform_with(&x)? {
                Some(transformed) => transformed,
                None => return Ok(None),
            };
            self.remember(&op, pending);

            if let Some(symmetric) = x.transform_with(&before)? {
                self.remember(&symmetric, pending);
            }
        }

        return Ok(Some(op));
    }

    /// Cache a transformed copy on its stored original, or in `pending`.
    fn remember(&mut self, op: &Operation, pending: &mut TransformCache) {
        let capacity = self.site_count.saturating_sub(1);
        if let Err(copy) = self.history.cache_transform(op.detached(), capacity) {
            pending.remember(&copy, capacity);
        }
    }

    /// Drop history no participating site can still need.
    ///
    /// Returns the minimum clock used, or `None` if there was nothing to do.
    pub fn purge(&mut self) -> Result<Option<VectorClock>> {
        if self.history.is_empty() {
            return Ok(None);
        }
        let Some(mcv) = self.table.minimum_clock(&self.clock) else {
            return Ok(None);
        };

        let min_key = self.oldest_needed(&mcv)?;
        let doomed: Vec<OpKey> = self
            .history
            .context_sorted_operations()
            .into_iter()
            .map(|op| op.op_key())
            .take_while(|key| Some(*key) != min_key)
            .collect();

        for key in &doomed {
            self.history.remove(key);
        }

        debug!(
            minimum = %mcv,
            removed = doomed.len(),
            remaining = self.history.count(),
            "purged history"
        );
        return Ok(Some(mcv));
    }

    /// The causally earliest operation some site behind `mcv` still needs.
    fn oldest_needed(&self, mcv: &VectorClock) -> Result<Option<OpKey>> {
        let cd = self.clock.oldest_difference(mcv);
        let mut stack: Vec<&Operation> = self.history.ops_for_difference(&cd)?;
        let mut min_op: Option<&Operation> = None;

        while let Some(curr) = stack.pop() {
            let earlier = match min_op {
                None => true,
                Some(min) => curr.compare_by_context(min).is_lt(),
            };
            if earlier {
                let cd = self.clock.oldest_difference(curr.clock());
                stack.extend(self.history.ops_for_difference(&cd)?);
                min_op = Some(curr);
            }
        }

        return Ok(min_op.map(|op| op.op_key()));
    }

    /// Stop `site` from holding back garbage collection.
    pub fn freeze_site(&mut self, site: SiteId) {
        if self.table.freeze(site) {
            self.site_count = self.site_count.saturating_sub(1);
            debug!(site, site_count = self.site_count, "froze site");
        }
        self.sync_local_len();
    }

    /// Start tracking a newly joined `site` from the current minimum clock.
    pub fn thaw_site(&mut self, site: SiteId) {
        if site == self.site {
            return;
        }
        let mut cv = self
            .table
            .minimum_clock(&self.clock)
            .unwrap_or_else(|| self.clock.clone());
        cv.grow_to(site + 1);
        self.table.update_with_clock(site, cv);
        self.site_count += 1;
        self.sync_local_len();
        debug!(site, site_count = self.site_count, "thawed site");
    }

    /// Snapshot the table, history and freeze state.
    pub fn state(&self) -> EngineState {
        return EngineState {
            clock_table: self.table.state(&self.clock),
            history: self.history.operations().iter().map(|op| op.state()).collect(),
            site_id: self.site,
            frozen: self.table.equivalents(&self.clock, self.site, &self.clock),
        };
    }

    /// Replace this engine's state with a snapshot from another engine.
    ///
    /// The local clock becomes the producer's clock. Nothing is modified
    /// if any history entry fails to parse.
    pub fn set_state(&mut self, state: EngineState) -> Result<()> {
        let ops = state
            .history
            .into_iter()
            .map(Operation::from_state)
            .collect::<Result<Vec<Operation>>>()?;

        self.table.set_state(state.clock_table);
        self.history.set_state(ops);

        self.clock = self.table.clock(state.site_id, &self.clock).clone();
        self.clock.grow_to(self.site + 1);
        self.table.freeze(self.site);
        self.sync_local_len();
        self.site_count = self.clock.len();

        for site in state.frozen {
            self.freeze_site(site);
        }

        debug!(
            from = state.site_id,
            clock = %self.clock,
            history = self.history.count(),
            site_count = self.site_count,
            "restored engine state"
        );
        return Ok(());
    }

    /// The local clock covers every table slot.
    fn sync_local_len(&mut self) {
        self.clock.grow_to(self.table.len());
    }
}
