// created = "2026-10-16"
// modified = "2026-10-16"

//! History buffer: every operation a live site might still need.
//!
//! Operations are keyed by (site, seq). Once stored they are sealed; the
//! engine only ever transforms detached copies. Entries leave the buffer
//! through `remove` during purge.
//!
//! Complexity:
//! - add_local / add_remote / get / remove: O(1) average (hash map)
//! - ops_for_difference: O(d log d) for a difference of size d
//! - context_sorted_operations: O(n log n · c) where c is clock length

use rustc_hash::FxHashMap;
use tracing::trace;

use super::op::Operation;
use super::primitives::clock::ClockDifference;
use super::primitives::id::OpKey;
use crate::Result;
use crate::error::EngineError;

/// Store of operations keyed by (site, seq).
#[derive(Clone, Debug, Default)]
pub struct HistoryBuffer {
    ops: FxHashMap<OpKey, Operation>,
}

impl HistoryBuffer {
    /// Create an empty buffer.
    pub fn new() -> HistoryBuffer {
        return HistoryBuffer {
            ops: FxHashMap::default(),
        };
    }

    /// Number of stored operations.
    #[inline]
    pub fn count(&self) -> usize {
        return self.ops.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.ops.is_empty();
    }

    #[inline]
    pub fn get(&self, key: &OpKey) -> Option<&Operation> {
        return self.ops.get(key);
    }

    #[inline]
    pub fn contains(&self, key: &OpKey) -> bool {
        return self.ops.contains_key(key);
    }

    /// Store an operation generated here and seal it.
    pub fn add_local(&mut self, mut op: Operation) {
        op.seal();
        self.ops.insert(op.op_key(), op);
    }

    /// Store a remote operation, or record the rank of one sent earlier.
    ///
    /// When the key already exists the only effect is assigning the rank
    /// to the stored copy. A repeat of the same rank is accepted so that a
    /// duplicate delivery is harmless.
    pub fn add_remote(&mut self, mut op: Operation) -> Result<()> {
        let key = op.op_key();
        if op.order().is_unassigned() {
            return Err(EngineError::MissingTotalOrder {
                site: key.site,
                seq: key.seq,
            });
        }

        if let Some(existing) = self.ops.get_mut(&key) {
            if existing.order().is_unassigned() {
                trace!(op = %key, order = %op.order(), "assigning total order");
                existing.set_order(op.order());
                return Ok(());
            }
            if existing.order() == op.order() {
                return Ok(());
            }
            return Err(EngineError::DuplicateTotalOrder {
                site: key.site,
                seq: key.seq,
                existing: existing.order(),
                incoming: op.order(),
            });
        }

        op.seal();
        self.ops.insert(key, op);
        return Ok(());
    }

    /// Resolve a difference to stored operations, sorted by total order.
    ///
    /// Fails with `MissingHistoryEntry` if any key has been purged or was
    /// never seen.
    pub fn ops_for_difference(&self, cd: &ClockDifference) -> Result<Vec<&Operation>> {
        let mut ops = Vec::with_capacity(cd.len());
        for key in cd.iter() {
            match self.ops.get(key) {
                Some(op) => ops.push(op),
                None => {
                    return Err(EngineError::MissingHistoryEntry {
                        site: key.site,
                        seq: key.seq,
                    });
                }
            }
        }
        ops.sort_by(|a, b| a.compare_by_order(b));
        return Ok(ops);
    }

    /// Every stored operation, sorted by causal context.
    pub fn context_sorted_operations(&self) -> Vec<&Operation> {
        let mut ops: Vec<&Operation> = self.ops.values().collect();
        ops.sort_by(|a, b| a.compare_by_context(b));
        return ops;
    }

    /// Remove an operation, handing it back unsealed.
    pub fn remove(&mut self, key: &OpKey) -> Option<Operation> {
        let mut op = self.ops.remove(key)?;
        op.unseal();
        return Some(op);
    }

    /// Attach a transformed copy to the cache of the stored original.
    ///
    /// Returns the copy back if the original is not stored here.
    pub fn cache_transform(
        &mut self,
        copy: Operation,
        capacity: usize,
    ) -> std::result::Result<(), Operation> {
        match self.ops.get_mut(&copy.op_key()) {
            Some(original) => {
                original.cache_mut().remember(&copy, capacity);
                Ok(())
            }
            None => Err(copy),
        }
    }

    /// Stored operations sorted by key.
    pub fn operations(&self) -> Vec<&Operation> {
        let mut ops: Vec<&Operation> = self.ops.values().collect();
        ops.sort_by_key(|op| op.op_key());
        return ops;
    }

    /// Replace the contents with restored operations.
    ///
    /// Restored operations count as non-local and keep their rank.
    pub fn set_state(&mut self, ops: Vec<Operation>) {
        self.ops.clear();
        for mut op in ops {
            op.set_local(false);
            self.add_local(op);
        }
    }
}
