// created = "2026-10-16"
// modified = "2026-10-16"

//! Operations and their pairwise transformation rules.
//!
//! An `Operation` is one edit (`Edit`) plus the causal bookkeeping the
//! engine needs: the originating site and sequence number, the clock the
//! edit was made against, the server-assigned total order, and a bounded
//! cache of transformed copies.
//!
//! # Transform Rules
//!
//! `transform_with` folds the effect of another, concurrent operation into
//! `self`. Operations on different keys never move each other.
//!
//! | self \ other | Insert | Delete | Update |
//! |---|---|---|---|
//! | Insert | +1 if `pos > o.pos`, or equal and `site <= o.site` | -1 if `pos > o.pos` | - |
//! | Delete | +1 if `pos >= o.pos` | -1 if `pos > o.pos`, nullified if equal | - |
//! | Update | +1 if `pos >= o.pos` | -1 if `pos > o.pos`, nullified if equal | value of the higher site wins |
//!
//! A nullified operation has no further effect and is reported as `None`.
//! Any surviving operation records the other one in its clock.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::primitives::clock::VectorClock;
use super::primitives::id::OpKey;
use super::primitives::id::Order;
use super::primitives::id::Seq;
use super::primitives::id::SiteId;
use crate::Result;
use crate::error::EngineError;

/// Discriminant of an `Edit`, as named on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Insert,
    Delete,
    Update,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        return match self {
            OpKind::Insert => "insert",
            OpKind::Delete => "delete",
            OpKind::Update => "update",
        };
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

impl FromStr for OpKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<OpKind> {
        return match s {
            "insert" => Ok(OpKind::Insert),
            "delete" => Ok(OpKind::Delete),
            "update" => Ok(OpKind::Update),
            other => Err(EngineError::UnknownOperationType(other.to_string())),
        };
    }
}

/// The application-level payload of an operation.
///
/// `key` names an independent ordered collection; `position` indexes into
/// it. Neither has any meaning to the engine beyond equality and order.
#[derive(Clone, Debug, PartialEq)]
pub enum Edit {
    Insert {
        key: String,
        value: Value,
        position: usize,
    },
    Delete {
        key: String,
        position: usize,
    },
    Update {
        key: String,
        value: Value,
        position: usize,
    },
}

impl Edit {
    /// Build an edit from its wire type name.
    ///
    /// Deletes discard `value`.
    pub fn from_type(kind: &str, key: String, value: Value, position: usize) -> Result<Edit> {
        let edit = match kind.parse::<OpKind>()? {
            OpKind::Insert => Edit::Insert { key, value, position },
            OpKind::Delete => Edit::Delete { key, position },
            OpKind::Update => Edit::Update { key, value, position },
        };
        return Ok(edit);
    }

    pub fn kind(&self) -> OpKind {
        return match self {
            Edit::Insert { .. } => OpKind::Insert,
            Edit::Delete { .. } => OpKind::Delete,
            Edit::Update { .. } => OpKind::Update,
        };
    }

    pub fn key(&self) -> &str {
        return match self {
            Edit::Insert { key, .. } | Edit::Delete { key, .. } | Edit::Update { key, .. } => key,
        };
    }

    pub fn position(&self) -> usize {
        return match self {
            Edit::Insert { position, .. }
            | Edit::Delete { position, .. }
            | Edit::Update { position, .. } => *position,
        };
    }

    /// The carried value; deletes have none.
    pub fn value(&self) -> Option<&Value> {
        return match self {
            Edit::Insert { value, .. } | Edit::Update { value, .. } => Some(value),
            Edit::Delete { .. } => None,
        };
    }

    fn position_mut(&mut self) -> &mut usize {
        return match self {
            Edit::Insert { position, .. }
            | Edit::Delete { position, .. }
            | Edit::Update { position, .. } => position,
        };
    }
}

/// Previously transformed copies of an operation, keyed by their clock.
///
/// Bounded FIFO: once full, the oldest entry is evicted first.
#[derive(Clone, Debug, Default)]
pub struct TransformCache {
    entries: VecDeque<Operation>,
}

impl TransformCache {
    pub fn new() -> TransformCache {
        return TransformCache {
            entries: VecDeque::new(),
        };
    }

    /// A mutable copy of the cached transform expressed in `clock`.
    pub fn get(&self, clock: &VectorClock) -> Option<Operation> {
        return self
            .entries
            .iter()
            .find(|op| op.clock.equals(clock))
            .map(Operation::detached);
    }

    /// Store a sealed copy, keeping at most `capacity` entries.
    pub fn remember(&mut self, op: &Operation, capacity: usize) {
        let mut copy = op.detached();
        copy.seal();
        self.entries.push_back(copy);
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }
}

/// A single edit with its causal context.
#[derive(Clone, Debug)]
pub struct Operation {
    edit: Edit,
    site: SiteId,
    seq: Seq,
    clock: VectorClock,
    order: Order,
    /// Generated at this engine, as opposed to received or restored.
    local: bool,
    immutable: bool,
    cache: TransformCache,
}

impl Operation {
    /// Create a mutable operation with an empty cache.
    pub fn new(
        edit: Edit,
        site: SiteId,
        seq: Seq,
        clock: VectorClock,
        order: Order,
        local: bool,
    ) -> Operation {
        return Operation {
            edit,
            site,
            seq,
            clock,
            order,
            local,
            immutable: false,
            cache: TransformCache::new(),
        };
    }

    #[inline]
    pub fn edit(&self) -> &Edit {
        return &self.edit;
    }

    #[inline]
    pub fn kind(&self) -> OpKind {
        return self.edit.kind();
    }

    #[inline]
    pub fn key(&self) -> &str {
        return self.edit.key();
    }

    #[inline]
    pub fn position(&self) -> usize {
        return self.edit.position();
    }

    #[inline]
    pub fn value(&self) -> Option<&Value> {
        return self.edit.value();
    }

    #[inline]
    pub fn site(&self) -> SiteId {
        return self.site;
    }

    #[inline]
    pub fn seq(&self) -> Seq {
        return self.seq;
    }

    /// The history buffer key of this operation.
    #[inline]
    pub fn op_key(&self) -> OpKey {
        return OpKey::new(self.site, self.seq);
    }

    #[inline]
    pub fn clock(&self) -> &VectorClock {
        return &self.clock;
    }

    #[inline]
    pub fn order(&self) -> Order {
        return self.order;
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        return self.local;
    }

    #[inline]
    pub fn is_immutable(&self) -> bool {
        return self.immutable;
    }

    #[inline]
    pub fn cache(&self) -> &TransformCache {
        return &self.cache;
    }

    pub(crate) fn seal(&mut self) {
        self.immutable = true;
    }

    pub(crate) fn unseal(&mut self) {
        self.immutable = false;
    }

    pub(crate) fn set_order(&mut self, order: Order) {
        self.order = order;
    }

    pub(crate) fn set_local(&mut self, local: bool) {
        self.local = local;
    }

    pub(crate) fn cache_mut(&mut self) -> &mut TransformCache {
        return &mut self.cache;
    }

    pub(crate) fn replace_cache(&mut self, cache: TransformCache) {
        self.cache = cache;
    }

    /// A mutable copy without the transform cache.
    pub fn detached(&self) -> Operation {
        return Operation {
            edit: self.edit.clone(),
            site: self.site,
            seq: self.seq,
            clock: self.clock.clone(),
            order: self.order,
            local: self.local,
            immutable: false,
            cache: TransformCache::new(),
        };
    }

    /// Record that `other` is now part of this operation's context.
    pub fn upgrade_context_to(&mut self, other: &Operation) -> Result<()> {
        return self.include(other.op_key());
    }

    /// Record the operation named by `key` in this operation's context.
    pub fn include(&mut self, key: OpKey) -> Result<()> {
        if self.immutable {
            return Err(EngineError::ImmutableViolation);
        }
        self.clock.set_seq_for_site(key.site, key.seq);
        return Ok(());
    }

    /// Fold the effect of `other` into this operation.
    ///
    /// Returns `None` when `other` nullifies this operation.
    pub fn transform_with(mut self, other: &Operation) -> Result<Option<Operation>> {
        if self.immutable {
            return Err(EngineError::ImmutableViolation);
        }

        if self.key() == other.key() && !self.apply_rule(other) {
            return Ok(None);
        }

        self.upgrade_context_to(other)?;
        return Ok(Some(self));
    }

    /// Adjust this edit for `other`. Returns false if nullified.
    fn apply_rule(&mut self, other: &Operation) -> bool {
        let ours = self.edit.position();
        let theirs = other.edit.position();

        match (self.edit.kind(), other.edit.kind()) {
            (OpKind::Insert, OpKind::Insert) => {
                if ours > theirs || (ours == theirs && self.site <= other.site) {
                    *self.edit.position_mut() += 1;
                }
            }
            (OpKind::Insert, OpKind::Delete) => {
                if ours > theirs {
                    *self.edit.position_mut() -= 1;
                }
            }
            (OpKind::Delete | OpKind::Update, OpKind::Insert) => {
                if ours >= theirs {
                    *self.edit.position_mut() += 1;
                }
            }
            (OpKind::Delete | OpKind::Update, OpKind::Delete) => {
                if ours == theirs {
                    return false;
                }
                if ours > theirs {
                    *self.edit.position_mut() -= 1;
                }
            }
            (OpKind::Update, OpKind::Update) => {
                let wins = other.site > self.site
                    || (other.site == self.site && other.seq > self.seq);
                if ours == theirs && wins {
                    if let (Edit::Update { value, .. }, Some(incoming)) =
                        (&mut self.edit, other.edit.value())
                    {
                        *value = incoming.clone();
                    }
                }
            }
            (OpKind::Insert | OpKind::Delete, OpKind::Update) => {}
        }
        return true;
    }

    /// Causal ordering: clock first, then site, then seq.
    pub fn compare_by_context(&self, other: &Operation) -> Ordering {
        return self
            .clock
            .compare(&other.clock)
            .then(self.site.cmp(&other.site))
            .then(self.seq.cmp(&other.seq));
    }

    /// Total ordering by server rank.
    ///
    /// Ranked operations sort by rank and precede unranked ones. Among
    /// unranked operations a local one always sorts after a non-local
    /// one: anything non-local still unranked came in with late-join state
    /// and so was sent before this site finished joining.
    pub fn compare_by_order(&self, other: &Operation) -> Ordering {
        match (self.order.get(), other.order.get()) {
            (Some(a), Some(b)) => {
                return a.cmp(&b).then(self.op_key().cmp(&other.op_key()));
            }
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => {}
        }

        return match (self.local, other.local) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => self.seq.cmp(&other.seq).then(self.site.cmp(&other.site)),
        };
    }
}
