// created = "2026-10-16"
// modified = "2026-10-16"

//! Serialized engine state for seeding late-joining replicas.
//!
//! Both types serialize as flat JSON arrays:
//!
//! - `EngineState`: `[clock_table, history, site_id, frozen]`
//! - `OpState`: `[type, key, value, position, clock_sites, seq, site, order]`
//!
//! History entries are written sorted by (site, seq), so two engines in
//! the same state produce byte-identical output and the same fingerprint.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::op::Edit;
use super::op::Operation;
use super::primitives::clock::VectorClock;
use super::primitives::id::Order;
use super::primitives::id::Seq;
use super::primitives::id::SiteId;
use crate::Result;

type OpTuple = (String, String, Value, usize, Vec<Seq>, Seq, SiteId, Order);

/// One history entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "OpTuple", into = "OpTuple")]
pub struct OpState {
    pub kind: String,
    pub key: String,
    pub value: Value,
    pub position: usize,
    pub clock: Vec<Seq>,
    pub seq: Seq,
    pub site: SiteId,
    pub order: Order,
}

impl From<OpTuple> for OpState {
    fn from(t: OpTuple) -> Self {
        let (kind, key, value, position, clock, seq, site, order) = t;
        return OpState {
            kind,
            key,
            value,
            position,
            clock,
            seq,
            site,
            order,
        };
    }
}

impl From<OpState> for OpTuple {
    fn from(s: OpState) -> Self {
        return (s.kind, s.key, s.value, s.position, s.clock, s.seq, s.site, s.order);
    }
}

impl Operation {
    /// Flatten for serialization. Deletes carry a null value.
    pub fn state(&self) -> OpState {
        return OpState {
            kind: self.kind().to_string(),
            key: self.key().to_string(),
            value: self.value().cloned().unwrap_or(Value::Null),
            position: self.position(),
            clock: self.clock().sites().to_vec(),
            seq: self.seq(),
            site: self.site(),
            order: self.order(),
        };
    }

    /// Rebuild a non-local operation from its flat form.
    pub fn from_state(state: OpState) -> Result<Operation> {
        let edit = Edit::from_type(&state.kind, state.key, state.value, state.position)?;
        return Ok(Operation::new(
            edit,
            state.site,
            state.seq,
            VectorClock::from_sites(state.clock),
            state.order,
            false,
        ));
    }
}

type EngineTuple = (Vec<Vec<Seq>>, Vec<OpState>, SiteId, Vec<SiteId>);

/// Everything a new replica needs to continue from this engine's state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "EngineTuple", into = "EngineTuple")]
pub struct EngineState {
    /// Raw clock of every table slot.
    pub clock_table: Vec<Vec<Seq>>,
    pub history: Vec<OpState>,
    /// Site that produced the state.
    pub site_id: SiteId,
    /// Slots equal to the producer's own clock.
    pub frozen: Vec<SiteId>,
}

impl From<EngineTuple> for EngineState {
    fn from(t: EngineTuple) -> Self {
        let (clock_table, history, site_id, frozen) = t;
        return EngineState {
            clock_table,
            history,
            site_id,
            frozen,
        };
    }
}

impl From<EngineState> for EngineTuple {
    fn from(s: EngineState) -> Self {
        return (s.clock_table, s.history, s.site_id, s.frozen);
    }
}

impl EngineState {
    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(self)?);
    }

    pub fn from_json(json: &str) -> Result<EngineState> {
        return Ok(serde_json::from_str(json)?);
    }

    /// blake3 digest of the canonical JSON form.
    pub fn fingerprint(&self) -> Result<blake3::Hash> {
        let bytes = serde_json::to_vec(self)?;
        return Ok(blake3::hash(&bytes));
    }
}
