// created = "2026-10-16"
// modified = "2026-10-16"

//! Messages exchanged between a session and its transport.
//!
//! All of them are plain serde structs; the transport decides how they
//! travel. Field names match the JSON the transport carries.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ot::primitives::id::Seq;
use crate::ot::primitives::id::SiteId;

/// An edit received from another site, possibly an echo of our own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEdit {
    pub topic: String,
    #[serde(default)]
    pub value: Value,
    /// `insert`, `delete`, `update`, or absent for an untransformed event.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub position: usize,
    #[serde(alias = "siteId", default)]
    pub site_id: SiteId,
    #[serde(default)]
    pub context: Option<Vec<Seq>>,
    #[serde(default)]
    pub order: Option<u64>,
}

/// An edit ready to apply to application state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedEdit {
    pub topic: String,
    pub value: Value,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub position: usize,
    pub site: SiteId,
}

/// A local edit to send to the other sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEdit {
    pub topic: String,
    pub value: Value,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub position: usize,
    /// Clock the edit was made against; absent for untyped events.
    pub context: Option<Vec<Seq>>,
}

/// A site's clock, exchanged so peers can garbage-collect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSync {
    #[serde(alias = "siteId")]
    pub site_id: SiteId,
    pub context: Vec<Seq>,
}
