// created = "2026-10-16"
// modified = "2026-10-16"

//! Session configuration.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Result;
use crate::ot::primitives::id::SiteId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Minimum time between purges, when purge is armed.
    pub purge_interval_ms: u64,
    /// Minimum time between outbound clock syncs, when sync is armed.
    pub sync_interval_ms: u64,
    /// Slot frozen at startup; it never belongs to a live participant.
    pub reserved_site: Option<SiteId>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            purge_interval_ms: 10_000,
            sync_interval_ms: 10_000,
            reserved_site: Some(0),
        }
    }
}

impl SessionConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<SessionConfig> {
        return Ok(serde_json::from_str(json)?);
    }

    pub fn purge_interval(&self) -> Duration {
        return Duration::from_millis(self.purge_interval_ms);
    }

    pub fn sync_interval(&self) -> Duration {
        return Duration::from_millis(self.sync_interval_ms);
    }
}
