// created = "2026-10-16"
// modified = "2026-10-16"

//! One site's engine wired to its transport.
//!
//! The transport hands the session inbound edits, clock syncs and roster
//! changes; the session turns them into engine calls and hands back what
//! to apply locally or send to peers. Purge and clock exchange run on the
//! caller's timer through `poll`, and only do work when something arrived
//! since the last run.
//!
//! A `Session` is not thread-safe on its own. Share it as a
//! `SharedSession` so every call runs inside one critical section.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::Result;
use crate::config::SessionConfig;
use crate::message::AppliedEdit;
use crate::message::ClockSync;
use crate::message::InboundEdit;
use crate::message::OutboundEdit;
use crate::ot::engine::OperationEngine;
use crate::ot::engine::Origin;
use crate::ot::op::Edit;
use crate::ot::primitives::clock::VectorClock;
use crate::ot::primitives::id::Order;
use crate::ot::primitives::id::SiteId;
use crate::ot::state::EngineState;

/// A session behind the single lock all of its calls must share.
pub type SharedSession = Arc<Mutex<Session>>;

/// What a `poll` did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tick {
    /// Minimum clock used, if a purge ran.
    pub purged: Option<VectorClock>,
    /// Clock to broadcast, if a sync was due.
    pub sync: Option<ClockSync>,
}

#[derive(Debug)]
pub struct Session {
    engine: OperationEngine,
    config: SessionConfig,
    should_purge: bool,
    should_sync: bool,
    last_purge: Option<Instant>,
    last_sync: Option<Instant>,
}

impl Session {
    /// Create a session for `site`, freezing the reserved slot.
    pub fn new(site: SiteId, config: SessionConfig) -> Session {
        let mut engine = OperationEngine::new(site);
        if let Some(reserved) = config.reserved_site {
            engine.freeze_site(reserved);
        }
        return Session {
            engine,
            config,
            should_purge: false,
            should_sync: false,
            last_purge: None,
            last_sync: None,
        };
    }

    pub fn into_shared(self) -> SharedSession {
        return Arc::new(Mutex::new(self));
    }

    #[inline]
    pub fn site(&self) -> SiteId {
        return self.engine.site();
    }

    #[inline]
    pub fn engine(&self) -> &OperationEngine {
        return &self.engine;
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        return &self.config;
    }

    #[inline]
    pub fn should_purge(&self) -> bool {
        return self.should_purge;
    }

    #[inline]
    pub fn should_sync(&self) -> bool {
        return self.should_sync;
    }

    /// Stamp a local edit and build the message announcing it.
    ///
    /// An unknown `kind` is not an error: the edit goes out untyped, with
    /// no context, and bypasses the engine. So does an edit the engine
    /// cannot stamp.
    pub fn local_edit(
        &mut self,
        topic: &str,
        value: Value,
        kind: Option<&str>,
        position: usize,
    ) -> OutboundEdit {
        let mut kind = kind.map(str::to_string);
        let mut context = None;

        if let Some(name) = kind.clone() {
            let stamped = Edit::from_type(&name, topic.to_string(), value.clone(), position)
                .and_then(|edit| self.engine.create_op(edit, Origin::Local));
            match stamped {
                Ok(op) => {
                    context = Some(op.clock().sites().to_vec());
                    self.engine.push_local_op(op);
                    self.should_purge = true;
                }
                Err(err) => {
                    warn!(kind = %name, %err, "cannot stamp edit, sending untyped");
                    kind = None;
                }
            }
        }

        return OutboundEdit {
            topic: topic.to_string(),
            value,
            kind,
            position,
            context,
        };
    }

    /// Process an edit from the transport.
    ///
    /// Typed edits go through the engine and come back transformed, or as
    /// `None` when already processed or nullified. Untyped edits pass
    /// through unchanged, except echoes of this site's own, which are
    /// dropped.
    pub fn remote_edit(&mut self, msg: InboundEdit) -> Result<Option<AppliedEdit>> {
        let InboundEdit {
            topic,
            value,
            kind,
            position,
            site_id,
            context,
            order,
        } = msg;

        let Some(name) = kind else {
            if site_id == self.engine.site() {
                return Ok(None);
            }
            self.arm();
            return Ok(Some(AppliedEdit {
                topic,
                value,
                kind: None,
                position,
                site: site_id,
            }));
        };

        let clock = VectorClock::from_state(context)?;
        let edit = Edit::from_type(&name, topic.clone(), value.clone(), position)?;
        let origin = Origin::Remote {
            site: site_id,
            clock,
            order: Order::from_option(order),
        };

        let pushed = self.engine.push(edit, origin)?;
        self.arm();

        let Some(op) = pushed else {
            debug!(site = site_id, topic = %topic, "remote edit has no effect");
            return Ok(None);
        };

        return Ok(Some(AppliedEdit {
            topic,
            value: op.value().cloned().unwrap_or(value),
            kind: Some(name),
            position: op.position(),
            site: site_id,
        }));
    }

    /// Fold a peer's clock into the table. Our own syncs are ignored.
    pub fn clock_sync(&mut self, msg: ClockSync) {
        if msg.site_id == self.engine.site() {
            return;
        }
        self.engine.push_sync_with_sites(msg.site_id, msg.context);
        self.should_purge = true;
    }

    /// Start tracking a site before its first edit arrives.
    pub fn site_joined(&mut self, site: SiteId) {
        self.engine.thaw_site(site);
        info!(site, site_count = self.engine.site_count(), "site joined");
    }

    /// Stop a departed site from holding back garbage collection.
    pub fn site_left(&mut self, site: SiteId) {
        self.engine.freeze_site(site);
        info!(site, site_count = self.engine.site_count(), "site left");
    }

    /// Purge, then snapshot the engine for a late joiner.
    pub fn engine_state(&mut self) -> Result<EngineState> {
        self.engine.purge()?;
        return Ok(self.engine.state());
    }

    /// Seed the engine from another site's snapshot.
    pub fn load_engine_state(&mut self, state: EngineState) -> Result<()> {
        return self.engine.set_state(state);
    }

    /// Purge if anything arrived since the last purge.
    pub fn purge_tick(&mut self) -> Result<Option<VectorClock>> {
        if !self.should_purge {
            return Ok(None);
        }
        self.should_purge = false;
        return self.engine.purge();
    }

    /// This site's clock, if anything arrived since the last sync.
    pub fn sync_tick(&mut self) -> Option<ClockSync> {
        if !self.should_sync {
            return None;
        }
        self.should_sync = false;
        return Some(ClockSync {
            site_id: self.engine.site(),
            context: self.engine.clock().sites().to_vec(),
        });
    }

    /// Run whichever ticks are due at `now`.
    pub fn poll(&mut self, now: Instant) -> Result<Tick> {
        let mut tick = Tick::default();

        if is_due(self.last_purge, self.config.purge_interval(), now) {
            self.last_purge = Some(now);
            tick.purged = self.purge_tick()?;
        }
        if is_due(self.last_sync, self.config.sync_interval(), now) {
            self.last_sync = Some(now);
            tick.sync = self.sync_tick();
        }

        return Ok(tick);
    }

    fn arm(&mut self) {
        self.should_purge = true;
        self.should_sync = true;
    }
}

fn is_due(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
    match last {
        None => true,
        Some(at) => now.saturating_duration_since(at) >= interval,
    }
}
