// created = "2026-10-16"
// modified = "2026-10-16"

//! Shared test harness: sites editing one list through a ranking server.
//!
//! Each site holds an engine and a plain `Vec<String>` document. Local
//! edits apply immediately and queue an outbound message; `send` hands a
//! site's oldest queued message to the server, which ranks messages in
//! arrival order; `deliver` feeds a site the server log up to some point,
//! including echoes of its own messages.

#![allow(dead_code)]

use concur::ot::primitives::{Order, Seq, SiteId, VectorClock};
use concur::ot::{Edit, Operation, OperationEngine, Origin};
use serde_json::{Value, json};

pub const KEY: &str = "doc";

#[derive(Clone, Debug)]
pub struct Message {
    pub edit: Edit,
    pub site: SiteId,
    pub clock: Vec<Seq>,
    pub order: u64,
}

pub struct Site {
    pub engine: OperationEngine,
    pub doc: Vec<String>,
    pub outbox: Vec<(Edit, Vec<Seq>)>,
    pub received: usize,
    /// Transformed remote ops in delivery order; `None` when nullified.
    pub applied: Vec<Option<Operation>>,
}

pub struct Net {
    pub sites: Vec<Site>,
    pub log: Vec<Message>,
}

pub fn insert(position: usize, value: &str) -> Edit {
    return Edit::Insert {
        key: KEY.to_string(),
        value: json!(value),
        position,
    };
}

pub fn delete(position: usize) -> Edit {
    return Edit::Delete {
        key: KEY.to_string(),
        position,
    };
}

pub fn update(position: usize, value: &str) -> Edit {
    return Edit::Update {
        key: KEY.to_string(),
        value: json!(value),
        position,
    };
}

/// Apply `op` to the `KEY` list; edits to other keys are ignored.
pub fn apply(doc: &mut Vec<String>, op: &Operation) {
    if op.key() != KEY {
        return;
    }
    let text = |v: Option<&Value>| v.and_then(Value::as_str).unwrap_or_default().to_string();
    match op.edit() {
        Edit::Insert { position, .. } => doc.insert(*position, text(op.value())),
        Edit::Delete { position, .. } => {
            doc.remove(*position);
        }
        Edit::Update { position, .. } => doc[*position] = text(op.value()),
    }
}

impl Net {
    /// `count` sites, all starting from `initial`, one letter per element.
    pub fn new(count: usize, initial: &str) -> Net {
        let sites = (0..count)
            .map(|site| Site {
                engine: OperationEngine::new(site),
                doc: initial.chars().map(String::from).collect(),
                outbox: Vec::new(),
                received: 0,
                applied: Vec::new(),
            })
            .collect();
        return Net {
            sites,
            log: Vec::new(),
        };
    }

    /// Let every site know every other site is participating.
    pub fn thaw_all(&mut self) {
        let count = self.sites.len();
        for site in &mut self.sites {
            for other in 0..count {
                site.engine.thaw_site(other);
            }
        }
    }

    pub fn edit(&mut self, site: SiteId, edit: Edit) {
        let s = &mut self.sites[site];
        let op = s.engine.push(edit.clone(), Origin::Local).unwrap().unwrap();
        apply(&mut s.doc, &op);
        s.outbox.push((edit, op.clock().sites().to_vec()));
    }

    /// Forward the oldest queued message of `site` to the server.
    pub fn send(&mut self, site: SiteId) {
        let (edit, clock) = self.sites[site].outbox.remove(0);
        let order = self.log.len() as u64 + 1;
        self.log.push(Message {
            edit,
            site,
            clock,
            order,
        });
    }

    pub fn send_all(&mut self, site: SiteId) {
        while !self.sites[site].outbox.is_empty() {
            self.send(site);
        }
    }

    /// Deliver the server log to `site` up to (excluding) index `upto`.
    pub fn deliver_to(&mut self, site: SiteId, upto: usize) {
        let s = &mut self.sites[site];
        while s.received < upto {
            let msg = self.log[s.received].clone();
            s.received += 1;
            let origin = Origin::Remote {
                site: msg.site,
                clock: VectorClock::from_sites(msg.clock),
                order: Order::new(msg.order),
            };
            let out = s.engine.push(msg.edit, origin).unwrap();
            if msg.site == site {
                assert!(out.is_none(), "echo of own op must have no effect");
                continue;
            }
            if let Some(op) = &out {
                apply(&mut s.doc, op);
            }
            s.applied.push(out);
        }
    }

    pub fn deliver_all(&mut self) {
        let len = self.log.len();
        for site in 0..self.sites.len() {
            self.deliver_to(site, len);
        }
    }

    pub fn text(&self, site: SiteId) -> String {
        return self.sites[site].doc.concat();
    }
}
