//! AFL fuzz harness for the operation engine
//!
//! Three sites edit one list of bytes. Local edits queue until the fuzzer
//! forwards them to a ranking server; sites read the server log at their
//! own pace and occasionally exchange clocks and purge.
//!
//! Checked at the end: every site holds the same list and the same clock.

use afl::fuzz;
use concur::ot::primitives::{Order, Seq, VectorClock};
use concur::ot::{Edit, OperationEngine, Origin};
use serde_json::{Value, json};

const NUM_SITES: usize = 3;
const KEY: &str = "list";

#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    /// Site edits its own replica
    Edit { site: u8, kind: u8, pos_frac: u8, byte: u8 },
    /// Site forwards its oldest queued edit to the server
    Send { site: u8 },
    /// Site reads up to `count` messages from the server log
    Deliver { site: u8, count: u8 },
    /// Site announces its clock to caught-up peers and purges
    Purge { site: u8 },
}

impl FuzzOp {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        if bytes.is_empty() {
            return None;
        }

        let op_type = bytes[0] % 4;
        let rest = &bytes[1..];
        let site = |b: u8| b % NUM_SITES as u8;

        match op_type {
            0 if rest.len() >= 4 => {
                let op = FuzzOp::Edit {
                    site: site(rest[0]),
                    kind: rest[1] % 3,
                    pos_frac: rest[2],
                    byte: b'a' + rest[3] % 26,
                };
                Some((op, &rest[4..]))
            }
            1 if !rest.is_empty() => Some((FuzzOp::Send { site: site(rest[0]) }, &rest[1..])),
            2 if rest.len() >= 2 => {
                let op = FuzzOp::Deliver {
                    site: site(rest[0]),
                    count: rest[1] % 8,
                };
                Some((op, &rest[2..]))
            }
            3 if !rest.is_empty() => Some((FuzzOp::Purge { site: site(rest[0]) }, &rest[1..])),
            _ => None,
        }
    }
}

struct Message {
    edit: Edit,
    site: usize,
    clock: Vec<Seq>,
}

struct Replica {
    engine: OperationEngine,
    list: Vec<u8>,
    outbox: Vec<Message>,
    received: usize,
}

fn apply(list: &mut Vec<u8>, edit: &Edit) {
    let byte = |v: &Value| v.as_u64().unwrap_or_default() as u8;
    match edit {
        Edit::Insert { position, value, .. } => list.insert(*position, byte(value)),
        Edit::Delete { position, .. } => {
            list.remove(*position);
        }
        Edit::Update { position, value, .. } => list[*position] = byte(value),
    }
}

fn deliver(replica: &mut Replica, me: usize, log: &[Message], upto: usize) {
    while replica.received < upto {
        let msg = &log[replica.received];
        replica.received += 1;
        let origin = Origin::Remote {
            site: msg.site,
            clock: VectorClock::from_sites(msg.clock.clone()),
            order: Order::new(replica.received as u64),
        };
        let out = replica.engine.push(msg.edit.clone(), origin).unwrap();
        if msg.site == me {
            assert!(out.is_none(), "echo changed site {me}");
            continue;
        }
        if let Some(op) = out {
            apply(&mut replica.list, op.edit());
        }
    }
}

fn main() {
    fuzz!(|data: &[u8]| {
        let mut replicas: Vec<Replica> = (0..NUM_SITES)
            .map(|site| Replica {
                engine: OperationEngine::new(site),
                list: b"abc".to_vec(),
                outbox: Vec::new(),
                received: 0,
            })
            .collect();
        for replica in &mut replicas {
            for site in 0..NUM_SITES {
                replica.engine.thaw_site(site);
            }
        }
        let mut log: Vec<Message> = Vec::new();
        let mut remaining = data;

        while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
            remaining = rest;

            match op {
                FuzzOp::Edit { site, kind, pos_frac, byte } => {
                    let r = &mut replicas[site as usize];
                    let len = r.list.len();
                    let key = KEY.to_string();
                    let edit = if kind == 0 || len == 0 {
                        let position = (pos_frac as usize * (len + 1) / 256).min(len);
                        Edit::Insert { key, value: json!(byte), position }
                    } else {
                        let position = (pos_frac as usize * len / 256).min(len - 1);
                        if kind == 1 {
                            Edit::Delete { key, position }
                        } else {
                            Edit::Update { key, value: json!(byte), position }
                        }
                    };
                    let stamped = r.engine.push(edit.clone(), Origin::Local).unwrap().unwrap();
                    apply(&mut r.list, &edit);
                    r.outbox.push(Message {
                        edit,
                        site: site as usize,
                        clock: stamped.clock().sites().to_vec(),
                    });
                }

                FuzzOp::Send { site } => {
                    let r = &mut replicas[site as usize];
                    if !r.outbox.is_empty() {
                        log.push(r.outbox.remove(0));
                    }
                }

                FuzzOp::Deliver { site, count } => {
                    let r = &mut replicas[site as usize];
                    let upto = (r.received + count as usize).min(log.len());
                    deliver(r, site as usize, &log, upto);
                }

                FuzzOp::Purge { site } => {
                    let site = site as usize;
                    if replicas[site].outbox.is_empty() {
                        let clock = replicas[site].engine.copy_clock();
                        for peer in replicas.iter_mut().filter(|p| p.received == log.len()) {
                            peer.engine.push_sync(site, clock.clone());
                        }
                    }
                    replicas[site].engine.purge().unwrap();
                }
            }
        }

        // Flush and deliver everything
        for r in &mut replicas {
            log.extend(r.outbox.drain(..));
        }
        for (site, r) in replicas.iter_mut().enumerate() {
            deliver(r, site, &log, log.len());
        }

        let first = &replicas[0];
        for (i, r) in replicas.iter().enumerate().skip(1) {
            assert_eq!(r.list, first.list, "Convergence failure! Site {} != Site 0", i);
            assert_eq!(r.engine.clock(), first.engine.clock(), "Clock mismatch at site {}", i);
        }
    });
}
