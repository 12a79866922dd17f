//! Randomized multi-site editing session
//!
//! Usage: cargo run --release --features bench --bin ot_sim -- [sites] [steps] [seed]
//!
//! Sites 1..=sites edit a shared list through sessions; slot 0 belongs to
//! the server, which ranks messages in arrival order. Set RUST_LOG=concur=debug
//! to watch purges and transforms.

use std::time::Instant;

use concur::message::InboundEdit;
use concur::message::OutboundEdit;
use concur::{Session, SessionConfig};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

struct Peer {
    session: Session,
    doc: Vec<String>,
    outbox: Vec<OutboundEdit>,
    received: usize,
}

fn arg(args: &[String], index: usize, default: u64) -> u64 {
    return args
        .get(index)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default);
}

fn deliver(peer: &mut Peer, log: &[InboundEdit], upto: usize) -> concur::Result<()> {
    while peer.received < upto {
        let msg = log[peer.received].clone();
        peer.received += 1;
        let Some(applied) = peer.session.remote_edit(msg)? else {
            continue;
        };
        let text = applied.value.as_str().unwrap_or_default().to_string();
        match applied.kind.as_deref() {
            Some("insert") => peer.doc.insert(applied.position, text),
            Some("delete") => {
                peer.doc.remove(applied.position);
            }
            Some("update") => peer.doc[applied.position] = text,
            _ => {}
        }
    }
    return Ok(());
}

fn main() -> concur::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "concur=info,warn".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let sites = arg(&args, 1, 4).max(1) as usize;
    let steps = arg(&args, 2, 2_000);
    let seed = arg(&args, 3, 0);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut peers: Vec<Peer> = (1..=sites)
        .map(|site| Peer {
            session: Session::new(site, SessionConfig::default()),
            doc: Vec::new(),
            outbox: Vec::new(),
            received: 0,
        })
        .collect();
    for peer in &mut peers {
        for site in 1..=sites {
            peer.session.site_joined(site);
        }
    }

    let mut log: Vec<InboundEdit> = Vec::new();
    let mut purges = 0usize;
    let start = Instant::now();

    for _ in 0..steps {
        let i = rng.gen_range(0..sites);
        let roll: f64 = rng.r#gen();

        if roll < 0.4 {
            let peer = &mut peers[i];
            let len = peer.doc.len();
            let letter = char::from(b'a' + rng.gen_range(0..26u8)).to_string();
            let (kind, position) = match rng.gen_range(0..3) {
                1 if len > 0 => ("delete", rng.gen_range(0..len)),
                2 if len > 0 => ("update", rng.gen_range(0..len)),
                _ => ("insert", rng.gen_range(0..=len)),
            };
            let out = peer.session.local_edit("doc", json!(letter), Some(kind), position);
            match kind {
                "insert" => peer.doc.insert(position, letter),
                "delete" => {
                    peer.doc.remove(position);
                }
                _ => peer.doc[position] = letter,
            }
            peer.outbox.push(out);
        } else if roll < 0.7 {
            let site = i + 1;
            let peer = &mut peers[i];
            if !peer.outbox.is_empty() {
                let out = peer.outbox.remove(0);
                log.push(InboundEdit {
                    topic: out.topic,
                    value: out.value,
                    kind: out.kind,
                    position: out.position,
                    site_id: site,
                    context: out.context,
                    order: Some(log.len() as u64 + 1),
                });
            }
        } else if roll < 0.95 {
            let peer = &mut peers[i];
            let upto = rng.gen_range(peer.received..=log.len());
            deliver(peer, &log, upto)?;
        } else {
            // a sync follows the site's edits through the server
            if peers[i].outbox.is_empty() {
                if let Some(sync) = peers[i].session.sync_tick() {
                    for peer in peers.iter_mut().filter(|p| p.received == log.len()) {
                        peer.session.clock_sync(sync.clone());
                    }
                }
            }
            if peers[i].session.purge_tick()?.is_some() {
                purges += 1;
            }
        }
    }

    for (i, peer) in peers.iter_mut().enumerate() {
        for out in peer.outbox.drain(..) {
            log.push(InboundEdit {
                topic: out.topic,
                value: out.value,
                kind: out.kind,
                position: out.position,
                site_id: i + 1,
                context: out.context,
                order: Some(log.len() as u64 + 1),
            });
        }
    }
    for peer in &mut peers {
        deliver(peer, &log, log.len())?;
    }
    let elapsed = start.elapsed();

    let first = peers[0].doc.concat();
    let converged = peers.iter().all(|p| p.doc.concat() == first);
    for peer in &peers {
        info!(
            site = peer.session.site(),
            clock = %peer.session.engine().clock(),
            history = peer.session.engine().buffer_size(),
            "final state"
        );
    }

    println!("Sites:      {}", sites);
    println!("Steps:      {}", steps);
    println!("Messages:   {}", log.len());
    println!("Purges:     {}", purges);
    println!("Length:     {}", peers[0].doc.len());
    println!("Converged:  {}", converged);
    println!("Elapsed:    {:.2?}", elapsed);
    println!(
        "Per msg:    {:.2?}",
        elapsed / (log.len().max(1) as u32 * sites as u32)
    );

    if !converged {
        for peer in &peers {
            println!("  site {}: {}", peer.session.site(), peer.doc.concat());
        }
        std::process::exit(1);
    }
    return Ok(());
}
