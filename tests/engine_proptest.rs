// created = "2026-10-16"
// modified = "2026-10-16"

//! Property-based tests for clocks and multi-site convergence.

mod common;

use common::{Net, delete, insert, update};
use concur::ot::primitives::VectorClock;
use proptest::prelude::*;

// =============================================================================
// Test helpers
// =============================================================================

#[derive(Clone, Debug)]
enum Step {
    Edit { site: usize, kind: u8, pos_pct: f64, letter: char },
    Send { site: usize },
    Deliver { site: usize, upto_pct: f64 },
}

fn arbitrary_step(sites: usize) -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0..sites, 0u8..3, 0.0..1.0f64, prop::char::range('A', 'Z'))
            .prop_map(|(site, kind, pos_pct, letter)| Step::Edit { site, kind, pos_pct, letter }),
        3 => (0..sites).prop_map(|site| Step::Send { site }),
        3 => (0..sites, 0.0..=1.0f64)
            .prop_map(|(site, upto_pct)| Step::Deliver { site, upto_pct }),
    ]
}

fn apply_step(net: &mut Net, step: &Step) {
    match *step {
        Step::Edit { site, kind, pos_pct, letter } => {
            let len = net.sites[site].doc.len();
            let text = letter.to_string();
            if kind == 0 || len == 0 {
                let pos = (pos_pct * (len + 1) as f64) as usize;
                net.edit(site, insert(pos.min(len), &text));
            } else {
                let pos = ((pos_pct * len as f64) as usize).min(len - 1);
                if kind == 1 {
                    net.edit(site, delete(pos));
                } else {
                    net.edit(site, update(pos, &text));
                }
            }
        }
        Step::Send { site } => {
            if !net.sites[site].outbox.is_empty() {
                net.send(site);
            }
        }
        Step::Deliver { site, upto_pct } => {
            let from = net.sites[site].received;
            let span = net.log.len() - from;
            let upto = from + (upto_pct * span as f64) as usize;
            net.deliver_to(site, upto.min(net.log.len()));
        }
    }
}

/// Send whatever is still queued and deliver the whole log everywhere.
fn flush(net: &mut Net) {
    for site in 0..net.sites.len() {
        net.send_all(site);
    }
    net.deliver_all();
}

fn clock() -> impl Strategy<Value = Vec<u64>> {
    return prop::collection::vec(0u64..6, 0..5);
}

// =============================================================================
// Clock properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Trailing zeros never change a clock's meaning
    #[test]
    fn zero_padding_is_invisible(sites in clock(), pad in 0usize..4) {
        let a = VectorClock::from_sites(sites.clone());
        let mut padded = sites;
        padded.extend(std::iter::repeat_n(0, pad));
        let b = VectorClock::from_sites(padded);
        prop_assert_eq!(&a, &b);
        prop_assert!(a.subtract(&b).is_empty());
    }

    /// compare is antisymmetric and agrees with equality
    #[test]
    fn compare_is_antisymmetric(a in clock(), b in clock()) {
        let a = VectorClock::from_sites(a);
        let b = VectorClock::from_sites(b);
        prop_assert_eq!(a.compare(&b), b.compare(&a).reverse());
        prop_assert_eq!(a.equals(&b), a.subtract(&b).is_empty() && b.subtract(&a).is_empty());
    }

    /// subtract lists exactly the entries the other clock has not reached
    #[test]
    fn subtract_lists_missing_entries(a in clock(), b in clock()) {
        let ca = VectorClock::from_sites(a.clone());
        let cb = VectorClock::from_sites(b);
        let cd = ca.subtract(&cb);

        let expected: u64 = (0..a.len())
            .map(|i| ca.seq_for_site(i).saturating_sub(cb.seq_for_site(i)))
            .sum();
        prop_assert_eq!(cd.len() as u64, expected);
        for key in cd.iter() {
            prop_assert!(key.seq > cb.seq_for_site(key.site));
            prop_assert!(key.seq <= ca.seq_for_site(key.site));
        }

        let oldest = ca.oldest_difference(&cb);
        for key in oldest.iter() {
            prop_assert!(cd.contains(key.site, key.seq));
            prop_assert_eq!(key.seq, cb.seq_for_site(key.site) + 1);
        }
    }
}

// =============================================================================
// Convergence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two sites converge under any interleaving of edits and deliveries
    #[test]
    fn two_sites_converge(steps in prop::collection::vec(arbitrary_step(2), 1..30)) {
        let mut net = Net::new(2, "abc");
        net.thaw_all();
        for step in &steps {
            apply_step(&mut net, step);
        }
        flush(&mut net);
        prop_assert_eq!(net.text(0), net.text(1));
        prop_assert_eq!(net.sites[0].engine.clock(), net.sites[1].engine.clock());
    }

    /// Three sites converge, and purging along the way loses nothing needed
    #[test]
    fn three_sites_converge_with_purge(
        steps in prop::collection::vec(arbitrary_step(3), 1..30),
        purge_every in 1usize..6,
    ) {
        let mut net = Net::new(3, "abc");
        net.thaw_all();
        for (i, chunk) in steps.chunks(purge_every).enumerate() {
            for step in chunk {
                apply_step(&mut net, step);
            }
            // a sync travels behind the site's edits, so only peers that
            // already hold all of them may see it
            let site = i % 3;
            let clock = net.sites[site].engine.copy_clock();
            if net.sites[site].outbox.is_empty() {
                let len = net.log.len();
                for peer in net.sites.iter_mut().filter(|p| p.received == len) {
                    peer.engine.push_sync(site, clock.clone());
                }
            }
            net.sites[site].engine.purge().unwrap();
        }
        flush(&mut net);
        let text = net.text(0);
        prop_assert_eq!(net.text(1), text.clone());
        prop_assert_eq!(net.text(2), text);
    }
}
