// created = "2026-10-16"
// modified = "2026-10-16"

//! Garbage collection, replica snapshots and repeated deliveries.

use concur::EngineError;
use concur::ot::primitives::{ClockDifference, OpKey, Order, Seq, SiteId, VectorClock};
use concur::ot::{Edit, EngineState, OperationEngine, Origin};
use serde_json::json;

fn ins(position: usize, value: &str) -> Edit {
    return Edit::Insert {
        key: "doc".into(),
        value: json!(value),
        position,
    };
}

fn remote(site: SiteId, clock: &[Seq], order: u64) -> Origin {
    return Origin::Remote {
        site,
        clock: VectorClock::from_sites(clock.to_vec()),
        order: Order::new(order),
    };
}

fn keys(engine: &OperationEngine) -> Vec<OpKey> {
    return engine
        .history()
        .operations()
        .iter()
        .map(|op| op.op_key())
        .collect();
}

/// Site 0 made "a1", received "b1" from site 1, then made "a2".
fn mixed_history() -> OperationEngine {
    let mut a = OperationEngine::new(0);
    a.push(ins(0, "a1"), Origin::Local).unwrap();
    let b1 = a.push(ins(0, "b1"), remote(1, &[0, 0], 1)).unwrap().unwrap();
    assert_eq!(b1.position(), 0);
    a.push(ins(0, "a2"), Origin::Local).unwrap();
    return a;
}

// =============================================================================
// Purge
// =============================================================================

#[test]
fn purge_keeps_what_a_peer_has_not_seen() {
    let mut e = OperationEngine::new(0);
    e.push(ins(0, "a"), Origin::Local).unwrap();
    e.push(ins(1, "b"), Origin::Local).unwrap();
    e.push_sync(1, VectorClock::from_sites(vec![1, 0]));

    let min = e.purge().unwrap().unwrap();
    assert_eq!(min.sites(), &[1, 0]);
    assert_eq!(keys(&e), vec![OpKey::new(0, 2)]);

    let mut kept = ClockDifference::new();
    kept.push(0, 2);
    assert_eq!(e.history().ops_for_difference(&kept).unwrap().len(), 1);

    let mut gone = ClockDifference::new();
    gone.push(0, 1);
    assert!(matches!(
        e.history().ops_for_difference(&gone),
        Err(EngineError::MissingHistoryEntry { site: 0, seq: 1 })
    ));
}

#[test]
fn silent_site_blocks_purge_until_frozen() {
    let mut e = OperationEngine::new(0);
    e.push(ins(0, "a"), Origin::Local).unwrap();
    e.push(ins(1, "b"), Origin::Local).unwrap();
    e.push_sync(1, VectorClock::from_sites(vec![2, 0]));
    e.push_sync(2, VectorClock::from_sites(vec![0, 0, 0]));

    let min = e.purge().unwrap().unwrap();
    assert_eq!(min.sites(), &[0, 0, 0]);
    assert_eq!(e.buffer_size(), 2);

    e.freeze_site(2);
    let min = e.purge().unwrap().unwrap();
    assert_eq!(min.sites(), &[2, 0, 0]);
    assert_eq!(e.buffer_size(), 0);
    assert_eq!(e.clock().sites(), &[2, 0, 0]);
}

#[test]
fn purge_with_concurrent_history_keeps_everything_needed() {
    let mut a = mixed_history();
    let min = a.purge().unwrap().unwrap();
    assert_eq!(min.sites(), &[0, 1]);
    assert_eq!(
        keys(&a),
        vec![OpKey::new(0, 1), OpKey::new(0, 2), OpKey::new(1, 1)]
    );
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn snapshot_contents() {
    let a = mixed_history();
    let state = a.state();

    assert_eq!(state.clock_table, vec![vec![2, 1], vec![0, 1]]);
    assert_eq!(state.site_id, 0);
    assert!(state.frozen.is_empty());

    let summary: Vec<(SiteId, Seq, Option<u64>)> = state
        .history
        .iter()
        .map(|op| (op.site, op.seq, op.order.get()))
        .collect();
    assert_eq!(summary, vec![(0, 1, None), (0, 2, None), (1, 1, Some(1))]);
    assert_eq!(state.history[1].clock, vec![1, 1]);
}

#[test]
fn restored_replica_behaves_like_the_original() {
    let mut a = mixed_history();
    let state = a.state();

    let json = state.to_json().unwrap();
    let mut c = OperationEngine::new(0);
    c.set_state(EngineState::from_json(&json).unwrap()).unwrap();

    assert_eq!(c.state(), state);
    assert_eq!(c.clock(), a.clock());
    assert_eq!(c.site_count(), 2);
    assert_eq!(a.purge().unwrap(), c.purge().unwrap());
    assert_eq!(keys(&a), keys(&c));

    let from_a = a.push(ins(1, "b2"), remote(1, &[0, 1], 2)).unwrap().unwrap();
    let from_c = c.push(ins(1, "b2"), remote(1, &[0, 1], 2)).unwrap().unwrap();
    assert_eq!(from_a.position(), 2);
    assert_eq!(from_c.position(), 2);
    assert_eq!(a.clock().sites(), &[2, 2]);
    assert_eq!(c.clock(), a.clock());
    assert_eq!(
        a.state().fingerprint().unwrap(),
        c.state().fingerprint().unwrap()
    );
}

#[test]
fn late_joiner_takes_the_producers_clock() {
    let a = mixed_history();
    let mut d = OperationEngine::new(2);
    d.set_state(a.state()).unwrap();

    assert_eq!(d.clock().sites(), &[2, 1, 0]);
    assert_eq!(d.site_count(), 3);
    assert_eq!(d.buffer_size(), 3);
    assert!(d.history().operations().iter().all(|op| !op.is_local()));

    let next = d.push(ins(0, "c1"), Origin::Local).unwrap().unwrap();
    assert_eq!(next.seq(), 1);
    assert_eq!(next.clock().sites(), &[2, 1, 0]);
}

#[test]
fn snapshot_lists_frozen_slots() {
    let mut e = OperationEngine::new(1);
    e.freeze_site(0);
    e.push(ins(0, "x"), Origin::Local).unwrap();

    let state = e.state();
    assert_eq!(state.frozen, vec![0]);
    assert_eq!(state.clock_table, vec![vec![0, 1], vec![0, 1]]);
}

// =============================================================================
// Repeated delivery
// =============================================================================

#[test]
fn duplicate_delivery_is_harmless() {
    let mut e = OperationEngine::new(0);
    let first = e.push(ins(0, "b"), remote(1, &[0, 0], 1)).unwrap();
    assert!(first.is_some());
    let clock = e.copy_clock();

    let again = e.push(ins(0, "b"), remote(1, &[0, 0], 1)).unwrap();
    assert!(again.is_none());
    assert_eq!(e.buffer_size(), 1);
    assert_eq!(e.clock(), &clock);
}

#[test]
fn duplicate_after_purge_stays_purged() {
    let mut e = OperationEngine::new(0);
    e.push(ins(0, "b"), remote(1, &[0, 0], 1)).unwrap();
    e.push_sync(1, VectorClock::from_sites(vec![0, 1]));
    e.purge().unwrap();
    assert_eq!(e.buffer_size(), 0);

    let again = e.push(ins(0, "b"), remote(1, &[0, 0], 1)).unwrap();
    assert!(again.is_none());
    assert_eq!(e.buffer_size(), 0);
    assert_eq!(e.clock().sites(), &[0, 1]);
}

#[test]
fn conflicting_rank_is_rejected() {
    let mut e = OperationEngine::new(0);
    e.push(ins(0, "b"), remote(1, &[0, 0], 1)).unwrap();

    let err = e.push(ins(0, "b"), remote(1, &[0, 0], 7)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::DuplicateTotalOrder { site: 1, seq: 1, .. }
    ));
}

#[test]
fn history_entries_are_sealed() {
    let e = mixed_history();
    assert!(e.history().operations().iter().all(|op| op.is_immutable()));
}

#[test]
fn clock_never_moves_backwards() {
    let mut e = OperationEngine::new(0);
    let mut last = e.copy_clock();
    let steps: Vec<(Edit, Origin)> = vec![
        (ins(0, "a"), Origin::Local),
        (ins(0, "b"), remote(1, &[0, 0], 1)),
        (ins(0, "c"), remote(2, &[1, 0, 0], 2)),
        (ins(0, "d"), Origin::Local),
        (ins(0, "b"), remote(1, &[0, 0], 1)),
    ];
    for (edit, origin) in steps {
        e.push(edit, origin).unwrap();
        let now = e.copy_clock();
        assert!(now >= last, "{now} went back from {last}");
        last = now;
    }
    assert_eq!(last.sites(), &[2, 1, 1]);
}

// =============================================================================
// Corrupt contexts
// =============================================================================

#[test]
fn context_ahead_of_local_clock_is_rejected() {
    let mut e = OperationEngine::new(0);
    e.push(ins(0, "a"), Origin::Local).unwrap();

    for bogus in [1_000, 20_000_000, Seq::MAX] {
        let err = e.push(ins(0, "x"), remote(1, &[0, 0, bogus], 1)).unwrap_err();
        assert!(matches!(err, EngineError::MissingHistoryEntry { site: 2, seq: 1 }));
    }
    assert_eq!(e.buffer_size(), 1);
    assert_eq!(e.clock().sites(), &[1]);
}

#[test]
fn context_at_last_seq_is_rejected() {
    let mut e = OperationEngine::new(0);
    let err = e.push(ins(0, "x"), remote(1, &[0, Seq::MAX], 1)).unwrap_err();
    assert!(matches!(err, EngineError::MissingHistoryEntry { site: 1, seq: 1 }));
    assert_eq!(e.buffer_size(), 0);
}

#[test]
fn exhausted_local_clock_is_rejected() {
    let mut e = OperationEngine::new(0);
    let state = EngineState {
        clock_table: vec![vec![Seq::MAX]],
        history: Vec::new(),
        site_id: 0,
        frozen: Vec::new(),
    };
    e.set_state(state).unwrap();

    let err = e.push(ins(0, "x"), Origin::Local).unwrap_err();
    assert!(matches!(err, EngineError::SequenceOverflow { site: 0 }));
    assert_eq!(e.buffer_size(), 0);
}
