//! Engine benchmarks.
//!
//! Covers the hot paths of a busy site: stamping local edits,
//! transforming a remote edit across a long concurrent history, purging,
//! and snapshotting for late joiners.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use concur::ot::primitives::{Order, VectorClock};
use concur::ot::{Edit, OperationEngine, Origin};
use serde_json::json;

fn ins(position: usize) -> Edit {
    return Edit::Insert {
        key: "doc".into(),
        value: json!("x"),
        position,
    };
}

/// Site 0 with `count` local inserts the peer at site 1 has not seen.
fn busy_engine(count: usize) -> OperationEngine {
    let mut engine = OperationEngine::new(0);
    engine.thaw_site(1);
    for i in 0..count {
        engine.push(ins(i), Origin::Local).unwrap();
    }
    return engine;
}

// =============================================================================
// Clocks
// =============================================================================

fn bench_clock(c: &mut Criterion) {
    let mut group = c.benchmark_group("clock");
    let a = VectorClock::from_sites((0..16).map(|i| i * 3).collect());
    let b = VectorClock::from_sites((0..16).map(|i| i * 2).collect());

    group.bench_function("compare", |bench| bench.iter(|| black_box(a.compare(&b))));
    group.bench_function("subtract", |bench| bench.iter(|| black_box(a.subtract(&b))));
    group.finish();
}

// =============================================================================
// Engine
// =============================================================================

fn bench_local(c: &mut Criterion) {
    c.bench_function("engine/local_1000", |b| {
        b.iter(|| black_box(busy_engine(1000)));
    });
}

fn bench_remote(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/remote_concurrent");
    for count in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || busy_engine(count),
                |mut engine| {
                    let origin = Origin::Remote {
                        site: 1,
                        clock: VectorClock::with_count(2),
                        order: Order::new(1),
                    };
                    black_box(engine.push(ins(0), origin).unwrap())
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_purge(c: &mut Criterion) {
    c.bench_function("engine/purge_1000", |b| {
        b.iter_batched(
            || {
                let mut engine = busy_engine(1000);
                engine.push_sync(1, VectorClock::from_sites(vec![500, 0]));
                engine
            },
            |mut engine| black_box(engine.purge().unwrap()),
            BatchSize::SmallInput,
        )
    });
}

fn bench_state(c: &mut Criterion) {
    let engine = busy_engine(1000);
    c.bench_function("state/to_json_1000", |b| {
        b.iter(|| black_box(engine.state().to_json().unwrap()));
    });
}

criterion_group!(benches, bench_clock, bench_local, bench_remote, bench_purge, bench_state);
criterion_main!(benches);
