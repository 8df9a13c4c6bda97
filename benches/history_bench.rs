use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::{Duration, UNIX_EPOCH};
use sysvitals::format::summary_line;
use sysvitals::system::history::HistoryStore;
use sysvitals::system::snapshot::{CpuMetrics, ProcessSummary, Snapshot};

fn make_snapshot(seq: u64) -> Snapshot {
    let mut snapshot = Snapshot::empty(UNIX_EPOCH + Duration::from_secs(seq));
    snapshot.cpu = CpuMetrics {
        usage_percent: (seq % 100) as f32,
        per_core_percent: vec![(seq % 100) as f32; 16],
        temperature_celsius: Some(55.0),
        frequency_mhz: 3600,
    };
    snapshot.memory.used_bytes = seq * 4096;
    snapshot.memory.total_bytes = 32 << 30;
    snapshot.disk.read_bytes_per_sec = (seq * 1024) as f64;
    snapshot.network.rx_bytes_per_sec = (seq * 512) as f64;
    snapshot.top_processes = (0..10)
        .map(|i| ProcessSummary {
            pid: i + 1,
            name: format!("proc_{i}"),
            cpu_percent: i as f32,
            memory_bytes: u64::from(i) * 1024 * 1024,
            ..Default::default()
        })
        .collect();
    snapshot
}

fn filled_store(capacity: usize) -> HistoryStore {
    let store = HistoryStore::new(capacity);
    for seq in 0..capacity as u64 {
        store.add(&make_snapshot(seq));
    }
    store
}

fn bench_add_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_add_60_600_3600");

    for capacity in [60usize, 600, 3600] {
        let store = filled_store(capacity);
        let next = make_snapshot(capacity as u64);
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &next, |b, next| {
            b.iter(|| store.add(black_box(next)))
        });
    }

    group.finish();
}

fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_reads_60_600_3600");

    for capacity in [60usize, 600, 3600] {
        let store = filled_store(capacity);
        group.bench_with_input(BenchmarkId::new("latest", capacity), &store, |b, store| {
            b.iter(|| black_box(store.latest()))
        });
        group.bench_with_input(BenchmarkId::new("last_60", capacity), &store, |b, store| {
            b.iter(|| black_box(store.last(black_box(60))))
        });
    }

    group.finish();
}

fn bench_aggregates(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_aggregates_60_600_3600");

    for capacity in [60usize, 600, 3600] {
        let store = filled_store(capacity);
        group.bench_with_input(BenchmarkId::new("average", capacity), &store, |b, store| {
            b.iter(|| black_box(store.average(black_box(capacity))))
        });
        group.bench_with_input(BenchmarkId::new("min_max", capacity), &store, |b, store| {
            b.iter(|| black_box(store.min_max(black_box(capacity))))
        });
    }

    group.finish();
}

fn bench_summary_line(c: &mut Criterion) {
    let snapshot = make_snapshot(42);
    c.bench_function("summary_line", |b| {
        b.iter(|| black_box(summary_line(black_box(&snapshot))))
    });
}

criterion_group!(
    benches,
    bench_add_full,
    bench_reads,
    bench_aggregates,
    bench_summary_line
);
criterion_main!(benches);
