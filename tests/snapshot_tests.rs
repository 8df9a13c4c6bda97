use std::time::{Duration, UNIX_EPOCH};

use insta::assert_snapshot;
use sysvitals::format::{summary_line, window_report};
use sysvitals::system::history::HistoryStore;
use sysvitals::system::snapshot::{ProcessSummary, Snapshot};

const GIB: u64 = 1024 * 1024 * 1024;

fn busy_snapshot() -> Snapshot {
    let mut snapshot = Snapshot::empty(UNIX_EPOCH + Duration::from_millis(1_700_000_000_123));
    snapshot.cpu.usage_percent = 37.5;
    snapshot.cpu.temperature_celsius = Some(61.0);
    snapshot.memory.used_bytes = 4 * GIB;
    snapshot.memory.total_bytes = 16 * GIB;
    snapshot.gpu.available = true;
    snapshot.gpu.name = "AMD Radeon".into();
    snapshot.gpu.usage_percent = 80.0;
    snapshot.gpu.temperature_celsius = 70.0;
    snapshot.disk.read_bytes_per_sec = 1024.0 * 1024.0;
    snapshot.disk.write_bytes_per_sec = 2048.0;
    snapshot.network.rx_bytes_per_sec = 512.0;
    snapshot.top_processes.push(ProcessSummary {
        pid: 4242,
        name: "postgres".into(),
        cpu_percent: 12.5,
        memory_bytes: 256 * 1024 * 1024,
        memory_percent: 1.5,
        status: "Run".into(),
    });
    snapshot
}

#[test]
fn summary_line_for_busy_host() {
    assert_snapshot!(
        summary_line(&busy_snapshot()),
        @"CPU  37.5% 61°C | MEM 4.0 GB/16.0 GB (25%) | GPU 80% 70°C | DISK R 1.0 MB/s W 2 KB/s | NET ↓ 512 B/s ↑ 0 B/s | TOP postgres 12.5%"
    );
}

#[test]
fn summary_line_for_empty_snapshot() {
    assert_snapshot!(
        summary_line(&Snapshot::empty(UNIX_EPOCH)),
        @"CPU   0.0% | MEM 0 B/0 B (0%) | GPU n/a | DISK R 0 B/s W 0 B/s | NET ↓ 0 B/s ↑ 0 B/s"
    );
}

#[test]
fn window_report_lists_aggregates() {
    let store = HistoryStore::new(10);
    for (i, cpu) in [10.0, 20.0, 30.0].into_iter().enumerate() {
        let mut snapshot = Snapshot::empty(UNIX_EPOCH + Duration::from_secs(i as u64));
        snapshot.cpu.usage_percent = cpu;
        snapshot.memory.used_bytes = GIB;
        snapshot.memory.total_bytes = 4 * GIB;
        snapshot.disk.read_bytes_per_sec = 1024.0;
        store.add(&snapshot);
    }

    let average = store.average(3).expect("three entries");
    let range = store.min_max(3).expect("three entries");
    let report = window_report(&average, &range);
    let lines: Vec<&str> = report.lines().collect();

    assert_eq!(
        lines,
        vec![
            "history over 3 samples",
            "  cpu %     avg   20.0  min   10.0  max   30.0",
            "  memory %  avg   25.0  min   25.0  max   25.0",
            "  gpu %     avg    0.0  min    0.0  max    0.0",
            "  gpu °C    avg    0.0  min    0.0  max    0.0",
            "  disk      avg R 1 KB/s W 0 B/s",
            "  network   avg ↓ 0 B/s ↑ 0 B/s",
        ]
    );
}

#[test]
fn json_shape_uses_unix_millis_and_nested_categories() {
    let value = serde_json::to_value(busy_snapshot()).expect("snapshot serializes");

    assert_eq!(value["timestamp"], 1_700_000_000_123u64);
    assert_eq!(value["cpu"]["usage_percent"], 37.5);
    assert_eq!(value["memory"]["total_bytes"], 16 * GIB);
    assert_eq!(value["gpu"]["name"], "AMD Radeon");
    assert_eq!(value["top_processes"][0]["pid"], 4242);

    let categories: Vec<&str> = value
        .as_object()
        .expect("snapshot is an object")
        .keys()
        .map(String::as_str)
        .collect();
    let mut sorted = categories.clone();
    sorted.sort_unstable();
    assert_eq!(
        sorted,
        vec!["cpu", "disk", "gpu", "memory", "network", "timestamp", "top_processes"]
    );
}
