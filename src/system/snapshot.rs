use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

use super::source::{Category, Reading};

/// One collection cycle, frozen. Categories whose source failed, timed out or
/// was disabled hold their `Default` value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(serialize_with = "serialize_unix_millis")]
    pub timestamp: SystemTime,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub gpu: GpuMetrics,
    pub disk: DiskMetrics,
    pub network: NetworkMetrics,
    pub top_processes: Vec<ProcessSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuMetrics {
    pub usage_percent: f32,
    pub per_core_percent: Vec<f32>,
    pub temperature_celsius: Option<f32>,
    pub frequency_mhz: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryMetrics {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub swap_used_bytes: u64,
    pub swap_total_bytes: u64,
}

impl MemoryMetrics {
    pub fn used_percent(&self) -> f64 {
        percent(self.used_bytes, self.total_bytes)
    }

    pub fn swap_percent(&self) -> f64 {
        percent(self.swap_used_bytes, self.swap_total_bytes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpuMetrics {
    pub available: bool,
    pub name: String,
    pub usage_percent: f32,
    pub temperature_celsius: f32,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub core_clock_mhz: u32,
    pub fan_speed_percent: Option<u32>,
    pub power_watts: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskMetrics {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    pub read_iops: f64,
    pub write_iops: f64,
    pub volumes: Vec<VolumeMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeMetrics {
    pub name: String,
    pub mount_point: String,
    pub file_system: String,
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
    pub read_iops: f64,
    pub write_iops: f64,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl VolumeMetrics {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    pub fn used_percent(&self) -> f64 {
        percent(self.used_bytes(), self.total_bytes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkMetrics {
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
    /// Bytes received since the previous sample, all interfaces.
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets_per_sec: f64,
    pub tx_packets_per_sec: f64,
    pub interfaces: Vec<InterfaceMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterfaceMetrics {
    pub name: String,
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub is_up: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessSummary {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub memory_percent: f32,
    pub status: String,
}

impl Snapshot {
    /// A snapshot with every category at its default value.
    pub fn empty(timestamp: SystemTime) -> Self {
        Snapshot {
            timestamp,
            cpu: CpuMetrics::default(),
            memory: MemoryMetrics::default(),
            gpu: GpuMetrics::default(),
            disk: DiskMetrics::default(),
            network: NetworkMetrics::default(),
            top_processes: Vec::new(),
        }
    }

    pub fn unix_millis(&self) -> u64 {
        unix_millis(self.timestamp)
    }

    pub fn key_metrics(&self) -> KeyMetrics {
        KeyMetrics {
            cpu_percent: f64::from(self.cpu.usage_percent),
            memory_percent: self.memory.used_percent(),
            memory_used_bytes: self.memory.used_bytes as f64,
            gpu_percent: f64::from(self.gpu.usage_percent),
            gpu_temperature_celsius: f64::from(self.gpu.temperature_celsius),
            disk_read_bytes_per_sec: self.disk.read_bytes_per_sec,
            disk_write_bytes_per_sec: self.disk.write_bytes_per_sec,
            net_rx_bytes_per_sec: self.network.rx_bytes_per_sec,
            net_tx_bytes_per_sec: self.network.tx_bytes_per_sec,
        }
    }
}

/// The numeric fields the history aggregates operate on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KeyMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_bytes: f64,
    pub gpu_percent: f64,
    pub gpu_temperature_celsius: f64,
    pub disk_read_bytes_per_sec: f64,
    pub disk_write_bytes_per_sec: f64,
    pub net_rx_bytes_per_sec: f64,
    pub net_tx_bytes_per_sec: f64,
}

const KEY_METRIC_COUNT: usize = 9;

impl KeyMetrics {
    fn to_array(self) -> [f64; KEY_METRIC_COUNT] {
        [
            self.cpu_percent,
            self.memory_percent,
            self.memory_used_bytes,
            self.gpu_percent,
            self.gpu_temperature_celsius,
            self.disk_read_bytes_per_sec,
            self.disk_write_bytes_per_sec,
            self.net_rx_bytes_per_sec,
            self.net_tx_bytes_per_sec,
        ]
    }

    fn from_array(values: [f64; KEY_METRIC_COUNT]) -> Self {
        let [
            cpu_percent,
            memory_percent,
            memory_used_bytes,
            gpu_percent,
            gpu_temperature_celsius,
            disk_read_bytes_per_sec,
            disk_write_bytes_per_sec,
            net_rx_bytes_per_sec,
            net_tx_bytes_per_sec,
        ] = values;
        KeyMetrics {
            cpu_percent,
            memory_percent,
            memory_used_bytes,
            gpu_percent,
            gpu_temperature_celsius,
            disk_read_bytes_per_sec,
            disk_write_bytes_per_sec,
            net_rx_bytes_per_sec,
            net_tx_bytes_per_sec,
        }
    }

    /// Field-wise combination of two projections.
    pub fn zip_with(self, other: KeyMetrics, f: impl Fn(f64, f64) -> f64) -> KeyMetrics {
        let a = self.to_array();
        let b = other.to_array();
        KeyMetrics::from_array(std::array::from_fn(|i| f(a[i], b[i])))
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> KeyMetrics {
        KeyMetrics::from_array(self.to_array().map(f))
    }
}

/// Mutable shell for one in-flight cycle. Each category is written at most
/// once; [`SnapshotBuilder::finish`] freezes it.
#[derive(Debug)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
    reported: Vec<Category>,
}

impl SnapshotBuilder {
    pub fn new(timestamp: SystemTime) -> Self {
        SnapshotBuilder {
            snapshot: Snapshot::empty(timestamp),
            reported: Vec::with_capacity(Category::ALL.len()),
        }
    }

    /// Stores a reading in its category's field. Returns `false` and leaves
    /// the shell untouched if that category already reported this cycle.
    pub fn apply(&mut self, reading: Reading) -> bool {
        let category = reading.category();
        if self.reported.contains(&category) {
            return false;
        }
        self.reported.push(category);
        match reading {
            Reading::Cpu(cpu) => self.snapshot.cpu = cpu,
            Reading::Memory(memory) => self.snapshot.memory = memory,
            Reading::Gpu(gpu) => self.snapshot.gpu = gpu,
            Reading::Disk(disk) => self.snapshot.disk = disk,
            Reading::Network(network) => self.snapshot.network = network,
            Reading::Processes(processes) => self.snapshot.top_processes = processes,
        }
        true
    }

    pub fn has_reported(&self, category: Category) -> bool {
        self.reported.contains(&category)
    }

    pub fn finish(self) -> Snapshot {
        self.snapshot
    }
}

pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

fn serialize_unix_millis<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(unix_millis(*time))
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_first_reading_per_category() {
        let mut builder = SnapshotBuilder::new(UNIX_EPOCH);
        assert!(builder.apply(Reading::Cpu(CpuMetrics {
            usage_percent: 12.5,
            ..Default::default()
        })));
        assert!(!builder.apply(Reading::Cpu(CpuMetrics {
            usage_percent: 99.0,
            ..Default::default()
        })));
        assert!(builder.has_reported(Category::Cpu));
        assert!(!builder.has_reported(Category::Memory));

        let snapshot = builder.finish();
        assert_eq!(snapshot.cpu.usage_percent, 12.5);
        assert_eq!(snapshot.memory, MemoryMetrics::default());
    }

    #[test]
    fn memory_percent_handles_zero_total() {
        let memory = MemoryMetrics::default();
        assert_eq!(memory.used_percent(), 0.0);

        let memory = MemoryMetrics {
            used_bytes: 512,
            total_bytes: 2048,
            ..Default::default()
        };
        assert!((memory.used_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn volume_used_bytes_saturates() {
        let volume = VolumeMetrics {
            total_bytes: 100,
            available_bytes: 150,
            ..Default::default()
        };
        assert_eq!(volume.used_bytes(), 0);
    }

    #[test]
    fn key_metrics_zip_is_fieldwise() {
        let a = KeyMetrics {
            cpu_percent: 10.0,
            net_tx_bytes_per_sec: 4.0,
            ..Default::default()
        };
        let b = KeyMetrics {
            cpu_percent: 30.0,
            net_tx_bytes_per_sec: 1.0,
            ..Default::default()
        };
        let max = a.zip_with(b, f64::max);
        assert_eq!(max.cpu_percent, 30.0);
        assert_eq!(max.net_tx_bytes_per_sec, 4.0);
        assert_eq!(a.map(|v| v * 2.0).cpu_percent, 20.0);
    }

    #[test]
    fn serializes_timestamp_as_unix_millis() {
        let snapshot = Snapshot::empty(UNIX_EPOCH + Duration::from_millis(1_700_000_000_123));
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000_123u64);
        assert_eq!(json["gpu"]["available"], false);
    }
}
