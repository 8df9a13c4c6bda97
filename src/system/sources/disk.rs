use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::time::Instant;

use sysinfo::Disks;

use crate::system::platform::{self, DiskOpCounters};
use crate::system::snapshot::{DiskMetrics, VolumeMetrics};
use crate::system::source::{Category, Reading, Source};

pub struct DiskSource {
    disks: Disks,
    last_sample: Instant,
    last_ops: HashMap<String, DiskOpCounters>,
}

impl Default for DiskSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskSource {
    pub fn new() -> Self {
        DiskSource {
            disks: Disks::new_with_refreshed_list(),
            last_sample: Instant::now(),
            last_ops: platform::disk_op_counters().unwrap_or_default(),
        }
    }
}

impl Source for DiskSource {
    fn category(&self) -> Category {
        Category::Disk
    }

    fn collect(&mut self) -> Reading {
        self.disks.refresh(true);
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_sample).as_secs_f64();
        self.last_sample = now;
        let ops = platform::disk_op_counters();

        let mut metrics = DiskMetrics::default();
        let mut counted = HashSet::new();
        for disk in self.disks.list() {
            let usage = disk.usage();
            let device = device_key(disk.name());
            let (read_iops, write_iops) = ops
                .as_ref()
                .and_then(|current| current.get(&device).zip(self.last_ops.get(&device)))
                .map(|(current, previous)| {
                    (
                        per_second(current.reads.saturating_sub(previous.reads), elapsed),
                        per_second(current.writes.saturating_sub(previous.writes), elapsed),
                    )
                })
                .unwrap_or((0.0, 0.0));

            let volume = VolumeMetrics {
                name: disk.name().to_string_lossy().into_owned(),
                mount_point: disk.mount_point().display().to_string(),
                file_system: disk.file_system().to_string_lossy().into_owned(),
                read_bytes_per_sec: per_second(usage.read_bytes, elapsed),
                write_bytes_per_sec: per_second(usage.written_bytes, elapsed),
                read_iops,
                write_iops,
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space(),
            };

            // the same device can be mounted more than once
            if counted.insert(device) {
                metrics.read_bytes_per_sec += volume.read_bytes_per_sec;
                metrics.write_bytes_per_sec += volume.write_bytes_per_sec;
                metrics.read_iops += volume.read_iops;
                metrics.write_iops += volume.write_iops;
            }
            metrics.volumes.push(volume);
        }

        if let Some(ops) = ops {
            self.last_ops = ops;
        }
        Reading::Disk(metrics)
    }
}

fn device_key(name: &OsStr) -> String {
    let name = name.to_string_lossy();
    name.strip_prefix("/dev/").unwrap_or(&name).to_string()
}

pub(crate) fn per_second(delta: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        delta as f64 / elapsed_secs
    } else {
        0.0
    }
}
