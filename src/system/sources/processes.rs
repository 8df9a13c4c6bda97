use std::cmp::Ordering;

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::system::snapshot::ProcessSummary;
use crate::system::source::{Category, Reading, Source};

const DEFAULT_TOP: usize = 10;

/// The busiest processes by CPU, then resident memory.
pub struct ProcessSource {
    sys: System,
    top: usize,
}

impl Default for ProcessSource {
    fn default() -> Self {
        Self::new(DEFAULT_TOP)
    }
}

impl ProcessSource {
    pub fn new(top: usize) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        ProcessSource { sys, top }
    }
}

impl Source for ProcessSource {
    fn category(&self) -> Category {
        Category::Processes
    }

    fn collect(&mut self) -> Reading {
        self.sys.refresh_memory();
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );

        let total_memory = self.sys.total_memory();
        let processes = self
            .sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessSummary {
                pid: pid.as_u32(),
                name: process.name().to_string_lossy().to_string(),
                cpu_percent: process.cpu_usage(),
                memory_bytes: process.memory(),
                memory_percent: if total_memory == 0 {
                    0.0
                } else {
                    (process.memory() as f64 / total_memory as f64 * 100.0) as f32
                },
                status: format!("{:?}", process.status()),
            })
            .collect();
        Reading::Processes(top_n(processes, self.top))
    }
}

fn top_n(mut processes: Vec<ProcessSummary>, n: usize) -> Vec<ProcessSummary> {
    processes.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(Ordering::Equal)
            .then(b.memory_bytes.cmp(&a.memory_bytes))
            .then(a.pid.cmp(&b.pid))
    });
    processes.truncate(n);
    processes
}
