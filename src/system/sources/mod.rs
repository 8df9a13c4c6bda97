//! `sysinfo`-backed [`Source`] implementations, one per [`Category`].

mod cpu;
mod disk;
mod gpu;
mod memory;
mod network;
mod processes;

pub use cpu::CpuSource;
pub use disk::DiskSource;
pub use gpu::GpuSource;
pub use memory::MemorySource;
pub use network::NetworkSource;
pub use processes::ProcessSource;

use serde::Serialize;
use sysinfo::System;

use super::source::{Category, Source, SourceToggles};

/// Builds the adapters for every enabled category.
pub fn default_sources(toggles: &SourceToggles, top_process_count: usize) -> Vec<Box<dyn Source>> {
    let mut sources: Vec<Box<dyn Source>> = Vec::new();
    for category in Category::ALL {
        if !toggles.is_enabled(category) {
            continue;
        }
        let source: Box<dyn Source> = match category {
            Category::Cpu => Box::new(CpuSource::new()),
            Category::Memory => Box::new(MemorySource::new()),
            Category::Gpu => Box::new(GpuSource::new()),
            Category::Disk => Box::new(DiskSource::new()),
            Category::Network => Box::new(NetworkSource::new()),
            Category::Processes => Box::new(ProcessSource::new(top_process_count)),
        };
        sources.push(source);
    }
    sources
}

/// Static host description.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SystemInfo {
    pub host_name: Option<String>,
    pub os_version: Option<String>,
    pub cpu_brand: Option<String>,
    pub logical_cores: usize,
    pub total_memory_bytes: u64,
    pub accelerator: Option<String>,
}

pub fn host_info() -> SystemInfo {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu_all();
    SystemInfo {
        host_name: System::host_name(),
        os_version: System::long_os_version(),
        cpu_brand: sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty()),
        logical_cores: sys.cpus().len(),
        total_memory_bytes: sys.total_memory(),
        accelerator: None,
    }
}
