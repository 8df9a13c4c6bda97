use std::fmt;

use serde::{Deserialize, Serialize};

use super::snapshot::{
    CpuMetrics, DiskMetrics, GpuMetrics, MemoryMetrics, NetworkMetrics, ProcessSummary,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cpu,
    Memory,
    Gpu,
    Disk,
    Network,
    Processes,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Cpu,
        Category::Memory,
        Category::Gpu,
        Category::Disk,
        Category::Network,
        Category::Processes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Cpu => "cpu",
            Category::Memory => "memory",
            Category::Gpu => "gpu",
            Category::Disk => "disk",
            Category::Network => "network",
            Category::Processes => "processes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value one source produces for its category.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Cpu(CpuMetrics),
    Memory(MemoryMetrics),
    Gpu(GpuMetrics),
    Disk(DiskMetrics),
    Network(NetworkMetrics),
    Processes(Vec<ProcessSummary>),
}

impl Reading {
    pub fn category(&self) -> Category {
        match self {
            Reading::Cpu(_) => Category::Cpu,
            Reading::Memory(_) => Category::Memory,
            Reading::Gpu(_) => Category::Gpu,
            Reading::Disk(_) => Category::Disk,
            Reading::Network(_) => Category::Network,
            Reading::Processes(_) => Category::Processes,
        }
    }
}

/// Samples one metric category.
///
/// `collect` runs on a blocking worker thread and may stall inside OS calls;
/// the orchestrator bounds it with the cycle deadline. Implementations
/// degrade internal failures to zeroed or partial data instead of failing.
/// A panic is tolerated: the category keeps its default for that cycle.
pub trait Source: Send + 'static {
    fn category(&self) -> Category;

    /// Checked once at registration. Unavailable sources never get a task.
    fn is_available(&self) -> bool {
        true
    }

    fn collect(&mut self) -> Reading;
}

/// Per-category enable flags. Disabled categories are never sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceToggles {
    pub cpu: bool,
    pub memory: bool,
    pub gpu: bool,
    pub disk: bool,
    pub network: bool,
    pub processes: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        SourceToggles {
            cpu: true,
            memory: true,
            gpu: true,
            disk: true,
            network: true,
            processes: true,
        }
    }
}

impl SourceToggles {
    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::Cpu => self.cpu,
            Category::Memory => self.memory,
            Category::Gpu => self.gpu,
            Category::Disk => self.disk,
            Category::Network => self.network,
            Category::Processes => self.processes,
        }
    }

    pub fn set(&mut self, category: Category, enabled: bool) {
        let flag = match category {
            Category::Cpu => &mut self.cpu,
            Category::Memory => &mut self.memory,
            Category::Gpu => &mut self.gpu,
            Category::Disk => &mut self.disk,
            Category::Network => &mut self.network,
            Category::Processes => &mut self.processes,
        };
        *flag = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_reports_its_category() {
        assert_eq!(
            Reading::Processes(Vec::new()).category(),
            Category::Processes
        );
        assert_eq!(
            Reading::Gpu(GpuMetrics::default()).category(),
            Category::Gpu
        );
    }

    #[test]
    fn toggles_round_trip_through_set() {
        let mut toggles = SourceToggles::default();
        for category in Category::ALL {
            assert!(toggles.is_enabled(category));
        }
        toggles.set(Category::Gpu, false);
        assert!(!toggles.is_enabled(Category::Gpu));
        assert!(toggles.is_enabled(Category::Disk));
    }

    #[test]
    fn partial_toggles_from_toml() {
        let toggles: SourceToggles = toml::from_str("gpu = false").unwrap();
        assert!(!toggles.gpu);
        assert!(toggles.processes);
    }
}
