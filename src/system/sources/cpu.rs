use sysinfo::{Components, System};

use crate::system::snapshot::CpuMetrics;
use crate::system::source::{Category, Reading, Source};

const TEMPERATURE_LABELS: [&str; 5] = ["cpu", "package", "tctl", "tdie", "coretemp"];

pub struct CpuSource {
    sys: System,
    components: Components,
}

impl Default for CpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSource {
    pub fn new() -> Self {
        // usage is a delta; the first refresh only primes the counters
        let mut sys = System::new();
        sys.refresh_cpu_all();
        CpuSource {
            sys,
            components: Components::new_with_refreshed_list(),
        }
    }

    fn temperature(&mut self) -> Option<f32> {
        self.components.refresh(false);
        self.components
            .list()
            .iter()
            .filter(|component| {
                let label = component.label().to_ascii_lowercase();
                TEMPERATURE_LABELS.iter().any(|needle| label.contains(needle))
            })
            .filter_map(|component| component.temperature())
            .filter(|t| t.is_finite() && *t > 0.0)
            .reduce(f32::max)
    }
}

impl Source for CpuSource {
    fn category(&self) -> Category {
        Category::Cpu
    }

    fn collect(&mut self) -> Reading {
        let temperature_celsius = self.temperature();
        self.sys.refresh_cpu_all();
        let cpus = self.sys.cpus();
        Reading::Cpu(CpuMetrics {
            usage_percent: self.sys.global_cpu_usage(),
            per_core_percent: cpus.iter().map(|cpu| cpu.cpu_usage()).collect(),
            temperature_celsius,
            frequency_mhz: cpus.first().map(|cpu| cpu.frequency()).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_one_entry_per_core() {
        let mut source = CpuSource::new();
        let Reading::Cpu(cpu) = source.collect() else {
            panic!("cpu source returned another category");
        };
        assert!(!cpu.per_core_percent.is_empty());
        assert!(cpu.usage_percent >= 0.0);
    }
}
