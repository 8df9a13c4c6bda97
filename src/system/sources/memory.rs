use sysinfo::System;

use crate::system::snapshot::MemoryMetrics;
use crate::system::source::{Category, Reading, Source};

pub struct MemorySource {
    sys: System,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource { sys: System::new() }
    }
}

impl Source for MemorySource {
    fn category(&self) -> Category {
        Category::Memory
    }

    fn collect(&mut self) -> Reading {
        self.sys.refresh_memory();
        Reading::Memory(MemoryMetrics {
            used_bytes: self.sys.used_memory(),
            total_bytes: self.sys.total_memory(),
            swap_used_bytes: self.sys.used_swap(),
            swap_total_bytes: self.sys.total_swap(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_never_exceeds_total() {
        let mut source = MemorySource::new();
        let Reading::Memory(memory) = source.collect() else {
            panic!("memory source returned another category");
        };
        assert!(memory.total_bytes > 0);
        assert!(memory.used_bytes <= memory.total_bytes);
    }
}
