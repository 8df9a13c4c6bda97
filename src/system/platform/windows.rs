// PDH/D3DKMT counters would need windows-sys bindings; the adapters fall
// back to sysinfo data.

use std::collections::HashMap;

use super::{DiskOpCounters, GpuCounters, GpuDevice, PlatformExtensions};

pub struct Platform;

impl PlatformExtensions for Platform {
    fn disk_op_counters() -> Option<HashMap<String, DiskOpCounters>> {
        None
    }

    fn interface_is_up(_name: &str) -> Option<bool> {
        None
    }

    fn probe_gpu() -> Option<GpuDevice> {
        None
    }

    fn read_gpu(_device: &GpuDevice) -> Option<GpuCounters> {
        None
    }
}
