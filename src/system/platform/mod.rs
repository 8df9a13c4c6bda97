use std::collections::HashMap;
use std::path::PathBuf;

/// Cumulative completed I/O operations for one block device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiskOpCounters {
    pub reads: u64,
    pub writes: u64,
}

/// A discrete accelerator found at probe time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpuDevice {
    pub name: String,
    pub root: PathBuf,
    pub hwmon: Option<PathBuf>,
}

/// Raw accelerator counters, in the units the OS reports them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GpuCounters {
    pub busy_percent: u32,
    pub vram_used_bytes: u64,
    pub vram_total_bytes: u64,
    pub temperature_millicelsius: Option<i64>,
    pub power_microwatts: Option<u64>,
    pub core_clock_mhz: Option<u32>,
    pub fan_pwm: Option<u8>,
}

pub trait PlatformExtensions {
    fn disk_op_counters() -> Option<HashMap<String, DiskOpCounters>>;
    fn interface_is_up(name: &str) -> Option<bool>;
    fn probe_gpu() -> Option<GpuDevice>;
    fn read_gpu(device: &GpuDevice) -> Option<GpuCounters>;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
use linux as platform_impl;
#[cfg(target_os = "macos")]
use macos as platform_impl;
#[cfg(target_os = "windows")]
use windows as platform_impl;

/// Keyed by device name without the `/dev/` prefix.
pub fn disk_op_counters() -> Option<HashMap<String, DiskOpCounters>> {
    platform_impl::Platform::disk_op_counters()
}

pub fn interface_is_up(name: &str) -> Option<bool> {
    platform_impl::Platform::interface_is_up(name)
}

pub fn probe_gpu() -> Option<GpuDevice> {
    platform_impl::Platform::probe_gpu()
}

pub fn read_gpu(device: &GpuDevice) -> Option<GpuCounters> {
    platform_impl::Platform::read_gpu(device)
}
