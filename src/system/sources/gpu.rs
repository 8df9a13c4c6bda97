use crate::system::platform::{self, GpuCounters, GpuDevice};
use crate::system::snapshot::GpuMetrics;
use crate::system::source::{Category, Reading, Source};

/// Reads the first discrete accelerator found at construction. Without one the
/// source reports itself unavailable and is never scheduled.
pub struct GpuSource {
    device: Option<GpuDevice>,
}

impl Default for GpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuSource {
    pub fn new() -> Self {
        let device = platform::probe_gpu();
        match &device {
            Some(device) => tracing::info!(name = %device.name, "accelerator monitoring initialized"),
            None => tracing::warn!("no supported accelerator found, gpu metrics disabled"),
        }
        GpuSource { device }
    }
}

impl Source for GpuSource {
    fn category(&self) -> Category {
        Category::Gpu
    }

    fn is_available(&self) -> bool {
        self.device.is_some()
    }

    fn collect(&mut self) -> Reading {
        let Some(device) = &self.device else {
            return Reading::Gpu(GpuMetrics::default());
        };
        let metrics = match platform::read_gpu(device) {
            Some(counters) => to_metrics(&device.name, counters),
            None => GpuMetrics {
                name: device.name.clone(),
                ..GpuMetrics::default()
            },
        };
        Reading::Gpu(metrics)
    }
}

fn to_metrics(name: &str, counters: GpuCounters) -> GpuMetrics {
    GpuMetrics {
        available: true,
        name: name.to_string(),
        usage_percent: counters.busy_percent.min(100) as f32,
        temperature_celsius: counters
            .temperature_millicelsius
            .map(|milli| milli as f32 / 1000.0)
            .unwrap_or(0.0),
        memory_used_bytes: counters.vram_used_bytes,
        memory_total_bytes: counters.vram_total_bytes,
        core_clock_mhz: counters.core_clock_mhz.unwrap_or(0),
        fan_speed_percent: counters.fan_pwm.map(|pwm| u32::from(pwm) * 100 / 255),
        power_watts: counters
            .power_microwatts
            .map(|micro| micro as f32 / 1_000_000.0)
            .unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_sysfs_units() {
        let counters = GpuCounters {
            busy_percent: 42,
            vram_used_bytes: 1 << 30,
            vram_total_bytes: 8 << 30,
            temperature_millicelsius: Some(61_500),
            power_microwatts: Some(95_000_000),
            core_clock_mhz: Some(1800),
            fan_pwm: Some(255),
        };
        let metrics = to_metrics("test gpu", counters);
        assert!(metrics.available);
        assert_eq!(metrics.usage_percent, 42.0);
        assert_eq!(metrics.temperature_celsius, 61.5);
        assert_eq!(metrics.power_watts, 95.0);
        assert_eq!(metrics.fan_speed_percent, Some(100));
    }

    #[test]
    fn missing_device_yields_default() {
        let mut source = GpuSource { device: None };
        assert!(!source.is_available());
        assert_eq!(source.collect(), Reading::Gpu(GpuMetrics::default()));
    }
}
