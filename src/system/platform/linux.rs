use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{DiskOpCounters, GpuCounters, GpuDevice, PlatformExtensions};

pub struct Platform;

impl PlatformExtensions for Platform {
    fn disk_op_counters() -> Option<HashMap<String, DiskOpCounters>> {
        let contents = fs::read_to_string("/proc/diskstats").ok()?;
        Some(parse_diskstats(&contents))
    }

    fn interface_is_up(name: &str) -> Option<bool> {
        let state = fs::read_to_string(format!("/sys/class/net/{name}/operstate")).ok()?;
        match state.trim() {
            "up" => Some(true),
            "down" | "dormant" | "lowerlayerdown" | "notpresent" => Some(false),
            // loopback and some virtual links report "unknown"
            _ => None,
        }
    }

    fn probe_gpu() -> Option<GpuDevice> {
        let mut cards: Vec<_> = fs::read_dir("/sys/class/drm")
            .ok()?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("card") && !n.contains('-'))
            })
            .collect();
        cards.sort();

        // amdgpu is the driver that exposes utilisation through sysfs
        let root = cards
            .into_iter()
            .map(|card| card.join("device"))
            .find(|device| device.join("gpu_busy_percent").exists())?;

        let hwmon = fs::read_dir(root.join("hwmon"))
            .ok()
            .and_then(|mut dirs| dirs.find_map(|entry| entry.ok().map(|e| e.path())));

        Some(GpuDevice {
            name: device_name(&root),
            root,
            hwmon,
        })
    }

    fn read_gpu(device: &GpuDevice) -> Option<GpuCounters> {
        let busy_percent = read_number(&device.root.join("gpu_busy_percent"))?;
        let hwmon = device.hwmon.as_deref();
        Some(GpuCounters {
            busy_percent,
            vram_used_bytes: read_number(&device.root.join("mem_info_vram_used")).unwrap_or(0),
            vram_total_bytes: read_number(&device.root.join("mem_info_vram_total")).unwrap_or(0),
            temperature_millicelsius: hwmon.and_then(|h| read_number(&h.join("temp1_input"))),
            power_microwatts: hwmon.and_then(|h| {
                read_number(&h.join("power1_average"))
                    .or_else(|| read_number(&h.join("power1_input")))
            }),
            core_clock_mhz: fs::read_to_string(device.root.join("pp_dpm_sclk"))
                .ok()
                .and_then(|s| parse_active_clock(&s)),
            fan_pwm: hwmon.and_then(|h| read_number(&h.join("pwm1"))),
        })
    }
}

fn read_number<T: std::str::FromStr>(path: &Path) -> Option<T> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn device_name(root: &Path) -> String {
    if let Ok(name) = fs::read_to_string(root.join("product_name"))
        && !name.trim().is_empty()
    {
        return name.trim().to_string();
    }
    let uevent = fs::read_to_string(root.join("uevent")).unwrap_or_default();
    let mut driver = "gpu";
    let mut pci_id = "";
    for line in uevent.lines() {
        if let Some(val) = line.strip_prefix("DRIVER=") {
            driver = val;
        } else if let Some(val) = line.strip_prefix("PCI_ID=") {
            pci_id = val;
        }
    }
    if pci_id.is_empty() {
        driver.to_string()
    } else {
        format!("{driver} [{pci_id}]")
    }
}

// /proc/diskstats: major minor name reads_completed reads_merged sectors_read
// ms_reading writes_completed ...
fn parse_diskstats(contents: &str) -> HashMap<String, DiskOpCounters> {
    let mut counters = HashMap::new();
    for line in contents.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            continue;
        }
        let (Ok(reads), Ok(writes)) = (fields[3].parse(), fields[7].parse()) else {
            continue;
        };
        counters.insert(fields[2].to_string(), DiskOpCounters { reads, writes });
    }
    counters
}

// pp_dpm_sclk lists one "idx: <clock>Mhz" per level; the active one ends in '*'
fn parse_active_clock(contents: &str) -> Option<u32> {
    let line = contents.lines().find(|l| l.trim_end().ends_with('*'))?;
    let clock = line.split_whitespace().nth(1)?;
    let digits: String = clock.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_diskstats_lines() {
        let sample = "\
 259       0 nvme0n1 120 5 9000 40 300 7 4000 80 0 100 120
 259       1 nvme0n1p1 12 0 900 4 30 0 400 8 0 10 12
   7       0 loop0 0 0 0 0
";
        let counters = parse_diskstats(sample);
        assert_eq!(
            counters["nvme0n1"],
            DiskOpCounters {
                reads: 120,
                writes: 300
            }
        );
        assert_eq!(counters["nvme0n1p1"].writes, 30);
        assert!(!counters.contains_key("loop0"));
    }

    #[test]
    fn parses_active_sclk_level() {
        let sample = "0: 500Mhz\n1: 1200Mhz *\n2: 2100Mhz\n";
        assert_eq!(parse_active_clock(sample), Some(1200));
        assert_eq!(parse_active_clock("0: 500Mhz\n"), None);
    }
}
