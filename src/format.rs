use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::system::history::{WindowAverage, WindowRange};
use crate::system::snapshot::Snapshot;

const PROCESS_NAME_WIDTH: usize = 16;

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0).round() as u64))
}

/// One-line overview of a snapshot, as printed by the CLI.
pub fn summary_line(snapshot: &Snapshot) -> String {
    let mut parts = Vec::with_capacity(6);

    let mut cpu = format!("CPU {:5.1}%", snapshot.cpu.usage_percent);
    if let Some(temp) = snapshot.cpu.temperature_celsius {
        cpu.push_str(&format!(" {temp:.0}°C"));
    }
    parts.push(cpu);

    parts.push(format!(
        "MEM {}/{} ({:.0}%)",
        format_bytes(snapshot.memory.used_bytes),
        format_bytes(snapshot.memory.total_bytes),
        snapshot.memory.used_percent()
    ));

    if snapshot.gpu.available {
        parts.push(format!(
            "GPU {:.0}% {:.0}°C",
            snapshot.gpu.usage_percent, snapshot.gpu.temperature_celsius
        ));
    } else {
        parts.push("GPU n/a".to_string());
    }

    parts.push(format!(
        "DISK R {} W {}",
        format_rate(snapshot.disk.read_bytes_per_sec),
        format_rate(snapshot.disk.write_bytes_per_sec)
    ));
    parts.push(format!(
        "NET \u{2193} {} \u{2191} {}",
        format_rate(snapshot.network.rx_bytes_per_sec),
        format_rate(snapshot.network.tx_bytes_per_sec)
    ));

    if let Some(top) = snapshot.top_processes.first() {
        parts.push(format!(
            "TOP {} {:.1}%",
            truncate_unicode(&top.name, PROCESS_NAME_WIDTH),
            top.cpu_percent
        ));
    }

    parts.join(" | ")
}

/// Multi-line report of history aggregates.
pub fn window_report(average: &WindowAverage, range: &WindowRange) -> String {
    let mean = &average.mean;
    let rows = [
        ("cpu %", mean.cpu_percent, range.min.cpu_percent, range.max.cpu_percent),
        (
            "memory %",
            mean.memory_percent,
            range.min.memory_percent,
            range.max.memory_percent,
        ),
        ("gpu %", mean.gpu_percent, range.min.gpu_percent, range.max.gpu_percent),
        (
            "gpu °C",
            mean.gpu_temperature_celsius,
            range.min.gpu_temperature_celsius,
            range.max.gpu_temperature_celsius,
        ),
    ];

    let mut out = format!("history over {} samples\n", average.samples);
    for (label, avg, min, max) in rows {
        out.push_str(&format!(
            "  {label:<9} avg {avg:6.1}  min {min:6.1}  max {max:6.1}\n"
        ));
    }
    out.push_str(&format!(
        "  disk      avg R {} W {}\n",
        format_rate(mean.disk_read_bytes_per_sec),
        format_rate(mean.disk_write_bytes_per_sec)
    ));
    out.push_str(&format!(
        "  network   avg \u{2193} {} \u{2191} {}\n",
        format_rate(mean.net_rx_bytes_per_sec),
        format_rate(mean.net_tx_bytes_per_sec)
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pick_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 / 2), "1.5 MB");
        assert_eq!(format_bytes(8 * 1024 * 1024 * 1024), "8.0 GB");
    }

    #[test]
    fn rate_clamps_negative() {
        assert_eq!(format_rate(-5.0), "0 B/s");
        assert_eq!(format_rate(1024.0), "1 KB/s");
    }

    #[test]
    fn truncation_adds_ellipsis() {
        assert_eq!(truncate_unicode("short", 16), "short");
        assert_eq!(truncate_unicode("a_very_long_process_name", 8), "a_very_\u{2026}");
    }
}
