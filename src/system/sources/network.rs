use std::time::Instant;

use sysinfo::Networks;

use super::disk::per_second;
use crate::system::platform;
use crate::system::snapshot::{InterfaceMetrics, NetworkMetrics};
use crate::system::source::{Category, Reading, Source};

pub struct NetworkSource {
    networks: Networks,
    last_sample: Instant,
}

impl Default for NetworkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkSource {
    pub fn new() -> Self {
        NetworkSource {
            networks: Networks::new_with_refreshed_list(),
            last_sample: Instant::now(),
        }
    }
}

impl Source for NetworkSource {
    fn category(&self) -> Category {
        Category::Network
    }

    fn collect(&mut self) -> Reading {
        self.networks.refresh(true);
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_sample).as_secs_f64();
        self.last_sample = now;

        let mut metrics = NetworkMetrics::default();
        let mut rx_packets = 0u64;
        let mut tx_packets = 0u64;
        for (name, data) in self.networks.list() {
            let received = data.received();
            let transmitted = data.transmitted();
            metrics.rx_bytes += received;
            metrics.tx_bytes += transmitted;
            rx_packets += data.packets_received();
            tx_packets += data.packets_transmitted();

            let seen_traffic = data.total_received() > 0 || data.total_transmitted() > 0;
            metrics.interfaces.push(InterfaceMetrics {
                name: name.clone(),
                rx_bytes_per_sec: per_second(received, elapsed),
                tx_bytes_per_sec: per_second(transmitted, elapsed),
                rx_packets: data.packets_received(),
                tx_packets: data.packets_transmitted(),
                is_up: platform::interface_is_up(name).unwrap_or(seen_traffic),
            });
        }
        metrics.interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        metrics.rx_bytes_per_sec = per_second(metrics.rx_bytes, elapsed);
        metrics.tx_bytes_per_sec = per_second(metrics.tx_bytes, elapsed);
        metrics.rx_packets_per_sec = per_second(rx_packets, elapsed);
        metrics.tx_packets_per_sec = per_second(tx_packets, elapsed);
        Reading::Network(metrics)
    }
}
