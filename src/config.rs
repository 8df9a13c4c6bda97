use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::VitalsError;
use crate::logging::LogFormat;
use crate::system::source::SourceToggles;

pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_COLLECTION_TIMEOUT: Duration = Duration::from_millis(800);
const MIN_COLLECTION_TIMEOUT: Duration = Duration::from_millis(50);
const MAX_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_HISTORY_DURATION: Duration = Duration::from_secs(1);
const MIN_STOP_TIMEOUT: Duration = Duration::from_millis(100);
/// One day of one-second ticks.
pub const MAX_HISTORY_CAPACITY: usize = 86_400;
const TOP_PROCESS_RANGE: (usize, usize) = (1, 50);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitoring: MonitoringConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub update_interval_ms: u64,
    pub history_duration_secs: u64,
    pub collection_timeout_ms: u64,
    pub stop_timeout_ms: u64,
    pub top_process_count: usize,
    pub subscriber_queue_capacity: usize,
    pub sources: SourceToggles,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        MonitoringConfig {
            update_interval_ms: 1000,
            history_duration_secs: 60,
            collection_timeout_ms: DEFAULT_COLLECTION_TIMEOUT.as_millis() as u64,
            stop_timeout_ms: 2000,
            top_process_count: 10,
            subscriber_queue_capacity: 16,
            sources: SourceToggles::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Validated runtime parameters for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSettings {
    pub tick_interval: Duration,
    pub collection_timeout: Duration,
    pub stop_timeout: Duration,
    pub history_capacity: usize,
    pub top_process_count: usize,
    pub subscriber_capacity: usize,
    pub sources: SourceToggles,
}

/// A configured value that was replaced by a safe one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigCorrection {
    pub field: &'static str,
    pub requested: String,
    pub applied: String,
}

impl fmt::Display for ConfigCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} is out of range, using {}",
            self.field, self.requested, self.applied
        )
    }
}

impl CollectionSettings {
    /// Never fails: out-of-range values are clamped and reported.
    pub fn from_config(config: &MonitoringConfig) -> (Self, Vec<ConfigCorrection>) {
        let mut corrections = Vec::new();
        let mut correct = |field: &'static str, requested: String, applied: String| {
            tracing::warn!(field, %requested, %applied, "correcting invalid monitoring setting");
            corrections.push(ConfigCorrection {
                field,
                requested,
                applied,
            });
        };

        let requested = Duration::from_millis(config.update_interval_ms);
        let tick_interval = requested.max(MIN_TICK_INTERVAL);
        if tick_interval != requested {
            correct("update_interval_ms", ms(requested), ms(tick_interval));
        }

        let requested = Duration::from_millis(config.collection_timeout_ms);
        let collection_timeout = requested.clamp(MIN_COLLECTION_TIMEOUT, MAX_COLLECTION_TIMEOUT);
        if collection_timeout != requested {
            correct("collection_timeout_ms", ms(requested), ms(collection_timeout));
        }

        let requested = Duration::from_secs(config.history_duration_secs);
        let history_duration = requested.max(MIN_HISTORY_DURATION);
        if history_duration != requested {
            correct(
                "history_duration_secs",
                config.history_duration_secs.to_string(),
                history_duration.as_secs().to_string(),
            );
        }

        let requested_capacity = history_capacity(history_duration, tick_interval);
        let history_capacity = requested_capacity.min(MAX_HISTORY_CAPACITY);
        if history_capacity != requested_capacity {
            let retained = tick_interval.saturating_mul(history_capacity as u32);
            correct(
                "history_duration_secs",
                history_duration.as_secs().to_string(),
                retained.as_secs().to_string(),
            );
        }

        let requested = Duration::from_millis(config.stop_timeout_ms);
        let stop_timeout = requested.max(MIN_STOP_TIMEOUT);
        if stop_timeout != requested {
            correct("stop_timeout_ms", ms(requested), ms(stop_timeout));
        }

        let (low, high) = TOP_PROCESS_RANGE;
        let top_process_count = config.top_process_count.clamp(low, high);
        if top_process_count != config.top_process_count {
            correct(
                "top_process_count",
                config.top_process_count.to_string(),
                top_process_count.to_string(),
            );
        }

        let subscriber_capacity = config.subscriber_queue_capacity.max(1);
        if subscriber_capacity != config.subscriber_queue_capacity {
            correct(
                "subscriber_queue_capacity",
                config.subscriber_queue_capacity.to_string(),
                subscriber_capacity.to_string(),
            );
        }

        let settings = CollectionSettings {
            tick_interval,
            collection_timeout,
            stop_timeout,
            history_capacity,
            top_process_count,
            subscriber_capacity,
            sources: config.sources,
        };
        (settings, corrections)
    }
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self::from_config(&MonitoringConfig::default()).0
    }
}

/// Number of ticks needed to cover `retention`, at least one.
pub fn history_capacity(retention: Duration, tick_interval: Duration) -> usize {
    let tick = tick_interval.as_millis().max(1);
    usize::try_from(retention.as_millis().div_ceil(tick))
        .unwrap_or(usize::MAX)
        .max(1)
}

fn ms(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sysvitals").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

/// Falls back to defaults when the file is missing or malformed.
pub fn load_config_from_path(path: &Path) -> Config {
    match try_load_config_from_path(path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(%err, "using default configuration");
            Config::default()
        }
    }
}

pub fn try_load_config_from_path(path: &Path) -> Result<Config, VitalsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| VitalsError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| VitalsError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
