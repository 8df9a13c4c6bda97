use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::error::VitalsError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Builds the filter from `RUST_LOG` when set, otherwise from `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber, writing to stderr so stdout stays free
/// for snapshot output. Span close events carry per-tick timings.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<(), VitalsError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_ansi(false).try_init(),
    };
    result.map_err(|e| VitalsError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_level_falls_back_to_info() {
        let filter = env_filter("definitely not a level [[[");
        // either RUST_LOG from the environment or the info fallback
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn second_install_reports_error() {
        let _ = init_tracing("warn", LogFormat::Pretty);
        assert!(matches!(
            init_tracing("warn", LogFormat::Json),
            Err(VitalsError::Logging(_))
        ));
    }
}
