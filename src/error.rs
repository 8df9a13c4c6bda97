use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VitalsError {
    /// `start` needs an ambient Tokio runtime to spawn the driver task on.
    #[error("collection must be started from within a Tokio runtime")]
    NoRuntime,

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}
