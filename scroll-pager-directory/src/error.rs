use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = DirectoryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to fetch users: {0}")]
    Http(#[from] reqwest::Error),
    /// The user API answered with a non-2xx status.
    #[error("Failed to fetch users")]
    Status { status: reqwest::StatusCode },
    #[error("invalid user payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid API url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}
