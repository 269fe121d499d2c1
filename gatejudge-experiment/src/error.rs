use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse experiment config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid experiment config: {0}")]
    Invalid(String),
}

/// Failure reported by the hosting collaborator
#[derive(Debug, Error)]
pub enum HostError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode session data: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("host rejected the request: {0}")]
    Rejected(String),
}
