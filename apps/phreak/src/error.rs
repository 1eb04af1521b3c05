//! # Application Errors

use phreak_core::PhreakError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a `phreak` invocation.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] PhreakError),

    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file '{path}' is {size} bytes, the limit is {max}")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("cannot parse TOML in '{path}': {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot parse JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no network definition given (use --network or [network] path in phreak.toml)")]
    MissingNetwork,

    #[error("command needs a script (use --script or [script] path in phreak.toml)")]
    MissingScript,

    #[error("cannot encode report: {0}")]
    Encode(#[from] serde_json::Error),
}
