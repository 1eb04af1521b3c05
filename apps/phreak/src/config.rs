//! # Configuration
//!
//! Optional `phreak.toml`:
//!
//! ```toml
//! [network]
//! path = "network.toml"
//!
//! [script]
//! path = "facts.toml"
//!
//! [output]
//! json = false
//! ```
//!
//! Relative paths are resolved against the directory holding the config
//! file. Command-line flags override every value.

use crate::error::AppError;
use crate::files::read_limited;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "phreak.toml";

/// Maximum size of a config file (1 MB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub network: PathSection,
    pub script: PathSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub json: bool,
}

impl Config {
    /// Read a config file, resolving its paths against its directory.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let (_, content) = read_limited(path, MAX_CONFIG_FILE_SIZE)?;
        let mut config: Self = toml::from_str(&content).map_err(|source| AppError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or(Path::new("."));
        for section in [&mut config.network, &mut config.script] {
            if let Some(relative) = section.path.take() {
                section.path = Some(if relative.is_absolute() {
                    relative
                } else {
                    base.join(relative)
                });
            }
        }
        tracing::debug!(config = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `explicit` if given, else `phreak.toml` in `dir` if it exists,
    /// else the empty config.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, AppError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let candidate = dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::load(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Inputs of one invocation after merging flags over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub network: PathBuf,
    pub script: Option<PathBuf>,
    pub json: bool,
}

impl Settings {
    pub fn resolve(
        network: Option<PathBuf>,
        script: Option<PathBuf>,
        json: bool,
        config: Config,
    ) -> Result<Self, AppError> {
        let network = network
            .or(config.network.path)
            .ok_or(AppError::MissingNetwork)?;
        Ok(Self {
            network,
            script: script.or(config.script.path),
            json: json || config.output.json,
        })
    }
}
