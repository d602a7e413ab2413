// error.rs — Errors raised while reading configuration from disk.

use std::path::PathBuf;

use dg_policy::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// A source is missing or the loaded configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A YAML configuration file is malformed.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// `devgate.toml` is malformed.
    #[error("invalid settings in {path}: {source}")]
    Settings {
        path: PathBuf,
        source: toml::de::Error,
    },
}
