// settings.rs — devgate.toml, the optional per-project settings file.
//
// Every field has a default, so a missing file and an empty file behave the
// same. A present but malformed file is an error, never silently ignored.

use std::path::{Path, PathBuf};

use dg_policy::DEFAULT_AUDIT_CAPACITY;
use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// Settings file name, looked up in the project root.
pub const SETTINGS_FILE: &str = "devgate.toml";

/// Top-level settings from `devgate.toml`.
///
/// ```toml
/// config_dir = ".devgate"
///
/// [audit]
/// capacity = 10000
/// log = ".devgate/audit.jsonl"
///
/// [structure]
/// root = "/srv/app"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevgateSettings {
    /// Directory holding the YAML files, relative to the project root.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    #[serde(default)]
    pub audit: AuditSettings,

    #[serde(default)]
    pub structure: StructureSettings,
}

impl Default for DevgateSettings {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            audit: AuditSettings::default(),
            structure: StructureSettings::default(),
        }
    }
}

/// Audit trail retention and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Entries kept in memory. 0 keeps everything.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Hash-chained JSONL export target, relative to the project root.
    #[serde(default = "default_audit_log")]
    pub log: PathBuf,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            log: default_audit_log(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureSettings {
    /// Absolute project root. When set, absolute paths under it are
    /// accepted by the resolver.
    #[serde(default)]
    pub root: Option<String>,
}

fn default_config_dir() -> PathBuf {
    PathBuf::from(".devgate")
}

fn default_capacity() -> usize {
    DEFAULT_AUDIT_CAPACITY
}

fn default_audit_log() -> PathBuf {
    PathBuf::from(".devgate/audit.jsonl")
}

impl DevgateSettings {
    /// Parse a settings file.
    pub fn load(path: &Path) -> Result<Self, LoaderError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| LoaderError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Settings for a project: `devgate.toml` if present, defaults otherwise.
    pub fn for_project(project_root: &Path) -> Result<Self, LoaderError> {
        let path = project_root.join(SETTINGS_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }
}
