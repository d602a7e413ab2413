// layout.rs — Where a project's configuration files live.
//
// `for_project()` gives the standard `.devgate/` layout. `with_settings()`
// honors the overrides in devgate.toml.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::settings::DevgateSettings;

/// Paths to every configuration file of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigLayout {
    /// Root directory of the project.
    pub project_root: PathBuf,

    /// Component kinds (`components.yaml`).
    pub components: PathBuf,

    /// Directory policies (`structure.yaml`).
    pub structure: PathBuf,

    /// Operation policies (`operations.yaml`).
    pub operations: PathBuf,

    /// Phase vocabulary (`phases.yaml`).
    pub phases: PathBuf,

    /// Audit export target.
    pub audit_log: PathBuf,
}

impl ConfigLayout {
    /// Standard `.devgate/` layout for a project.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        Self::with_settings(project_root, &DevgateSettings::default())
    }

    /// Layout with the config directory and audit log taken from settings.
    /// Relative setting paths are joined onto the project root.
    pub fn with_settings(project_root: impl AsRef<Path>, settings: &DevgateSettings) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let config_dir = root.join(&settings.config_dir);
        Self {
            components: config_dir.join("components.yaml"),
            structure: config_dir.join("structure.yaml"),
            operations: config_dir.join("operations.yaml"),
            phases: config_dir.join("phases.yaml"),
            audit_log: root.join(&settings.audit.log),
            project_root: root,
        }
    }
}
