// loader.rs — Read the YAML sources and build a validated snapshot.
//
// Each of the four files is required. A missing file is reported as
// `ConfigError::NotFound` naming it; a malformed one as `LoaderError::Parse`
// naming the path. Validation itself is left to dg-policy, which reports
// every violation across all domains at once.

use std::path::Path;
use std::sync::Arc;

use dg_policy::{AuditTrail, ConfigError, ConfigSources, PolicyEngine, PolicySnapshot};
use serde::de::DeserializeOwned;

use crate::error::LoaderError;
use crate::layout::ConfigLayout;
use crate::phases::PhaseFile;
use crate::settings::DevgateSettings;

/// A project directory with its settings resolved.
#[derive(Debug, Clone)]
pub struct Project {
    pub settings: DevgateSettings,
    pub layout: ConfigLayout,
}

impl Project {
    /// Read `devgate.toml` (if any) and lay out the config paths.
    pub fn open(project_root: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let root = project_root.as_ref();
        let settings = DevgateSettings::for_project(root)?;
        let layout = ConfigLayout::with_settings(root, &settings);
        Ok(Self { settings, layout })
    }

    pub fn load_snapshot(&self) -> Result<PolicySnapshot, LoaderError> {
        load_snapshot(&self.layout, &self.settings)
    }

    /// An engine over a freshly loaded snapshot, with the audit capacity
    /// from settings.
    pub fn engine(&self) -> Result<PolicyEngine, LoaderError> {
        let snapshot = Arc::new(self.load_snapshot()?);
        let audit = Arc::new(AuditTrail::with_capacity(self.settings.audit.capacity));
        Ok(PolicyEngine::with_audit(snapshot, audit))
    }
}

/// Parse the component, structure and operation files.
///
/// The declared root is `[structure] root` when set, otherwise the project
/// directory itself when it is absolute. Without either, absolute inputs are
/// rejected by the resolver.
pub fn load_sources(
    layout: &ConfigLayout,
    settings: &DevgateSettings,
) -> Result<ConfigSources, LoaderError> {
    Ok(ConfigSources {
        components: read_yaml(&layout.components)?,
        directories: read_yaml(&layout.structure)?,
        operations: read_yaml(&layout.operations)?,
        root: settings.structure.root.clone().or_else(|| default_root(layout)),
    })
}

fn default_root(layout: &ConfigLayout) -> Option<String> {
    let root = &layout.project_root;
    root.is_absolute().then(|| root.to_string_lossy().into_owned())
}

/// Load every file and validate the result as one snapshot.
pub fn load_snapshot(
    layout: &ConfigLayout,
    settings: &DevgateSettings,
) -> Result<PolicySnapshot, LoaderError> {
    let phases: PhaseFile = read_yaml(&layout.phases)?;
    let sources = load_sources(layout, settings)?;
    let snapshot = PolicySnapshot::load(sources, &phases)?;
    tracing::info!(
        project = %layout.project_root.display(),
        snapshot_id = %snapshot.snapshot_id,
        "configuration loaded"
    );
    Ok(snapshot)
}

/// Read one YAML file. An empty file reads as the type's default (an empty
/// list for every config file).
fn read_yaml<T>(path: &Path) -> Result<T, LoaderError>
where
    T: DeserializeOwned + Default,
{
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                source_name: path.display().to_string(),
            }
            .into());
        }
        Err(source) => {
            return Err(LoaderError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&content).map_err(|source| LoaderError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
