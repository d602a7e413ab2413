// snapshot.rs — One loaded, internally consistent configuration.
//
// The three domains are loaded together and discarded together. Nothing in a
// snapshot is mutable after construction; reload builds a new one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigDomain, ConfigError, ValidationErrors};
use crate::operation::{OperationPolicySet, PhaseVocabulary};
use crate::registry::ComponentRegistry;
use crate::source::{ComponentSpec, DirectorySpec, OperationSpec};
use crate::structure::{normalize_root, ProjectStructure};

/// The raw records for all three domains, as handed over by a loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSources {
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub directories: Vec<DirectorySpec>,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
    /// Declared absolute project root, if absolute paths should be accepted.
    #[serde(default)]
    pub root: Option<String>,
}

/// Registry, structure, and operation policies loaded as one unit.
#[derive(Debug, Clone, Serialize)]
pub struct PolicySnapshot {
    pub snapshot_id: Uuid,
    pub loaded_at: DateTime<Utc>,
    pub registry: ComponentRegistry,
    pub structure: ProjectStructure,
    pub operations: OperationPolicySet,
}

impl PolicySnapshot {
    /// Load and cross-validate all three domains.
    ///
    /// Violations from every domain are reported together. When the registry
    /// itself is invalid, the structure is still checked in full; component
    /// kinds are then checked against the ids the registry declared.
    pub fn load<V>(sources: ConfigSources, phases: &V) -> Result<Self, ConfigError>
    where
        V: PhaseVocabulary + ?Sized,
    {
        let mut errors: Option<ValidationErrors> = None;

        let declared_kinds: BTreeSet<String> = sources
            .components
            .iter()
            .map(|c| c.id.clone())
            .filter(|id| !id.trim().is_empty())
            .collect();

        let root = match sources.root.as_deref().map(normalize_root).transpose() {
            Ok(root) => root,
            Err(violation) => {
                record(
                    &mut errors,
                    ValidationErrors::new(ConfigDomain::Structure, vec![violation]),
                );
                None
            }
        };

        let registry = absorb(ComponentRegistry::load(sources.components), &mut errors)?;
        let operations = absorb(OperationPolicySet::load(sources.operations, phases), &mut errors)?;
        let structure = match &registry {
            Some(registry) => ProjectStructure::load(sources.directories, registry),
            None => ProjectStructure::load_against(sources.directories, |kind| {
                declared_kinds.contains(kind)
            }),
        };
        let structure = absorb(structure, &mut errors)?;

        if let Some(errors) = errors {
            tracing::warn!(violations = errors.violations.len(), "configuration rejected");
            return Err(errors.into());
        }

        // All three are `Some` when no violation was recorded.
        let (Some(registry), Some(structure), Some(operations)) = (registry, structure, operations)
        else {
            unreachable!("a domain failed without recording a violation");
        };

        Ok(Self::from_parts(
            registry,
            structure.with_normalized_root(root),
            operations,
        ))
    }

    /// Bundle already-validated parts.
    pub fn from_parts(
        registry: ComponentRegistry,
        structure: ProjectStructure,
        operations: OperationPolicySet,
    ) -> Self {
        let snapshot = Self {
            snapshot_id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            registry,
            structure,
            operations,
        };
        tracing::info!(
            snapshot_id = %snapshot.snapshot_id,
            components = snapshot.registry.len(),
            directories = snapshot.structure.len(),
            operations = snapshot.operations.len(),
            "policy snapshot loaded"
        );
        snapshot
    }
}

/// Fold a domain's validation errors into the accumulator. Non-validation
/// errors abort immediately.
fn absorb<T>(
    result: Result<T, ConfigError>,
    errors: &mut Option<ValidationErrors>,
) -> Result<Option<T>, ConfigError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::Validation(found)) => {
            record(errors, found);
            Ok(None)
        }
        Err(other) => Err(other),
    }
}

fn record(errors: &mut Option<ValidationErrors>, found: ValidationErrors) {
    *errors = Some(match errors.take() {
        Some(existing) => existing.merge(found),
        None => found,
    });
}
