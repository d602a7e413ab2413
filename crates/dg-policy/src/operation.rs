// operation.rs — Operation policies and the phase vocabulary seam.
//
// An operation ("scaffold", "create_file", "commit") is allowed in a set of
// workflow phases. The empty set is a sentinel meaning every phase, including
// phases the vocabulary has never heard of. Phase names referenced by a
// non-empty set are checked against the vocabulary once, at load.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::error::{ConfigDomain, ConfigError, ValidationErrors, Violation};
use crate::source::{OperationSpec, SettingValue};

/// Settings the engine itself consults. Other keys pass through untouched.
pub mod settings {
    /// Context must carry a `component_kind`.
    pub const REQUIRES_COMPONENT_KIND: &str = "requires_component_kind";
    /// The path's extension must be in the effective allowed set.
    pub const ENFORCE_EXTENSIONS: &str = "enforce_extensions";
    /// Paths covered by a requires-scaffold pattern are denied.
    pub const ENFORCE_SCAFFOLD: &str = "enforce_scaffold";
}

/// Supplies the set of valid phase names. Consulted once per load.
pub trait PhaseVocabulary {
    fn contains_phase(&self, phase: &str) -> bool;
}

impl<S: AsRef<str>> PhaseVocabulary for [S] {
    fn contains_phase(&self, phase: &str) -> bool {
        self.iter().any(|p| p.as_ref() == phase)
    }
}

impl<S: AsRef<str>> PhaseVocabulary for Vec<S> {
    fn contains_phase(&self, phase: &str) -> bool {
        self.as_slice().contains_phase(phase)
    }
}

impl PhaseVocabulary for BTreeSet<String> {
    fn contains_phase(&self, phase: &str) -> bool {
        self.contains(phase)
    }
}

impl PhaseVocabulary for HashSet<String> {
    fn contains_phase(&self, phase: &str) -> bool {
        self.contains(phase)
    }
}

/// One gated operation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OperationPolicy {
    pub id: String,
    pub description: String,
    /// Empty means every phase.
    pub allowed_phases: BTreeSet<String>,
    pub settings: BTreeMap<String, SettingValue>,
}

impl OperationPolicy {
    pub fn is_phase_allowed(&self, phase: &str) -> bool {
        self.allowed_phases.is_empty() || self.allowed_phases.contains(phase)
    }

    /// A boolean setting; absent or textual values read as `false`.
    pub fn setting_bool(&self, key: &str) -> bool {
        matches!(self.settings.get(key), Some(SettingValue::Bool(true)))
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        match self.settings.get(key) {
            Some(SettingValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// `{design, tdd}` style rendering for reasons.
    pub fn describe_phases(&self) -> String {
        if self.allowed_phases.is_empty() {
            return "all phases".to_string();
        }
        let phases: Vec<&str> = self.allowed_phases.iter().map(String::as_str).collect();
        format!("{{{}}}", phases.join(", "))
    }
}

/// Operation id → policy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationPolicySet {
    operations: BTreeMap<String, OperationPolicy>,
}

impl OperationPolicySet {
    /// Validate and build the set. Every undefined phase reference across
    /// every operation is collected before failing.
    pub fn load<V>(specs: Vec<OperationSpec>, phases: &V) -> Result<Self, ConfigError>
    where
        V: PhaseVocabulary + ?Sized,
    {
        let mut violations = Vec::new();
        let mut operations = BTreeMap::new();
        let mut duplicates = HashSet::new();

        for (index, spec) in specs.into_iter().enumerate() {
            if spec.id.trim().is_empty() {
                violations.push(Violation::EmptyOperationId { index });
                continue;
            }
            for phase in &spec.allowed_phases {
                if !phases.contains_phase(phase) {
                    violations.push(Violation::UnknownPhase {
                        operation: spec.id.clone(),
                        phase: phase.clone(),
                    });
                }
            }
            if operations.contains_key(&spec.id) {
                if duplicates.insert(spec.id.clone()) {
                    violations.push(Violation::DuplicateOperation { id: spec.id });
                }
                continue;
            }
            operations.insert(
                spec.id.clone(),
                OperationPolicy {
                    id: spec.id,
                    description: spec.description,
                    allowed_phases: spec.allowed_phases.into_iter().collect(),
                    settings: spec.settings,
                },
            );
        }

        if !violations.is_empty() {
            return Err(ValidationErrors::new(ConfigDomain::Operations, violations).into());
        }

        tracing::debug!(count = operations.len(), "operation policies loaded");
        Ok(Self { operations })
    }

    pub fn get(&self, operation: &str) -> Option<&OperationPolicy> {
        self.operations.get(operation)
    }

    /// True for an empty phase set; membership otherwise. Unknown operations
    /// are never allowed.
    pub fn is_phase_allowed(&self, operation: &str, phase: &str) -> bool {
        self.get(operation)
            .is_some_and(|policy| policy.is_phase_allowed(phase))
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationPolicy> {
        self.operations.values()
    }
}
