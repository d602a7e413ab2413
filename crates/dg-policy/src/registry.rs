// registry.rs — Component registry.
//
// The registry names every component kind that may be scaffolded. It is the
// leaf of the configuration graph: directory policies reference its keys,
// nothing references back. Definitions are pure data.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashSet;

use serde::Serialize;

use crate::error::{ConfigDomain, ConfigError, ValidationErrors, Violation};
use crate::source::ComponentSpec;

/// A creatable component kind.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComponentDefinition {
    pub id: String,
    pub description: String,
    /// Opaque template reference. Existence is the scaffolder's concern.
    pub template: String,
    pub generates_test: bool,
}

/// Identifier → definition. Immutable once loaded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComponentRegistry {
    components: BTreeMap<String, ComponentDefinition>,
}

impl ComponentRegistry {
    /// Validate and build a registry.
    ///
    /// Identifiers must be non-empty and unique (case-sensitive); template
    /// references must be non-empty. Every offending entry is reported.
    pub fn load(specs: Vec<ComponentSpec>) -> Result<Self, ConfigError> {
        let mut violations = Vec::new();
        let mut components = BTreeMap::new();
        let mut duplicates = HashSet::new();

        for (index, spec) in specs.into_iter().enumerate() {
            if spec.id.trim().is_empty() {
                violations.push(Violation::EmptyComponentId { index });
                continue;
            }
            if spec.template.trim().is_empty() {
                violations.push(Violation::EmptyTemplate {
                    id: spec.id.clone(),
                });
            }
            if components.contains_key(&spec.id) {
                // Report each duplicated id once, however many repeats.
                if duplicates.insert(spec.id.clone()) {
                    violations.push(Violation::DuplicateComponentId { id: spec.id });
                }
                continue;
            }
            components.insert(
                spec.id.clone(),
                ComponentDefinition {
                    id: spec.id,
                    description: spec.description,
                    template: spec.template,
                    generates_test: spec.generates_test,
                },
            );
        }

        if !violations.is_empty() {
            return Err(ValidationErrors::new(ConfigDomain::Components, violations).into());
        }

        tracing::debug!(count = components.len(), "component registry loaded");
        Ok(Self { components })
    }

    pub fn get(&self, id: &str) -> Option<&ComponentDefinition> {
        self.components.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Definitions in identifier order.
    pub fn iter(&self) -> btree_map::Values<'_, String, ComponentDefinition> {
        self.components.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(id: &str, template: &str) -> ComponentSpec {
        ComponentSpec {
            id: id.to_string(),
            description: format!("{} component", id),
            template: template.to_string(),
            generates_test: true,
        }
    }

    #[test]
    fn load_valid_registry() {
        let registry = ComponentRegistry::load(vec![
            component("dto", "templates/dto.j2"),
            component("worker", "templates/worker.j2"),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("dto"));
        assert!(!registry.contains("DTO"));
        assert_eq!(registry.get("worker").unwrap().template, "templates/worker.j2");
    }

    #[test]
    fn empty_source_is_an_empty_registry() {
        let registry = ComponentRegistry::load(vec![]).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn reports_all_violations_together() {
        let err = ComponentRegistry::load(vec![
            component("dto", "templates/dto.j2"),
            component("dto", "templates/other.j2"),
            component("", "templates/x.j2"),
            component("worker", "  "),
        ])
        .unwrap_err();

        let violations = err.violations();
        assert_eq!(violations.len(), 3);
        assert!(violations.contains(&Violation::DuplicateComponentId {
            id: "dto".to_string()
        }));
        assert!(violations.contains(&Violation::EmptyComponentId { index: 2 }));
        assert!(violations.contains(&Violation::EmptyTemplate {
            id: "worker".to_string()
        }));
    }

    #[test]
    fn identifiers_are_case_sensitive() {
        let registry = ComponentRegistry::load(vec![
            component("Service", "templates/a.j2"),
            component("service", "templates/b.j2"),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn triple_duplicate_is_reported_once() {
        let err = ComponentRegistry::load(vec![
            component("dto", "t"),
            component("dto", "t"),
            component("dto", "t"),
        ])
        .unwrap_err();
        assert_eq!(err.violations().len(), 1);
    }
}
