// source.rs — Raw, already-parsed configuration records.
//
// These are what a config loader hands to the core: plain serde structs
// with no validation applied. `ComponentRegistry::load`,
// `ProjectStructure::load` and `OperationPolicySet::load` turn them into
// validated, immutable snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One creatable component kind as declared in `components.yaml`.
///
/// ```yaml
/// - id: dto
///   description: "Data transfer object"
///   template: templates/dto.py.j2
///   generates_test: true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Opaque reference handed to the scaffolding collaborator.
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub generates_test: bool,
}

/// One directory policy as declared in `structure.yaml`.
///
/// ```yaml
/// - path: backend/workers
///   parent: backend
///   allowed_component_kinds: [worker]
///   allowed_extensions: [py]
///   requires_scaffold: ["*_worker.py"]
/// ```
///
/// Absent `allowed_*` fields inherit from the parent chain; an explicit
/// empty list does not.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectorySpec {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_component_kinds: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_extensions: Option<Vec<String>>,
    #[serde(default)]
    pub requires_scaffold: Vec<String>,
}

/// A single operation-specific setting value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
}

/// One operation as declared in `operations.yaml`.
///
/// ```yaml
/// - id: scaffold
///   description: "Generate a component from its template"
///   allowed_phases: [design, tdd]
///   settings:
///     requires_component_kind: true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Empty means "allowed in every phase".
    #[serde(default)]
    pub allowed_phases: Vec<String>,
    #[serde(default)]
    pub settings: BTreeMap<String, SettingValue>,
}
