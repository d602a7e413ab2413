// structure.rs — Project structure: directory policies with parent links.
//
// A directory policy names what may be created inside one directory. Parents
// are plain string keys resolved by lookup, never pointers:
//
// - an explicit `parent` names another declared directory;
// - without one, the parent is the nearest declared path ancestor
//   (`backend/shared` inherits from `backend` when `backend` is declared);
// - the root policy (empty path) has no implicit parent.
//
// Inheritance is applied at lookup time by the resolver, so editing a parent
// changes every descendant without redeclaring it. Loading only validates:
// parents exist, chains are acyclic and bounded, component kinds exist in the
// registry, scaffold globs compile.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use glob::{MatchOptions, Pattern};
use serde::Serialize;

use crate::error::{ConfigDomain, ConfigError, ValidationErrors, Violation};
use crate::path;
use crate::registry::ComponentRegistry;
use crate::source::DirectorySpec;

/// Longest parent chain (including the policy itself) accepted at load.
pub const MAX_INHERITANCE_DEPTH: usize = 32;

/// Scaffold patterns only cross `/` when they say so (`**`).
const SCAFFOLD_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled "requires-scaffold" glob, matched relative to the directory
/// that declared it.
#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldRule {
    pub pattern: String,
    pub declared_in: String,
    #[serde(skip)]
    compiled: Pattern,
}

impl ScaffoldRule {
    fn compile(pattern: &str, declared_in: &str) -> Result<Self, glob::PatternError> {
        Ok(Self {
            pattern: pattern.to_string(),
            declared_in: declared_in.to_string(),
            compiled: Pattern::new(pattern)?,
        })
    }

    /// Whether a normalized project path falls under this rule.
    pub fn matches(&self, path: &str) -> bool {
        path::relative_to(path, &self.declared_in)
            .is_some_and(|rel| self.compiled.matches_with(rel, SCAFFOLD_MATCH))
    }
}

impl PartialEq for ScaffoldRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.declared_in == other.declared_in
    }
}

impl Eq for ScaffoldRule {}

/// Policy for one declared directory, as written (no inheritance applied).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DirectoryPolicy {
    pub path: String,
    /// Explicit parent key, normalized.
    pub parent: Option<String>,
    /// `None` inherits; `Some(empty)` means "no restriction" at this level.
    pub allowed_component_kinds: Option<BTreeSet<String>>,
    /// Lowercase, without the leading dot. `None` inherits.
    pub allowed_extensions: Option<BTreeSet<String>>,
    pub requires_scaffold: Vec<ScaffoldRule>,
}

/// Path → directory policy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectStructure {
    policies: BTreeMap<String, DirectoryPolicy>,
    /// Declared absolute project root, normalized. Absolute resolver inputs
    /// must lie beneath it.
    root: Option<String>,
}

impl ProjectStructure {
    /// Validate and build a structure against a loaded registry.
    pub fn load(
        specs: Vec<DirectorySpec>,
        registry: &ComponentRegistry,
    ) -> Result<Self, ConfigError> {
        Self::load_against(specs, |kind| registry.contains(kind))
    }

    /// Validate and build a structure, cross-checking component kinds with
    /// `is_known_kind`. Used directly when the registry itself failed to load
    /// and only its declared ids are available.
    pub(crate) fn load_against<F>(specs: Vec<DirectorySpec>, is_known_kind: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> bool,
    {
        let mut violations = Vec::new();
        let mut policies: BTreeMap<String, DirectoryPolicy> = BTreeMap::new();

        for spec in specs {
            let path = match path::normalize(&spec.path) {
                Ok(p) => p,
                Err(reason) => {
                    violations.push(Violation::InvalidDirectoryPath {
                        path: spec.path,
                        reason,
                    });
                    continue;
                }
            };

            let parent = match spec.parent.as_deref().map(path::normalize).transpose() {
                Ok(p) => p,
                Err(reason) => {
                    violations.push(Violation::InvalidDirectoryPath {
                        path: path.clone(),
                        reason: format!("parent {}", reason),
                    });
                    None
                }
            };

            let allowed_component_kinds = spec.allowed_component_kinds.map(|kinds| {
                kinds
                    .into_iter()
                    .filter(|kind| {
                        let known = is_known_kind(kind.as_str());
                        if !known {
                            violations.push(Violation::UnknownComponentKind {
                                path: path.clone(),
                                kind: kind.clone(),
                            });
                        }
                        known
                    })
                    .collect::<BTreeSet<_>>()
            });

            let allowed_extensions = spec.allowed_extensions.map(|exts| {
                exts.iter()
                    .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect::<BTreeSet<_>>()
            });

            let mut requires_scaffold = Vec::new();
            for pattern in &spec.requires_scaffold {
                match ScaffoldRule::compile(pattern, &path) {
                    Ok(rule) => requires_scaffold.push(rule),
                    Err(e) => violations.push(Violation::InvalidGlob {
                        path: path.clone(),
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    }),
                }
            }

            if policies.contains_key(&path) {
                violations.push(Violation::DuplicateDirectory { path });
                continue;
            }
            policies.insert(
                path.clone(),
                DirectoryPolicy {
                    path,
                    parent,
                    allowed_component_kinds,
                    allowed_extensions,
                    requires_scaffold,
                },
            );
        }

        for policy in policies.values() {
            if let Some(parent) = &policy.parent {
                if !policies.contains_key(parent) {
                    violations.push(Violation::UnknownParent {
                        path: policy.path.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        violations.extend(check_chains(&policies));

        if !violations.is_empty() {
            return Err(ValidationErrors::new(ConfigDomain::Structure, violations).into());
        }

        tracing::debug!(count = policies.len(), "project structure loaded");
        Ok(Self {
            policies,
            root: None,
        })
    }

    /// Declare the absolute project root used to accept absolute inputs.
    pub fn with_root(self, root: &str) -> Result<Self, ConfigError> {
        let root = normalize_root(root)
            .map_err(|v| ValidationErrors::new(ConfigDomain::Structure, vec![v]))?;
        Ok(self.with_normalized_root(Some(root)))
    }

    /// Set a root already checked by `normalize_root`.
    pub(crate) fn with_normalized_root(mut self, root: Option<String>) -> Self {
        self.root = root;
        self
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn get(&self, path: &str) -> Option<&DirectoryPolicy> {
        self.policies.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.policies.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policies in path order.
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryPolicy> {
        self.policies.values()
    }

    /// The policy this one inherits from, explicit or implicit.
    pub fn parent_of(&self, policy: &DirectoryPolicy) -> Option<&DirectoryPolicy> {
        parent_key(&self.policies, policy).and_then(|key| self.policies.get(key))
    }

    /// `policy` followed by each policy it inherits from, nearest first.
    ///
    /// Bounded by `MAX_INHERITANCE_DEPTH`, which load guarantees is never hit.
    pub fn chain<'a>(&'a self, policy: &'a DirectoryPolicy) -> Vec<&'a DirectoryPolicy> {
        let mut chain = vec![policy];
        let mut current = policy;
        while let Some(parent) = self.parent_of(current) {
            if chain.len() >= MAX_INHERITANCE_DEPTH {
                debug_assert!(false, "inheritance chain exceeded the load-time bound");
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }
}

/// Check and normalize a declared project root. It must be absolute and
/// must not climb above the filesystem root.
pub fn normalize_root(root: &str) -> Result<String, Violation> {
    let invalid = |reason: String| Violation::InvalidRoot {
        root: root.to_string(),
        reason,
    };
    if !path::is_absolute(root) {
        return Err(invalid("must be an absolute path".to_string()));
    }
    path::normalize(root).map_err(invalid)
}

/// Key of the policy `policy` inherits from, whether or not it is declared.
fn parent_key<'a>(
    policies: &'a BTreeMap<String, DirectoryPolicy>,
    policy: &'a DirectoryPolicy,
) -> Option<&'a str> {
    if let Some(explicit) = &policy.parent {
        return Some(explicit.as_str());
    }
    path::ancestors(&policy.path)
        .skip(1)
        .find(|candidate| policies.contains_key(*candidate))
}

/// Walk every chain with a visited set. Each cycle is reported once, as the
/// loop it forms; chains longer than the bound are reported per origin.
fn check_chains(policies: &BTreeMap<String, DirectoryPolicy>) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut reported_cycles: HashSet<BTreeSet<String>> = HashSet::new();

    for policy in policies.values() {
        let mut visited: Vec<&str> = vec![policy.path.as_str()];
        let mut current = policy;

        while let Some(key) = parent_key(policies, current) {
            if let Some(start) = visited.iter().position(|seen| *seen == key) {
                let mut chain: Vec<String> =
                    visited[start..].iter().map(|s| s.to_string()).collect();
                chain.push(key.to_string());
                let members: BTreeSet<String> = chain.iter().cloned().collect();
                if reported_cycles.insert(members) {
                    violations.push(Violation::CyclicParent { chain });
                }
                break;
            }
            let Some(next) = policies.get(key) else {
                // Unknown parent, reported separately.
                break;
            };
            visited.push(key);
            if visited.len() > MAX_INHERITANCE_DEPTH {
                violations.push(Violation::ChainTooDeep {
                    path: policy.path.clone(),
                    max: MAX_INHERITANCE_DEPTH,
                });
                break;
            }
            current = next;
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ComponentSpec;

    fn registry(kinds: &[&str]) -> ComponentRegistry {
        ComponentRegistry::load(
            kinds
                .iter()
                .map(|k| ComponentSpec {
                    id: k.to_string(),
                    description: String::new(),
                    template: format!("templates/{}.j2", k),
                    generates_test: false,
                })
                .collect(),
        )
        .unwrap()
    }

    fn dir(path: &str) -> DirectorySpec {
        DirectorySpec {
            path: path.to_string(),
            ..Default::default()
        }
    }

    fn with_parent(path: &str, parent: &str) -> DirectorySpec {
        DirectorySpec {
            parent: Some(parent.to_string()),
            ..dir(path)
        }
    }

    #[test]
    fn load_normalizes_paths_and_extensions() {
        let structure = ProjectStructure::load(
            vec![
                DirectorySpec {
                    allowed_extensions: Some(vec![".PY".to_string(), "pyi".to_string()]),
                    ..dir("/backend/")
                },
                with_parent("./backend/shared", "backend/"),
            ],
            &registry(&[]),
        )
        .unwrap();

        let backend = structure.get("backend").unwrap();
        let exts: Vec<&str> = backend
            .allowed_extensions
            .as_ref()
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(exts, vec!["py", "pyi"]);
        assert_eq!(
            structure.get("backend/shared").unwrap().parent.as_deref(),
            Some("backend")
        );
    }

    #[test]
    fn implicit_parent_is_nearest_declared_ancestor() {
        let structure = ProjectStructure::load(
            vec![dir(""), dir("backend"), dir("backend/a/b")],
            &registry(&[]),
        )
        .unwrap();

        let leaf = structure.get("backend/a/b").unwrap();
        let chain: Vec<&str> = structure.chain(leaf).iter().map(|p| p.path.as_str()).collect();
        assert_eq!(chain, vec!["backend/a/b", "backend", ""]);
        assert!(structure.parent_of(structure.get("").unwrap()).is_none());
    }

    #[test]
    fn explicit_parent_overrides_path_ancestry() {
        let structure = ProjectStructure::load(
            vec![dir("backend"), dir("shared"), with_parent("backend/models", "shared")],
            &registry(&[]),
        )
        .unwrap();

        let models = structure.get("backend/models").unwrap();
        assert_eq!(structure.parent_of(models).unwrap().path, "shared");
    }

    #[test]
    fn unknown_component_kinds_are_all_reported() {
        let err = ProjectStructure::load(
            vec![
                DirectorySpec {
                    allowed_component_kinds: Some(vec!["dto".to_string(), "widget".to_string()]),
                    ..dir("backend")
                },
                DirectorySpec {
                    allowed_component_kinds: Some(vec!["gadget".to_string()]),
                    ..dir("frontend")
                },
            ],
            &registry(&["dto"]),
        )
        .unwrap_err();

        let violations = err.violations();
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&Violation::UnknownComponentKind {
            path: "backend".to_string(),
            kind: "widget".to_string(),
        }));
        assert!(violations.contains(&Violation::UnknownComponentKind {
            path: "frontend".to_string(),
            kind: "gadget".to_string(),
        }));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let err = ProjectStructure::load(vec![with_parent("backend", "server")], &registry(&[]))
            .unwrap_err();
        assert_eq!(
            err.violations(),
            &[Violation::UnknownParent {
                path: "backend".to_string(),
                parent: "server".to_string(),
            }]
        );
    }

    #[test]
    fn two_node_cycle_is_reported_once() {
        let err = ProjectStructure::load(
            vec![with_parent("a", "b"), with_parent("b", "a")],
            &registry(&[]),
        )
        .unwrap_err();

        let cycles: Vec<&Violation> = err
            .violations()
            .iter()
            .filter(|v| matches!(v, Violation::CyclicParent { .. }))
            .collect();
        assert_eq!(cycles.len(), 1);
        match cycles[0] {
            Violation::CyclicParent { chain } => {
                assert_eq!(chain.first(), chain.last());
                assert!(chain.contains(&"a".to_string()));
                assert!(chain.contains(&"b".to_string()));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let err = ProjectStructure::load(vec![with_parent("a", "a")], &registry(&[])).unwrap_err();
        assert_eq!(
            err.violations(),
            &[Violation::CyclicParent {
                chain: vec!["a".to_string(), "a".to_string()],
            }]
        );
    }

    #[test]
    fn cycle_through_implicit_parent_is_detected() {
        // a/x inherits from a by path; a names a/x explicitly.
        let err = ProjectStructure::load(vec![with_parent("a", "a/x"), dir("a/x")], &registry(&[]))
            .unwrap_err();
        assert!(err
            .violations()
            .iter()
            .any(|v| matches!(v, Violation::CyclicParent { .. })));
    }

    #[test]
    fn overly_deep_chain_is_rejected() {
        let mut specs = vec![dir("d0")];
        for i in 1..=MAX_INHERITANCE_DEPTH {
            specs.push(with_parent(&format!("d{}", i), &format!("d{}", i - 1)));
        }
        let err = ProjectStructure::load(specs, &registry(&[])).unwrap_err();
        assert!(err.violations().iter().any(|v| matches!(
            v,
            Violation::ChainTooDeep { path, .. } if path == &format!("d{}", MAX_INHERITANCE_DEPTH)
        )));
    }

    #[test]
    fn chain_at_the_bound_is_accepted() {
        let mut specs = vec![dir("d0")];
        for i in 1..MAX_INHERITANCE_DEPTH {
            specs.push(with_parent(&format!("d{}", i), &format!("d{}", i - 1)));
        }
        let structure = ProjectStructure::load(specs, &registry(&[])).unwrap();
        let leaf = structure.get(&format!("d{}", MAX_INHERITANCE_DEPTH - 1)).unwrap();
        assert_eq!(structure.chain(leaf).len(), MAX_INHERITANCE_DEPTH);
    }

    #[test]
    fn invalid_glob_is_rejected_at_load() {
        let err = ProjectStructure::load(
            vec![DirectorySpec {
                requires_scaffold: vec!["*.py".to_string(), "[unclosed".to_string()],
                ..dir("backend")
            }],
            &registry(&[]),
        )
        .unwrap_err();

        match &err.violations()[0] {
            Violation::InvalidGlob { path, pattern, .. } => {
                assert_eq!(path, "backend");
                assert_eq!(pattern, "[unclosed");
            }
            other => panic!("expected InvalidGlob, got {:?}", other),
        }
    }

    #[test]
    fn escaping_path_and_duplicates_are_rejected() {
        let err = ProjectStructure::load(
            vec![dir("../outside"), dir("backend"), dir("backend/")],
            &registry(&[]),
        )
        .unwrap_err();

        let violations = err.violations();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::InvalidDirectoryPath { path, .. } if path == "../outside")));
        assert!(violations.contains(&Violation::DuplicateDirectory {
            path: "backend".to_string()
        }));
    }

    #[test]
    fn scaffold_rule_matches_relative_to_declaring_directory() {
        let rule = ScaffoldRule::compile("*_worker.py", "backend/workers").unwrap();
        assert!(rule.matches("backend/workers/email_worker.py"));
        assert!(!rule.matches("backend/workers/nested/email_worker.py"));
        assert!(!rule.matches("frontend/email_worker.py"));

        let deep = ScaffoldRule::compile("**/*_dto.py", "backend").unwrap();
        assert!(deep.matches("backend/shared/user_dto.py"));
        assert!(deep.matches("backend/user_dto.py"));
    }

    #[test]
    fn root_must_be_absolute_and_stay_in_bounds() {
        let empty = || ProjectStructure::load(vec![], &registry(&[])).unwrap();

        let ok = empty().with_root("/srv/app/").unwrap();
        assert_eq!(ok.root(), Some("srv/app"));

        let escaping = empty().with_root("/../srv").unwrap_err();
        assert!(matches!(
            escaping.violations(),
            [Violation::InvalidRoot { root, .. }] if root == "/../srv"
        ));

        let relative = empty().with_root("srv/app").unwrap_err();
        assert!(matches!(relative.violations(), [Violation::InvalidRoot { .. }]));
    }

    #[test]
    fn kind_check_can_use_declared_ids_only() {
        let err = ProjectStructure::load_against(
            vec![DirectorySpec {
                path: "backend".to_string(),
                allowed_component_kinds: Some(vec!["dto".to_string(), "widget".to_string()]),
                ..Default::default()
            }],
            |kind| kind == "dto",
        )
        .unwrap_err();
        assert_eq!(
            err.violations(),
            &[Violation::UnknownComponentKind {
                path: "backend".to_string(),
                kind: "widget".to_string(),
            }]
        );
    }
}
