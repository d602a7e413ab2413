// resolver.rs — Directory policy resolution.
//
// Two phases:
//
// 1. Anchor search: normalize the input, then test the path itself and each
//    ancestor (longest first, root last) against the declared paths. The
//    first hit is the anchor.
// 2. Composition: walk the anchor's parent chain. Each optional field takes
//    the nearest explicitly set value. Scaffold rules are cumulative: the
//    anchor's rules, then each ancestor's, all of them apply.
//
// A path no policy covers resolves to the default policy (`is_default`),
// never to nothing. Inputs that escape the root are `PathOutOfScope`, and so
// is any absolute input when no project root is declared.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::PathOutOfScope;
use crate::path;
use crate::structure::{ProjectStructure, ScaffoldRule};

/// A fully inheritance-resolved policy for one path.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EffectivePolicy {
    /// The normalized input path.
    pub path: String,
    /// The declared directory the lookup landed on.
    pub anchor: Option<String>,
    /// Declared paths walked during composition, anchor first.
    pub chain: Vec<String>,
    /// Empty means no restriction on component kinds.
    pub allowed_component_kinds: BTreeSet<String>,
    /// Where `allowed_component_kinds` was explicitly declared.
    pub component_kinds_from: Option<String>,
    /// Empty means no restriction on extensions.
    pub allowed_extensions: BTreeSet<String>,
    pub extensions_from: Option<String>,
    pub requires_scaffold: Vec<ScaffoldRule>,
    /// True when no declared directory covers the path.
    pub is_default: bool,
}

impl EffectivePolicy {
    /// The policy for paths no declared directory covers: no anchor, nothing
    /// allowed. The engine denies on it.
    pub fn default_for(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            anchor: None,
            chain: Vec::new(),
            allowed_component_kinds: BTreeSet::new(),
            component_kinds_from: None,
            allowed_extensions: BTreeSet::new(),
            extensions_from: None,
            requires_scaffold: Vec::new(),
            is_default: true,
        }
    }

    /// An empty allowed set places no restriction.
    pub fn allows_component_kind(&self, kind: &str) -> bool {
        self.allowed_component_kinds.is_empty() || self.allowed_component_kinds.contains(kind)
    }

    /// Whether the resolved path's extension is acceptable. Paths without an
    /// extension pass only when the set is empty.
    pub fn allows_extension(&self) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }
        path::extension(&self.path).is_some_and(|ext| self.allowed_extensions.contains(&ext))
    }

    /// The first scaffold rule that covers the resolved path.
    pub fn scaffold_rule(&self) -> Option<&ScaffoldRule> {
        self.requires_scaffold.iter().find(|r| r.matches(&self.path))
    }
}

/// Resolve the effective policy for `raw_path`.
pub fn resolve(
    structure: &ProjectStructure,
    raw_path: &str,
) -> Result<EffectivePolicy, PathOutOfScope> {
    let normalized = normalize_input(structure, raw_path)?;

    let anchor = path::ancestors(&normalized).find_map(|candidate| structure.get(candidate));
    let Some(anchor) = anchor else {
        tracing::trace!(path = %normalized, "no directory policy covers path");
        return Ok(EffectivePolicy::default_for(normalized));
    };

    let mut effective = EffectivePolicy {
        anchor: Some(anchor.path.clone()),
        is_default: false,
        ..EffectivePolicy::default_for(normalized)
    };

    for level in structure.chain(anchor) {
        effective.chain.push(level.path.clone());

        if effective.component_kinds_from.is_none() {
            if let Some(kinds) = &level.allowed_component_kinds {
                effective.allowed_component_kinds = kinds.clone();
                effective.component_kinds_from = Some(level.path.clone());
            }
        }
        if effective.extensions_from.is_none() {
            if let Some(exts) = &level.allowed_extensions {
                effective.allowed_extensions = exts.clone();
                effective.extensions_from = Some(level.path.clone());
            }
        }
        for rule in &level.requires_scaffold {
            if !effective.requires_scaffold.contains(rule) {
                effective.requires_scaffold.push(rule.clone());
            }
        }
    }

    Ok(effective)
}

/// Normalize a caller path, honoring the structure's declared root.
fn normalize_input(
    structure: &ProjectStructure,
    raw_path: &str,
) -> Result<String, PathOutOfScope> {
    let out_of_scope = |reason: String| PathOutOfScope {
        path: raw_path.to_string(),
        reason,
    };

    let normalized = path::normalize(raw_path).map_err(out_of_scope)?;

    if !path::is_absolute(raw_path) {
        return Ok(normalized);
    }
    let Some(root) = structure.root() else {
        return Err(out_of_scope(
            "absolute path given but no project root is declared".to_string(),
        ));
    };
    path::relative_to(&normalized, root)
        .map(str::to_string)
        .or_else(|| (normalized == root).then(String::new))
        .ok_or_else(|| out_of_scope(format!("not under the project root '/{}'", root)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ComponentRegistry;
    use crate::source::{ComponentSpec, DirectorySpec};

    fn registry() -> ComponentRegistry {
        ComponentRegistry::load(
            ["dto", "worker", "service"]
                .iter()
                .map(|k| ComponentSpec {
                    id: k.to_string(),
                    description: String::new(),
                    template: format!("templates/{}.j2", k),
                    generates_test: true,
                })
                .collect(),
        )
        .unwrap()
    }

    fn kinds(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    fn structure(specs: Vec<DirectorySpec>) -> ProjectStructure {
        ProjectStructure::load(specs, &registry()).unwrap()
    }

    fn set(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn inherited_component_kinds_from_ancestor() {
        // backend allows [dto]; backend/shared declares nothing.
        let s = structure(vec![
            DirectorySpec {
                path: "backend".to_string(),
                allowed_component_kinds: kinds(&["dto"]),
                ..Default::default()
            },
            DirectorySpec {
                path: "backend/shared".to_string(),
                ..Default::default()
            },
        ]);

        let effective = resolve(&s, "backend/shared/foo.py").unwrap();
        assert_eq!(effective.anchor.as_deref(), Some("backend/shared"));
        assert_eq!(effective.allowed_component_kinds, set(&["dto"]));
        assert_eq!(effective.component_kinds_from.as_deref(), Some("backend"));
        assert_eq!(effective.chain, vec!["backend/shared", "backend"]);
    }

    #[test]
    fn child_value_overrides_parent() {
        let s = structure(vec![
            DirectorySpec {
                path: "backend".to_string(),
                allowed_component_kinds: kinds(&["dto", "service"]),
                allowed_extensions: Some(vec!["py".to_string()]),
                ..Default::default()
            },
            DirectorySpec {
                path: "backend/workers".to_string(),
                allowed_component_kinds: kinds(&["worker"]),
                ..Default::default()
            },
        ]);

        let effective = resolve(&s, "backend/workers/w.py").unwrap();
        assert_eq!(effective.allowed_component_kinds, set(&["worker"]));
        assert_eq!(effective.allowed_extensions, set(&["py"]));
        assert_eq!(effective.extensions_from.as_deref(), Some("backend"));
    }

    #[test]
    fn explicit_empty_set_stops_inheritance() {
        let s = structure(vec![
            DirectorySpec {
                path: "backend".to_string(),
                allowed_component_kinds: kinds(&["dto"]),
                ..Default::default()
            },
            DirectorySpec {
                path: "backend/scratch".to_string(),
                allowed_component_kinds: Some(vec![]),
                ..Default::default()
            },
        ]);

        let effective = resolve(&s, "backend/scratch/x.py").unwrap();
        assert!(effective.allowed_component_kinds.is_empty());
        assert_eq!(effective.component_kinds_from.as_deref(), Some("backend/scratch"));
        assert!(effective.allows_component_kind("worker"));
    }

    #[test]
    fn scaffold_patterns_are_cumulative() {
        let s = structure(vec![
            DirectorySpec {
                path: "backend".to_string(),
                requires_scaffold: vec!["**/*_dto.py".to_string()],
                ..Default::default()
            },
            DirectorySpec {
                path: "backend/workers".to_string(),
                requires_scaffold: vec!["*_worker.py".to_string()],
                ..Default::default()
            },
        ]);

        let effective = resolve(&s, "backend/workers/email_worker.py").unwrap();
        let patterns: Vec<&str> = effective
            .requires_scaffold
            .iter()
            .map(|r| r.pattern.as_str())
            .collect();
        assert_eq!(patterns, vec!["*_worker.py", "**/*_dto.py"]);
        assert_eq!(effective.scaffold_rule().unwrap().pattern, "*_worker.py");

        let dto = resolve(&s, "backend/workers/user_dto.py").unwrap();
        assert_eq!(dto.scaffold_rule().unwrap().declared_in, "backend");

        let plain = resolve(&s, "backend/workers/helpers.py").unwrap();
        assert!(plain.scaffold_rule().is_none());
    }

    #[test]
    fn anchor_is_longest_declared_prefix() {
        let s = structure(vec![
            DirectorySpec {
                path: "".to_string(),
                ..Default::default()
            },
            DirectorySpec {
                path: "backend".to_string(),
                ..Default::default()
            },
        ]);

        let anchor_of = |p: &str| resolve(&s, p).unwrap().anchor;
        assert_eq!(anchor_of("backend/a/b/c.py").as_deref(), Some("backend"));
        assert_eq!(anchor_of("docs/readme.md").as_deref(), Some(""));
        assert_eq!(anchor_of("backend").as_deref(), Some("backend"));
    }

    #[test]
    fn segment_boundaries_are_respected() {
        let s = structure(vec![DirectorySpec {
            path: "backend".to_string(),
            ..Default::default()
        }]);
        assert!(resolve(&s, "backend2/x.py").unwrap().is_default);
    }

    #[test]
    fn unmatched_path_gets_default_policy() {
        let s = structure(vec![DirectorySpec {
            path: "backend".to_string(),
            allowed_component_kinds: kinds(&["dto"]),
            ..Default::default()
        }]);

        let effective = resolve(&s, "frontend/app.ts").unwrap();
        assert!(effective.is_default);
        assert!(effective.anchor.is_none());
        assert!(effective.allowed_component_kinds.is_empty());
        assert!(effective.chain.is_empty());
    }

    #[test]
    fn escaping_input_is_out_of_scope() {
        let s = structure(vec![]);
        let err = resolve(&s, "backend/../../etc/passwd").unwrap_err();
        assert_eq!(err.path, "backend/../../etc/passwd");
    }

    #[test]
    fn absolute_input_under_declared_root() {
        let s = structure(vec![DirectorySpec {
            path: "backend".to_string(),
            ..Default::default()
        }])
        .with_root("/home/dev/project")
        .unwrap();

        let effective = resolve(&s, "/home/dev/project/backend/x.py").unwrap();
        assert_eq!(effective.path, "backend/x.py");
        assert_eq!(effective.anchor.as_deref(), Some("backend"));

        assert_eq!(resolve(&s, "/home/dev/project").unwrap().path, "");
        assert!(resolve(&s, "/etc/passwd").is_err());
        assert!(resolve(&s, "/home/dev/project2/x").is_err());
    }

    #[test]
    fn absolute_input_without_root_is_out_of_scope() {
        let s = structure(vec![DirectorySpec {
            path: "".to_string(),
            ..Default::default()
        }]);
        let err = resolve(&s, "/etc/passwd").unwrap_err();
        assert_eq!(err.path, "/etc/passwd");
        assert!(resolve(&s, "C:\\Windows\\win.ini").is_err());

        let effective = resolve(&s, "backend/x.py/").unwrap();
        assert_eq!(effective.path, "backend/x.py");
        assert_eq!(effective.anchor.as_deref(), Some(""));
    }

    #[test]
    fn extension_check_uses_resolved_path() {
        let s = structure(vec![DirectorySpec {
            path: "backend".to_string(),
            allowed_extensions: Some(vec!["py".to_string()]),
            ..Default::default()
        }]);

        assert!(resolve(&s, "backend/x.PY").unwrap().allows_extension());
        assert!(!resolve(&s, "backend/x.rs").unwrap().allows_extension());
        assert!(!resolve(&s, "backend/Makefile").unwrap().allows_extension());
    }
}
