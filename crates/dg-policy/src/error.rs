// error.rs — Error types for the policy subsystem.
//
// Load-time problems are `ConfigError`s and are fatal. A validation error
// carries every violation found in one pass so a single edit can fix them
// all. Per-call problems are limited to malformed caller context.

use std::fmt;

use thiserror::Error;

/// Which configuration domain a violation was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigDomain {
    Components,
    Structure,
    Operations,
}

impl fmt::Display for ConfigDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigDomain::Components => write!(f, "components"),
            ConfigDomain::Structure => write!(f, "structure"),
            ConfigDomain::Operations => write!(f, "operations"),
        }
    }
}

/// A single load-time defect.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Violation {
    #[error("component at position {index} has an empty identifier")]
    EmptyComponentId { index: usize },

    #[error("component '{id}' is declared more than once")]
    DuplicateComponentId { id: String },

    #[error("component '{id}' has an empty template reference")]
    EmptyTemplate { id: String },

    #[error("directory path '{path}' is invalid: {reason}")]
    InvalidDirectoryPath { path: String, reason: String },

    #[error("project root '{root}' is invalid: {reason}")]
    InvalidRoot { root: String, reason: String },

    #[error("directory '{path}' is declared more than once")]
    DuplicateDirectory { path: String },

    #[error("directory '{path}' names parent '{parent}', which is not declared")]
    UnknownParent { path: String, parent: String },

    #[error("cyclic parent chain: {}", .chain.join(" -> "))]
    CyclicParent { chain: Vec<String> },

    #[error("parent chain of '{path}' exceeds the maximum depth of {max}")]
    ChainTooDeep { path: String, max: usize },

    #[error("directory '{path}' allows unknown component kind '{kind}'")]
    UnknownComponentKind { path: String, kind: String },

    #[error("directory '{path}' has invalid scaffold pattern '{pattern}': {reason}")]
    InvalidGlob {
        path: String,
        pattern: String,
        reason: String,
    },

    #[error("operation at position {index} has an empty identifier")]
    EmptyOperationId { index: usize },

    #[error("operation '{id}' is declared more than once")]
    DuplicateOperation { id: String },

    #[error("operation '{operation}' references unknown phase '{phase}'")]
    UnknownPhase { operation: String, phase: String },
}

/// Every violation found while loading one configuration domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    pub domain: ConfigDomain,
    pub violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn new(domain: ConfigDomain, violations: Vec<Violation>) -> Self {
        Self { domain, violations }
    }

    /// Merge another domain's violations into this error. The domain of the
    /// first error is kept.
    pub fn merge(mut self, other: ValidationErrors) -> Self {
        self.violations.extend(other.violations);
        self
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} configuration has {} violation(s)",
            self.domain,
            self.violations.len()
        )?;
        for v in &self.violations {
            write!(f, "\n  - {}", v)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Fatal configuration errors. Either one blocks startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The raw configuration source does not exist.
    #[error("configuration source not found: {source_name}")]
    NotFound { source_name: String },

    /// The configuration was read but is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl ConfigError {
    /// The violations carried by a validation error, empty otherwise.
    pub fn violations(&self) -> &[Violation] {
        match self {
            ConfigError::Validation(errors) => &errors.violations,
            ConfigError::NotFound { .. } => &[],
        }
    }
}

/// The resolver input escapes the declared structure root.
///
/// Not a failure of the engine: `decide()` turns it into a denial.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("path '{path}' is outside the project structure: {reason}")]
pub struct PathOutOfScope {
    pub path: String,
    pub reason: String,
}

/// Malformed caller context passed to `decide()`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    /// A context key holds a value of the wrong JSON type.
    #[error("context key '{key}' must be a {expected}, got {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: String,
    },

    /// The operation requires a context key the caller did not supply.
    #[error("operation '{operation}' requires context key '{key}'")]
    MissingKey { operation: String, key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_lists_every_violation() {
        let err = ConfigError::from(ValidationErrors::new(
            ConfigDomain::Structure,
            vec![
                Violation::UnknownComponentKind {
                    path: "backend".to_string(),
                    kind: "widget".to_string(),
                },
                Violation::UnknownParent {
                    path: "frontend".to_string(),
                    parent: "web".to_string(),
                },
            ],
        ));
        let text = err.to_string();
        assert!(text.contains("2 violation(s)"));
        assert!(text.contains("widget"));
        assert!(text.contains("'web'"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn cyclic_parent_display_shows_chain() {
        let v = Violation::CyclicParent {
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(v.to_string(), "cyclic parent chain: a -> b -> a");
    }
}
