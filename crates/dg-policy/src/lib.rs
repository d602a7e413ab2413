//! # dg-policy
//!
//! Policy decision engine for devgate.
//!
//! Answers one question for an enforcement caller: may this operation touch
//! this path in this workflow phase? Three configuration domains feed the
//! answer, loaded together into an immutable [`PolicySnapshot`]:
//!
//! - a [`ComponentRegistry`] of component kinds (dto, worker, service, ...)
//! - a [`ProjectStructure`] of directory policies that inherit from parents
//! - an [`OperationPolicySet`] gating operations by phase
//!
//! The [`PolicyEngine`] evaluates requests against a snapshot and records
//! every decision in an [`AuditTrail`].
//!
//! ## Key invariants
//!
//! - **Fail fast**: configuration is validated at load and every violation
//!   is reported at once. A loaded snapshot is never partially valid.
//! - **Default deny**: a path no directory policy covers is denied.
//! - **Denial is not an error**: `decide()` returns `Err` only for malformed
//!   caller context.
//! - **Everything is audited**: one entry per decision, allowed or not.

pub mod audit;
pub mod context;
pub mod engine;
pub mod error;
pub mod operation;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod snapshot;
pub mod source;
pub mod structure;

pub use audit::{AuditEntry, AuditTrail, DEFAULT_AUDIT_CAPACITY};
pub use context::{DecisionContext, COMPONENT_KIND};
pub use engine::{DecisionRule, EvaluationStep, PolicyDecision, PolicyEngine, SharedPolicyEngine};
pub use error::{ConfigDomain, ConfigError, ContextError, PathOutOfScope, ValidationErrors, Violation};
pub use operation::{OperationPolicy, OperationPolicySet, PhaseVocabulary};
pub use registry::{ComponentDefinition, ComponentRegistry};
pub use resolver::{resolve, EffectivePolicy};
pub use snapshot::{ConfigSources, PolicySnapshot};
pub use source::{ComponentSpec, DirectorySpec, OperationSpec, SettingValue};
pub use structure::{DirectoryPolicy, ProjectStructure, ScaffoldRule, MAX_INHERITANCE_DEPTH};
