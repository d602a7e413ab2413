// engine.rs — Policy decision engine.
//
// `decide()` is the single chokepoint an enforcement caller consults before
// scaffolding a file, creating a branch, or committing. Checks run in order
// and the first failure is the decision:
//
// 1. Is the operation declared?                  → no  → deny
// 2. Is the phase allowed for it?                → no  → deny
// 3. Is the caller context well formed?          → no  → Err(ContextError)
// 4. Does the path resolve inside the structure? → no  → deny
// 5. Is the component kind allowed there?        → no  → deny
// 6. Is the extension allowed (when enforced)?   → no  → deny
// 7. Must the path be scaffolded (when enforced)?→ yes → deny
// 8. Allow.
//
// Denial is a normal return value. Every decision, allowed or not, is
// appended to the audit trail; context errors produce no decision and are
// not recorded. The engine holds an immutable snapshot and never blocks on
// anything but the audit append.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::audit::AuditTrail;
use crate::context::{DecisionContext, COMPONENT_KIND};
use crate::error::{ContextError, PathOutOfScope};
use crate::operation::settings;
use crate::resolver::{self, EffectivePolicy};
use crate::snapshot::PolicySnapshot;

/// Which check produced a decision.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    UnknownOperation,
    PhaseNotAllowed,
    PathOutOfScope,
    NoDirectoryPolicy,
    ComponentKindNotAllowed,
    UnknownComponentKind,
    ExtensionNotAllowed,
    ScaffoldRequired,
    Allowed,
}

/// A step in the evaluation chain.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EvaluationStep {
    /// Which check was performed (e.g. "operation_lookup", "phase").
    pub check: String,
    /// The outcome (e.g. "passed", "failed: ...").
    pub outcome: String,
    /// Whether this step decided the outcome.
    pub terminal: bool,
}

/// The answer to one `decide()` call. Never mutated after it is returned.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: String,
    pub rule: DecisionRule,
    /// The effective directory policy, when resolution got that far.
    pub resolved_policy: Option<EffectivePolicy>,
    /// Reserved for an enforcement layer; always false here.
    pub requires_human_approval: bool,
    pub timestamp: DateTime<Utc>,
    pub steps: Vec<EvaluationStep>,
}

impl PolicyDecision {
    pub(crate) fn denied(
        rule: DecisionRule,
        reason: impl Into<String>,
        resolved_policy: Option<EffectivePolicy>,
        steps: Vec<EvaluationStep>,
    ) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            rule,
            resolved_policy,
            requires_human_approval: false,
            timestamp: Utc::now(),
            steps,
        }
    }

    fn allowed(reason: String, resolved_policy: EffectivePolicy, steps: Vec<EvaluationStep>) -> Self {
        Self {
            allowed: true,
            reason,
            rule: DecisionRule::Allowed,
            resolved_policy: Some(resolved_policy),
            requires_human_approval: false,
            timestamp: Utc::now(),
            steps,
        }
    }

    /// The anchor path of the resolved policy, if any.
    pub fn anchor(&self) -> Option<&str> {
        self.resolved_policy.as_ref()?.anchor.as_deref()
    }
}

/// Step recorder for one evaluation.
#[derive(Default)]
struct Trace {
    steps: Vec<EvaluationStep>,
}

impl Trace {
    fn pass(&mut self, check: &str, outcome: impl Into<String>) {
        self.steps.push(EvaluationStep {
            check: check.to_string(),
            outcome: outcome.into(),
            terminal: false,
        });
    }

    fn deny(
        mut self,
        check: &str,
        rule: DecisionRule,
        reason: String,
        resolved: Option<EffectivePolicy>,
    ) -> PolicyDecision {
        self.steps.push(EvaluationStep {
            check: check.to_string(),
            outcome: format!("failed: {}", reason),
            terminal: true,
        });
        PolicyDecision::denied(rule, reason, resolved, self.steps)
    }

    fn allow(mut self, reason: String, resolved: EffectivePolicy) -> PolicyDecision {
        self.steps.push(EvaluationStep {
            check: "decision".to_string(),
            outcome: format!("allowed: {}", reason),
            terminal: true,
        });
        PolicyDecision::allowed(reason, resolved, self.steps)
    }
}

/// Evaluates requests against one immutable snapshot.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    snapshot: Arc<PolicySnapshot>,
    audit: Arc<AuditTrail>,
}

impl PolicyEngine {
    /// Engine with its own audit trail of default capacity.
    pub fn new(snapshot: Arc<PolicySnapshot>) -> Self {
        Self::with_audit(snapshot, Arc::new(AuditTrail::new()))
    }

    pub fn with_audit(snapshot: Arc<PolicySnapshot>, audit: Arc<AuditTrail>) -> Self {
        Self { snapshot, audit }
    }

    /// A new engine over `snapshot` that records into the same trail.
    pub fn with_snapshot(&self, snapshot: Arc<PolicySnapshot>) -> Self {
        Self::with_audit(snapshot, Arc::clone(&self.audit))
    }

    pub fn snapshot(&self) -> &Arc<PolicySnapshot> {
        &self.snapshot
    }

    pub fn audit(&self) -> &Arc<AuditTrail> {
        &self.audit
    }

    /// The effective directory policy for a path, without deciding anything.
    pub fn resolve(&self, path: &str) -> Result<EffectivePolicy, PathOutOfScope> {
        resolver::resolve(&self.snapshot.structure, path)
    }

    /// Decide whether `operation` on `path` in `phase` is allowed, and record
    /// the decision.
    pub fn decide(
        &self,
        operation: &str,
        path: &str,
        phase: &str,
        context: &DecisionContext,
    ) -> Result<PolicyDecision, ContextError> {
        let decision = self.evaluate(operation, path, phase, context)?;
        let sequence = self.audit.record(operation, path, phase, context, &decision);

        tracing::debug!(
            operation,
            path,
            phase,
            allowed = decision.allowed,
            rule = ?decision.rule,
            sequence,
            "policy decision"
        );
        Ok(decision)
    }

    /// The decision logic, without recording.
    fn evaluate(
        &self,
        operation: &str,
        path: &str,
        phase: &str,
        context: &DecisionContext,
    ) -> Result<PolicyDecision, ContextError> {
        let mut trace = Trace::default();

        let Some(op) = self.snapshot.operations.get(operation) else {
            return Ok(trace.deny(
                "operation_lookup",
                DecisionRule::UnknownOperation,
                format!("unknown operation '{}'", operation),
                None,
            ));
        };
        trace.pass("operation_lookup", "found");

        if !op.is_phase_allowed(phase) {
            return Ok(trace.deny(
                "phase",
                DecisionRule::PhaseNotAllowed,
                format!(
                    "operation '{}' is not allowed in phase '{}'; allowed phases: {}",
                    operation,
                    phase,
                    op.describe_phases()
                ),
                None,
            ));
        }
        trace.pass("phase", format!("'{}' within {}", phase, op.describe_phases()));

        let kind = context.get_str(COMPONENT_KIND)?;
        if kind.is_none() && op.setting_bool(settings::REQUIRES_COMPONENT_KIND) {
            return Err(ContextError::MissingKey {
                operation: operation.to_string(),
                key: COMPONENT_KIND.to_string(),
            });
        }
        trace.pass("context", "well formed");

        let effective = match self.resolve(path) {
            Ok(effective) => effective,
            Err(out_of_scope) => {
                return Ok(trace.deny(
                    "resolve",
                    DecisionRule::PathOutOfScope,
                    out_of_scope.to_string(),
                    None,
                ));
            }
        };
        if effective.is_default {
            let reason = format!("no directory policy covers path '{}'", effective.path);
            return Ok(trace.deny(
                "resolve",
                DecisionRule::NoDirectoryPolicy,
                reason,
                Some(effective),
            ));
        }
        let anchor = effective.anchor.clone().unwrap_or_default();
        trace.pass("resolve", format!("anchored at '{}'", display_dir(&anchor)));

        if let Some(kind) = kind {
            if !effective.allows_component_kind(kind) {
                let reason = format!(
                    "component kind '{}' is not allowed in '{}'; allowed kinds: [{}]",
                    kind,
                    display_dir(&anchor),
                    join(&effective.allowed_component_kinds),
                );
                return Ok(trace.deny(
                    "component_kind",
                    DecisionRule::ComponentKindNotAllowed,
                    reason,
                    Some(effective),
                ));
            }
            if !self.snapshot.registry.contains(kind) {
                let reason = format!("unknown component kind '{}'", kind);
                return Ok(trace.deny(
                    "component_kind",
                    DecisionRule::UnknownComponentKind,
                    reason,
                    Some(effective),
                ));
            }
            trace.pass("component_kind", format!("'{}' allowed", kind));
        }

        if op.setting_bool(settings::ENFORCE_EXTENSIONS) {
            if !effective.allows_extension() {
                let reason = format!(
                    "file '{}' does not have an allowed extension; allowed: [{}]",
                    effective.path,
                    join(&effective.allowed_extensions),
                );
                return Ok(trace.deny(
                    "extension",
                    DecisionRule::ExtensionNotAllowed,
                    reason,
                    Some(effective),
                ));
            }
            trace.pass("extension", "allowed");
        }

        if op.setting_bool(settings::ENFORCE_SCAFFOLD) {
            if let Some(rule) = effective.scaffold_rule() {
                let reason = format!(
                    "path '{}' matches scaffold pattern '{}' declared in '{}'; create it by scaffolding",
                    effective.path,
                    rule.pattern,
                    display_dir(&rule.declared_in),
                );
                return Ok(trace.deny(
                    "scaffold",
                    DecisionRule::ScaffoldRequired,
                    reason,
                    Some(effective),
                ));
            }
            trace.pass("scaffold", "no pattern matches");
        }

        let reason = match kind {
            Some(kind) => format!(
                "component kind '{}' allowed by directory policy '{}'",
                kind,
                display_dir(effective.component_kinds_from.as_deref().unwrap_or(&anchor)),
            ),
            None => format!(
                "operation '{}' allowed in phase '{}' under '{}'",
                operation,
                phase,
                display_dir(&anchor)
            ),
        };
        Ok(trace.allow(reason, effective))
    }
}

/// Holds the current engine and swaps it atomically on reload.
///
/// Readers clone the `Arc` and release the lock immediately, so a reload
/// never waits on a decision and a decision never observes a half-swapped
/// snapshot.
#[derive(Debug)]
pub struct SharedPolicyEngine {
    current: RwLock<Arc<PolicyEngine>>,
}

impl SharedPolicyEngine {
    pub fn new(engine: PolicyEngine) -> Self {
        Self {
            current: RwLock::new(Arc::new(engine)),
        }
    }

    /// The engine in effect right now.
    pub fn current(&self) -> Arc<PolicyEngine> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    /// Swap in a new snapshot. The audit trail carries over. Returns the
    /// engine that was replaced.
    pub fn reload(&self, snapshot: PolicySnapshot) -> Arc<PolicyEngine> {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(current.with_snapshot(Arc::clone(&snapshot)));
        let previous = std::mem::replace(&mut *current, next);
        tracing::info!(
            previous = %previous.snapshot().snapshot_id,
            current = %snapshot.snapshot_id,
            "policy snapshot reloaded"
        );
        previous
    }

    /// Decide against the current engine.
    pub fn decide(
        &self,
        operation: &str,
        path: &str,
        phase: &str,
        context: &DecisionContext,
    ) -> Result<PolicyDecision, ContextError> {
        self.current().decide(operation, path, phase, context)
    }
}

fn display_dir(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
