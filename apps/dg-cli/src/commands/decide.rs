// decide.rs — `dg decide`: one policy decision, exported to the audit log.
//
// Exit status is the enforcement contract for hooks: 0 when allowed,
// non-zero when denied or when the request itself is malformed.

use clap::Args;
use dg_audit::AuditLog;
use dg_config::Project;
use dg_policy::{DecisionContext, PolicyDecision};
use serde_json::Value;

#[derive(Args)]
pub struct DecideArgs {
    /// Operation identifier (e.g. scaffold, create_file, commit).
    pub operation: String,
    /// Target path.
    pub path: String,
    /// Current workflow phase.
    #[arg(long)]
    pub phase: String,
    /// Component kind being created.
    #[arg(long)]
    pub kind: Option<String>,
    /// Extra context as key=value. Values are parsed as JSON when possible.
    #[arg(long = "context", value_name = "KEY=VALUE")]
    pub context: Vec<String>,
    /// Print the decision as JSON.
    #[arg(long)]
    pub json: bool,
    /// Do not append the decision to the audit log.
    #[arg(long)]
    pub no_export: bool,
}

pub fn execute(project: &Project, args: &DecideArgs) -> anyhow::Result<()> {
    let context = build_context(args)?;
    let engine = project.engine()?;
    let decision = engine.decide(&args.operation, &args.path, &args.phase, &context)?;

    if !args.no_export {
        let mut log = AuditLog::open(&project.layout.audit_log)?;
        engine.audit().export(&mut log, 0)?;
        tracing::debug!(log = %log.path().display(), "decision exported");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        print_decision(&decision);
    }

    if !decision.allowed {
        anyhow::bail!("denied: {}", decision.reason);
    }
    Ok(())
}

fn build_context(args: &DecideArgs) -> anyhow::Result<DecisionContext> {
    let mut context = DecisionContext::new();
    for pair in &args.context {
        let (key, value) = parse_context_arg(pair)?;
        context.insert(key, value);
    }
    if let Some(kind) = &args.kind {
        context.insert(dg_policy::COMPONENT_KIND, kind.as_str());
    }
    Ok(context)
}

/// `key=value`; the value is JSON if it parses, a plain string otherwise.
fn parse_context_arg(pair: &str) -> anyhow::Result<(String, Value)> {
    let Some((key, raw)) = pair.split_once('=') else {
        anyhow::bail!("context must be KEY=VALUE, got '{}'", pair);
    };
    if key.is_empty() {
        anyhow::bail!("context key is empty in '{}'", pair);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn print_decision(decision: &PolicyDecision) {
    let verdict = if decision.allowed { "ALLOWED" } else { "DENIED" };
    println!("{}: {}", verdict, decision.reason);
    for step in &decision.steps {
        let marker = if step.terminal { "*" } else { " " };
        println!("  {} {:<18} {}", marker, step.check, step.outcome);
    }
}
