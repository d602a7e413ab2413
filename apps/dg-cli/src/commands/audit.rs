// audit.rs — Audit subcommands: verify, tail.

use std::path::PathBuf;

use clap::Subcommand;
use dg_audit::{AuditError, AuditLog, ChainedRecord};
use dg_config::Project;
use serde_json::Value;

#[derive(Subcommand)]
pub enum AuditCommands {
    /// Verify the audit log hash chain integrity.
    Verify {
        /// Path to audit log (defaults to the configured log).
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Show recent decisions.
    Tail {
        /// Path to audit log (defaults to the configured log).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Number of decisions to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
}

pub fn execute(cmd: &AuditCommands, project: &Project) -> anyhow::Result<()> {
    match cmd {
        AuditCommands::Verify { log } => {
            let path = log.clone().unwrap_or_else(|| project.layout.audit_log.clone());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            match AuditLog::verify_chain(&path) {
                Ok(count) => {
                    println!("Audit log verified: {} decision(s), hash chain intact.", count);
                }
                Err(AuditError::IntegrityViolation {
                    line,
                    expected,
                    actual,
                }) => {
                    println!("INTEGRITY VIOLATION at line {}:", line);
                    println!("  Expected previous_hash: {}", expected);
                    println!("  Actual previous_hash:   {}", actual);
                    println!();
                    println!("The audit log may have been tampered with.");
                    anyhow::bail!("Audit log integrity check failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        AuditCommands::Tail { log, n } => {
            let path = log.clone().unwrap_or_else(|| project.layout.audit_log.clone());
            if !path.exists() {
                println!("No audit log found at {}", path.display());
                return Ok(());
            }

            let records: Vec<ChainedRecord<Value>> = AuditLog::read_all(&path)?;
            let start = records.len().saturating_sub(*n);
            let recent = &records[start..];

            if recent.is_empty() {
                println!("No audit entries.");
                return Ok(());
            }

            println!(
                "{:<26} {:<8} {:<12} {:<10} PATH",
                "TIMESTAMP", "VERDICT", "OPERATION", "PHASE"
            );
            println!("{}", "-".repeat(80));
            for entry in recent {
                println!("{}", format_row(&entry.record));
            }
        }
    }

    Ok(())
}

fn format_row(record: &Value) -> String {
    let field = |key: &str| record[key].as_str().unwrap_or("-").to_string();
    let verdict = match record["decision"]["allowed"].as_bool() {
        Some(true) => "allow",
        Some(false) => "deny",
        None => "?",
    };
    let timestamp = field("timestamp");
    format!(
        "{:<26} {:<8} {:<12} {:<10} {}",
        timestamp.get(..19).unwrap_or(&timestamp),
        verdict,
        field("operation"),
        field("phase"),
        field("path"),
    )
}
