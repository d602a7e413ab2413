//! # dg-audit
//!
//! Tamper-evident JSONL sink for devgate audit records.
//!
//! The policy engine keeps its audit trail in memory. Consumers that need a
//! durable copy export it through an [`AuditLog`]: one JSON object per line,
//! each line carrying the SHA-256 hash of the line before it. Editing,
//! inserting, or deleting a line breaks the chain and is reported by
//! [`AuditLog::verify_chain`].
//!
//! ```rust,no_run
//! use dg_audit::AuditLog;
//!
//! let mut log = AuditLog::open("/tmp/devgate-audit.jsonl").unwrap();
//! log.append(&serde_json::json!({"operation": "scaffold", "allowed": true}))
//!     .unwrap();
//! ```

pub mod error;
pub mod hasher;
pub mod log;

pub use error::AuditError;
pub use log::{AuditLog, ChainedRecord};
