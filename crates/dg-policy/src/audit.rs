// audit.rs — In-memory, append-only audit trail.
//
// Every decision the engine returns is recorded here, allowed or denied.
// The trail is bounded: once `capacity` entries are held, the oldest is
// evicted for each new one and `evicted()` counts how many were dropped.
// Sequence numbers never reset, so a consumer that sees a jump knows it
// missed entries. A capacity of 0 disables eviction.
//
// Readers get a cloned copy; entries appended after the copy was taken are
// simply not in it.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use dg_audit::{AuditError, AuditLog};
use serde::Serialize;
use uuid::Uuid;

use crate::context::DecisionContext;
use crate::engine::PolicyDecision;

/// Default number of entries kept in memory.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// One recorded decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    /// Monotonic per trail, starting at 1.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub path: String,
    pub phase: String,
    pub context: DecisionContext,
    pub decision: PolicyDecision,
}

#[derive(Debug, Default)]
struct TrailState {
    entries: VecDeque<AuditEntry>,
    next_sequence: u64,
    evicted: u64,
}

/// Concurrent append-only audit sequence.
#[derive(Debug)]
pub struct AuditTrail {
    state: Mutex<TrailState>,
    capacity: usize,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    /// `capacity == 0` keeps every entry for the life of the process.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(TrailState {
                next_sequence: 1,
                ..TrailState::default()
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one decision. Returns its sequence number.
    pub(crate) fn record(
        &self,
        operation: &str,
        path: &str,
        phase: &str,
        context: &DecisionContext,
        decision: &PolicyDecision,
    ) -> u64 {
        let mut state = self.lock();
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        if self.capacity > 0 && state.entries.len() >= self.capacity {
            state.entries.pop_front();
            state.evicted += 1;
            if state.evicted == 1 || state.evicted % 1_000 == 0 {
                tracing::warn!(
                    capacity = self.capacity,
                    evicted = state.evicted,
                    "audit trail full, evicting oldest entries"
                );
            }
        }

        state.entries.push_back(AuditEntry {
            entry_id: Uuid::new_v4(),
            sequence,
            timestamp: decision.timestamp,
            operation: operation.to_string(),
            path: path.to_string(),
            phase: phase.to_string(),
            context: context.clone(),
            decision: decision.clone(),
        });
        sequence
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Retained entries with a sequence number greater than `sequence`.
    pub fn since(&self, sequence: u64) -> Vec<AuditEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.sequence > sequence)
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<AuditEntry> {
        self.lock().entries.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Entries dropped to honor the capacity.
    pub fn evicted(&self) -> u64 {
        self.lock().evicted
    }

    /// Write every retained entry after `sequence` to a hash-chained JSONL
    /// log. Returns the sequence of the last exported entry, or `sequence`
    /// when there was nothing new, so callers can export incrementally.
    pub fn export(&self, log: &mut AuditLog, sequence: u64) -> Result<u64, AuditError> {
        let mut last = sequence;
        for entry in self.since(sequence) {
            log.append(&entry)?;
            last = entry.sequence;
        }
        tracing::debug!(path = %log.path().display(), through = last, "audit trail exported");
        Ok(last)
    }

    // A panic while holding the lock cannot leave a half-written entry, so a
    // poisoned mutex is still safe to read.
    fn lock(&self) -> MutexGuard<'_, TrailState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}
