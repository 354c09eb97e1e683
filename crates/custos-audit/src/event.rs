//! Audit event and log types.
//!
//! `AuditEvent` wraps a `DecisionRecord` with its chain position and the
//! hashes linking it to its predecessor. `AuditLog` is an exported snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use custos_contracts::decision::DecisionRecord;

/// One link of the decision hash chain.
///
/// Changing any field, including the embedded record, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    pub log_id: String,

    pub record: DecisionRecord,

    /// `this_hash` of the previous event, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    pub this_hash: String,
}

impl AuditEvent {
    /// `prev_hash` of the first event in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// Snapshot of a decision log, produced by `InMemoryAuditWriter::export_log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub log_id: String,

    /// Events in chain order.
    pub events: Vec<AuditEvent>,

    pub exported_at: DateTime<Utc>,

    /// `this_hash` of the last event. Empty when the log is empty.
    pub terminal_hash: String,
}

impl AuditLog {
    /// Number of denied decisions in the log.
    pub fn denial_count(&self) -> usize {
        self.events.iter().filter(|e| !e.record.allowed).count()
    }
}
