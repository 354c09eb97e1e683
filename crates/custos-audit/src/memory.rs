//! In-memory implementation of `AuditWriter`.
//!
//! `InMemoryAuditWriter` appends every decision to a hash chain kept behind a
//! `Mutex`. Hosts share it as `Arc<InMemoryAuditWriter>`: one handle goes to
//! the core as `Arc<dyn AuditWriter>`, the other is kept for inspection via
//! `export_log()` and `verify_integrity()`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::debug;

use custos_contracts::{
    decision::{DecisionKind, DecisionRecord},
    error::{CustosError, CustosResult},
};
use custos_core::traits::AuditWriter;

use crate::{
    chain::{first_break, hash_event},
    event::{AuditEvent, AuditLog},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    pub(crate) events: Vec<AuditEvent>,

    /// The next sequence number to assign.
    pub(crate) sequence: u64,

    /// `this_hash` of the last event, or the genesis hash.
    pub(crate) last_hash: String,
}

// ── Public writer ─────────────────────────────────────────────────────────────

/// An append-only decision log backed by a SHA-256 hash chain.
pub struct InMemoryAuditWriter {
    log_id: String,
    pub(crate) state: Mutex<InMemoryState>,
}

impl InMemoryAuditWriter {
    pub fn new(log_id: impl Into<String>) -> Self {
        Self {
            log_id: log_id.into(),
            state: Mutex::new(InMemoryState {
                events: Vec::new(),
                sequence: 0,
                last_hash: AuditEvent::GENESIS_HASH.to_string(),
            }),
        }
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    pub fn len(&self) -> usize {
        self.read_state().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every recorded decision, oldest first.
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.read_state()
            .events
            .iter()
            .map(|e| e.record.clone())
            .collect()
    }

    pub fn records_of_kind(&self, kind: DecisionKind) -> Vec<DecisionRecord> {
        self.read_state()
            .events
            .iter()
            .filter(|e| e.record.kind == kind)
            .map(|e| e.record.clone())
            .collect()
    }

    /// Snapshot of the chain. `terminal_hash` is empty for an empty log.
    pub fn export_log(&self) -> AuditLog {
        let state = self.read_state();
        AuditLog {
            log_id: self.log_id.clone(),
            events: state.events.clone(),
            exported_at: Utc::now(),
            terminal_hash: state
                .events
                .last()
                .map(|e| e.this_hash.clone())
                .unwrap_or_default(),
        }
    }

    /// True when no stored event has been altered since it was written.
    pub fn verify_integrity(&self) -> bool {
        first_break(&self.read_state().events).is_none()
    }

    // A panic mid-append leaves either the old or the new chain, both of
    // which verify, so readers may look through the poison.
    fn read_state(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── AuditWriter impl ──────────────────────────────────────────────────────────

impl AuditWriter for InMemoryAuditWriter {
    fn write(&self, record: &DecisionRecord) -> CustosResult<()> {
        let mut state = self.state.lock().map_err(|e| CustosError::StoreError {
            reason: format!("audit state lock poisoned: {}", e),
        })?;

        let prev_hash = state.last_hash.clone();
        let sequence = state.sequence;
        let this_hash = hash_event(&self.log_id, sequence, record, &prev_hash)?;

        debug!(
            sequence,
            kind = %record.kind,
            model = %record.model,
            principal = %record.principal,
            allowed = record.allowed,
            "decision recorded"
        );

        state.events.push(AuditEvent {
            sequence,
            log_id: self.log_id.clone(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.sequence += 1;
        state.last_hash = this_hash;

        Ok(())
    }
}
