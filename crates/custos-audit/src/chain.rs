//! Hash-chain primitives for the decision log.
//!
//! Hash input layout (bytes, in order):
//!   1. log_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the decision record

use sha2::{Digest, Sha256};

use custos_contracts::{
    decision::DecisionRecord,
    error::{CustosError, CustosResult},
};

use crate::event::AuditEvent;

/// Compute the SHA-256 hash of one decision at position `sequence`.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_event(
    log_id: &str,
    sequence: u64,
    record: &DecisionRecord,
    prev_hash: &str,
) -> CustosResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| CustosError::StoreError {
        reason: format!("decision record is not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(log_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Sequence number of the first event that breaks the chain, if any.
///
/// An event breaks the chain when its `prev_hash` is not the previous
/// event's `this_hash` (the genesis hash for the first event), when its
/// `this_hash` differs from the recomputed value, or when its sequence is
/// out of place.
pub fn first_break(events: &[AuditEvent]) -> Option<u64> {
    let mut expected_prev = AuditEvent::GENESIS_HASH;

    for (position, event) in events.iter().enumerate() {
        if event.sequence != position as u64 || event.prev_hash != expected_prev {
            return Some(event.sequence);
        }

        let recomputed = hash_event(&event.log_id, event.sequence, &event.record, &event.prev_hash);
        if recomputed.ok().as_deref() != Some(event.this_hash.as_str()) {
            return Some(event.sequence);
        }

        expected_prev = event.this_hash.as_str();
    }

    None
}

/// True when the chain is intact. An empty chain is valid.
pub fn verify_chain(events: &[AuditEvent]) -> bool {
    first_break(events).is_none()
}
