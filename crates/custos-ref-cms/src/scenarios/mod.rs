//! Reference CMS demo scenarios.
//!
//! Each scenario builds a fresh `CmsHost`, drives it through a sequence of
//! requests as different principals, and prints what the core decided.

pub mod document_lifecycle;
pub mod ownership_fallback;
pub mod principal_deletion;

use custos_contracts::{
    entity::EntityId,
    error::{CustosError, CustosResult},
};
use custos_memory::Document;

/// Print the outcome of a guarded operation; denials are expected results,
/// anything else propagates.
pub(crate) fn report<T>(label: &str, result: CustosResult<T>) -> CustosResult<Option<T>> {
    match result {
        Ok(value) => {
            println!("  {:<44} ALLOWED", label);
            Ok(Some(value))
        }
        Err(e) if e.is_denial() => {
            println!("  {:<44} DENIED  ({})", label, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Id of a document the scenario just saved.
pub(crate) fn saved_id(doc: &Document) -> CustosResult<EntityId> {
    doc.id().cloned().ok_or_else(|| CustosError::StoreError {
        reason: "document has no id after save".to_string(),
    })
}
