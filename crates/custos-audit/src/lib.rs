//! # custos-audit
//!
//! Append-only, SHA-256 hash-chained log of authorization decisions.
//!
//! ## Overview
//!
//! Every `DecisionRecord` the guard or the ownership resolver emits is
//! wrapped in an `AuditEvent` linked to its predecessor by hash. Altering a
//! stored decision breaks the chain, which `verify_chain` detects.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custos_audit::InMemoryAuditWriter;
//!
//! let audit = Arc::new(InMemoryAuditWriter::new("cms-session"));
//! let guard = LifecycleGuard::new(registry, evaluator, entities, audit.clone());
//! // ...
//! assert!(audit.verify_integrity());
//! let log = audit.export_log();
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{first_break, hash_event, verify_chain};
pub use event::{AuditEvent, AuditLog};
pub use memory::InMemoryAuditWriter;

// ── Tests ─────────────────────────────────────────────────────────────────────
