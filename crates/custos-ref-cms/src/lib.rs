//! # custos-ref-cms
//!
//! Content-management reference runtime for the Custos authorization core.
//!
//! Demonstrates three ownership scenarios against an in-memory CMS:
//!
//! 1. **Document Lifecycle**: global versus personal permissions at create,
//!    modify, and delete time, plus direct evaluator queries.
//! 2. **Ownership Fallback**: documents whose author no longer exists are
//!    reassigned to the first admin on first read.
//! 3. **Principal Deletion**: principals that still own documents cannot
//!    be deleted.
//!
//! All data is hardcoded and fictional.

pub mod host;
pub mod mock_data;
pub mod scenarios;

pub use host::{CmsHost, CMS_POLICY};
