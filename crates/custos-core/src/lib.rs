//! # custos-core
//!
//! Ownership-aware authorization for entities that carry an owner reference.
//!
//! This crate provides:
//! - The collaborator traits the host implements (`traits`)
//! - A per-request `SecurityContext` with scoped privilege elevation
//! - `PermissionRegistry`, which derives and defines model permissions
//! - `OwnershipResolver`, which repairs dangling owner references
//! - `PermissionEvaluator`, the global-then-personal decision procedure
//! - `LifecycleGuard`, which enforces decisions at create/modify/delete time
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custos_core::{LifecycleGuard, PermissionEvaluator, PermissionRegistry, SecurityContext};
//!
//! let guard = Arc::new(LifecycleGuard::new(registry, evaluator, entities, audit));
//! guard.register_hooks(&dispatcher);
//!
//! let ctx = SecurityContext::new(current_user);
//! let may_edit = guard.evaluator().check_permission(&ctx, "modify", "doc", Some(&id), None)?;
//! ```

pub mod context;
pub mod evaluator;
pub mod guard;
pub mod ownership;
pub mod registry;
pub mod traits;

#[cfg(test)]
mod testing;

pub use context::{ElevationScope, SecurityContext};
pub use evaluator::PermissionEvaluator;
pub use guard::LifecycleGuard;
pub use ownership::OwnershipResolver;
pub use registry::{PermissionRegistry, RegistryConfig};
