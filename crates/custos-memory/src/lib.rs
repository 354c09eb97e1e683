//! # custos-memory
//!
//! In-memory implementations of every collaborator the Custos core needs:
//!
//! - `HookRegistry`           : `HookDispatcher` with weak listener handles
//! - `InMemoryPrincipalStore` : `PrincipalStore`, fallback owner = first admin
//! - `InMemoryEntityStore`    : `EntityStore` over `Document`s, firing hooks
//! - `InMemoryPermissionStore`: `PermissionStore`
//! - `StaticMessageResolver`  : `MessageResolver`
//!
//! Stores share one `HookRegistry`. No store lock is held while hooks run,
//! so guards may read stores and the ownership resolver may write to them
//! from inside a hook.

pub mod entity;
pub mod hooks;
pub mod messages;
pub mod permission;
pub mod principal;

pub use entity::{Document, InMemoryEntityStore};
pub use hooks::HookRegistry;
pub use messages::StaticMessageResolver;
pub use permission::InMemoryPermissionStore;
pub use principal::InMemoryPrincipalStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
