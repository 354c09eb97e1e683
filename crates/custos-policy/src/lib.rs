//! # custos-policy
//!
//! TOML-driven configuration for the Custos authorization core.
//!
//! ## Overview
//!
//! This crate provides [`AuthzPolicy`], which carries the
//! [`RegistryConfig`](custos_core::RegistryConfig) (namespace and ownership
//! strictness) and the list of models a host registers at startup. Policies
//! are validated on load; anything malformed is a `ConfigError`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use custos_policy::AuthzPolicy;
//!
//! let policy = AuthzPolicy::from_file(Path::new("policies/cms.toml"))?;
//! let registry = PermissionRegistry::new(policy.registry_config(), permissions, messages);
//! policy.register_models(&registry)?;
//! ```

pub mod config;

pub use config::AuthzPolicy;

// ── Tests ─────────────────────────────────────────────────────────────────────
