//! # custos-contracts
//!
//! Shared types, permission keys, and error contracts for the Custos
//! authorization core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, the permission-name wire format, and
//! error types.

pub mod decision;
pub mod entity;
pub mod error;
pub mod model;
pub mod permission;
pub mod principal;
