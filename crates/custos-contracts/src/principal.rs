//! Principal identity and role types.
//!
//! A principal is the actor an authorization check is made for. The core
//! never authenticates principals; it receives them fully formed from the
//! host's principal store.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::permission::PermissionKey;

/// Stable identifier of a principal, as stored in an entity's owner field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse role attached to a principal.
///
/// Only the split between exempt roles (`System`, `Admin`, `Dev`) and
/// everything else matters to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    System,
    Admin,
    Dev,
    Regular,
}

/// An actor subject to authorization checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    /// Human-readable login, used only in log output.
    pub login: String,
    pub roles: BTreeSet<Role>,
    /// Granted permission names in wire format (`odm_auth@modify.doc`).
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl Principal {
    /// Build a principal holding a single role and no grants.
    pub fn new(id: impl Into<String>, login: impl Into<String>, role: Role) -> Self {
        Self {
            id: PrincipalId::new(id),
            login: login.into(),
            roles: BTreeSet::from([role]),
            permissions: BTreeSet::new(),
        }
    }

    /// The built-in system principal used for scoped privilege elevation.
    pub fn system() -> Self {
        Self::new("system", "system", Role::System)
    }

    /// Grant a permission by name. Returns `self` for chaining in fixtures.
    pub fn with_permission(mut self, name: impl Into<String>) -> Self {
        self.permissions.insert(name.into());
        self
    }

    pub fn grant(&mut self, name: impl Into<String>) {
        self.permissions.insert(name.into());
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_system(&self) -> bool {
        self.has_role(Role::System)
    }

    /// Admins and developers share unrestricted rights.
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin) || self.has_role(Role::Dev)
    }

    /// True for principals that bypass every authorization check.
    pub fn is_exempt(&self) -> bool {
        self.is_system() || self.is_admin()
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.contains(name)
    }

    pub fn holds(&self, key: &PermissionKey) -> bool {
        self.has_permission(&key.to_string())
    }
}
