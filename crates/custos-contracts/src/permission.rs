//! Typed permission keys and the permission-name wire format.
//!
//! Every permission is identified by a `PermissionKey`. Its `Display`
//! implementation produces the exact strings external registries and UIs
//! list:
//!
//! ```text
//! <namespace>@<action>.<model>        global permission
//! <namespace>@<action>_own.<model>    personal permission
//! ```
//!
//! The `_own` suffix is appended by the key itself; an action identifier
//! never carries it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CustosError;

/// Namespace prefix used when the configuration does not override it.
pub const DEFAULT_NAMESPACE: &str = "odm_auth";

/// Suffix marking a personal ("only your own entities") action.
pub const OWN_SUFFIX: &str = "_own";

/// The action set a model supports when it does not declare its own.
pub const DEFAULT_ACTIONS: [&str; 7] = [
    "create",
    "view",
    "modify",
    "delete",
    "view_own",
    "modify_own",
    "delete_own",
];

/// True if `action` carries the personal suffix.
pub fn is_personal_action(action: &str) -> bool {
    action.ends_with(OWN_SUFFIX)
}

/// Remove a trailing `_own` suffix, if any.
pub fn strip_own(action: &str) -> &str {
    action.strip_suffix(OWN_SUFFIX).unwrap_or(action)
}

/// Canonical identity of one permission: (namespace, action, model, personal).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionKey {
    pub namespace: String,
    /// Bare action, never ending in `_own`.
    pub action: String,
    pub model: String,
    pub personal: bool,
}

impl PermissionKey {
    /// Key granting `action` over every entity of `model`.
    pub fn global(namespace: &str, action: &str, model: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            action: strip_own(action).to_string(),
            model: model.to_string(),
            personal: false,
        }
    }

    /// Key granting `action` only over entities of `model` the principal owns.
    pub fn personal(namespace: &str, action: &str, model: &str) -> Self {
        Self {
            personal: true,
            ..Self::global(namespace, action, model)
        }
    }

    /// Build the key for an action as a model declares it, where a trailing
    /// `_own` selects the personal variant (`"modify_own"`).
    pub fn from_declared(namespace: &str, declared: &str, model: &str) -> Self {
        if is_personal_action(declared) {
            Self::personal(namespace, declared, model)
        } else {
            Self::global(namespace, declared, model)
        }
    }

    /// The action as it appears in the wire name (`modify` or `modify_own`).
    pub fn qualified_action(&self) -> String {
        if self.personal {
            format!("{}{}", self.action, OWN_SUFFIX)
        } else {
            self.action.clone()
        }
    }

    /// Lookup key handed to the message resolver for this permission's
    /// human-readable description, e.g. `odm_auth_modify_own_doc`.
    pub fn message_id(&self) -> String {
        format!("{}_{}_{}", self.namespace, self.qualified_action(), self.model)
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}.{}", self.namespace, self.qualified_action(), self.model)
    }
}

impl FromStr for PermissionKey {
    type Err = CustosError;

    /// Parse a wire-format permission name. The model is everything after
    /// the first `.` following the `@`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CustosError::ConfigError {
            reason: format!("malformed permission name '{}'", s),
        };

        let (namespace, rest) = s.split_once('@').ok_or_else(malformed)?;
        let (action, model) = rest.split_once('.').ok_or_else(malformed)?;

        if namespace.is_empty() || model.is_empty() || strip_own(action).is_empty() {
            return Err(malformed());
        }

        Ok(Self::from_declared(namespace, action, model))
    }
}

/// One entry in the external permission-definition store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    /// Wire-format permission name; unique key of the definition.
    pub name: String,
    pub description: String,
    pub group: String,
}

/// A requested action, or a set of alternatives of which any one suffices.
///
/// A set is a caller convenience, not a permission of its own: it is granted
/// iff at least one member is granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionQuery {
    One(String),
    AnyOf(Vec<String>),
}

impl ActionQuery {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::AnyOf(_))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Self::One(action) => std::slice::from_ref(action),
            Self::AnyOf(actions) => actions,
        };
        items.iter().map(String::as_str)
    }
}

impl From<&str> for ActionQuery {
    fn from(action: &str) -> Self {
        Self::One(action.to_string())
    }
}

impl From<String> for ActionQuery {
    fn from(action: String) -> Self {
        Self::One(action)
    }
}

impl From<Vec<String>> for ActionQuery {
    fn from(actions: Vec<String>) -> Self {
        Self::AnyOf(actions)
    }
}

impl From<Vec<&str>> for ActionQuery {
    fn from(actions: Vec<&str>) -> Self {
        Self::AnyOf(actions.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ActionQuery {
    fn from(actions: &[&str]) -> Self {
        Self::AnyOf(actions.iter().map(|a| a.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ActionQuery {
    fn from(actions: [&str; N]) -> Self {
        Self::AnyOf(actions.iter().map(|a| a.to_string()).collect())
    }
}
