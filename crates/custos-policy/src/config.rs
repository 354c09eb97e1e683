//! Authorization policy configuration.
//!
//! `AuthzPolicy` is loaded from TOML and carries the registry settings plus
//! the models to register at startup. Loading validates everything that
//! would otherwise produce ambiguous permission names, so a policy that loads
//! can always be registered (localization packages aside, which only the
//! host can check).

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use custos_contracts::{
    error::{CustosError, CustosResult},
    model::ModelSchema,
    permission::strip_own,
};
use custos_core::{PermissionRegistry, RegistryConfig};

/// Characters with a structural role in permission names.
const RESERVED: [char; 2] = ['@', '.'];

/// The top-level structure deserialized from a TOML policy file.
///
/// Example:
/// ```toml
/// namespace = "odm_auth"
/// strict_ownership_registration = true
///
/// [[models]]
/// name = "doc"
/// package = "plugins.docs"
/// fields = ["title", "body", "author"]
/// actions = ["create", "modify", "delete", "modify_own", "delete_own"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzPolicy {
    #[serde(flatten)]
    pub registry: RegistryConfig,

    /// Models in registration order.
    #[serde(default)]
    pub models: Vec<ModelSchema>,
}

impl AuthzPolicy {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `CustosError::ConfigError` if the TOML is malformed, does not
    /// match the expected schema, or fails validation.
    pub fn from_toml_str(s: &str) -> CustosResult<Self> {
        let policy: AuthzPolicy = toml::from_str(s).map_err(|e| CustosError::ConfigError {
            reason: format!("failed to parse authorization policy TOML: {}", e),
        })?;
        policy.validate()?;
        debug!(
            namespace = %policy.registry.namespace,
            models = policy.models.len(),
            "authorization policy loaded"
        );
        Ok(policy)
    }

    /// Read the file at `path` and parse it as a TOML policy.
    pub fn from_file(path: &Path) -> CustosResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CustosError::ConfigError {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        self.registry.clone()
    }

    pub fn model(&self, name: &str) -> Option<&ModelSchema> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Register every model directly with `registry`, in declaration order.
    ///
    /// Stops at the first failure: a model that cannot be registered is a
    /// startup error, not something to skip.
    pub fn register_models(&self, registry: &PermissionRegistry) -> CustosResult<usize> {
        let mut defined = 0;
        for schema in &self.models {
            defined += registry.register(schema)?.len();
        }
        info!(models = self.models.len(), permissions = defined, "policy models registered");
        Ok(defined)
    }

    fn validate(&self) -> CustosResult<()> {
        let namespace = &self.registry.namespace;
        if namespace.is_empty() || namespace.contains(RESERVED) {
            return Err(config_error(format!(
                "namespace '{}' must be non-empty and contain neither '@' nor '.'",
                namespace
            )));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.name.is_empty() || model.name.contains(RESERVED) {
                return Err(config_error(format!(
                    "model name '{}' must be non-empty and contain neither '@' nor '.'",
                    model.name
                )));
            }
            if model.package.is_empty() {
                return Err(config_error(format!("model '{}' has an empty package", model.name)));
            }
            if !seen.insert(model.name.as_str()) {
                return Err(config_error(format!("model '{}' is declared twice", model.name)));
            }
            for action in &model.actions {
                if strip_own(action).is_empty() || action.contains(RESERVED) {
                    return Err(config_error(format!(
                        "model '{}' declares invalid action '{}'",
                        model.name, action
                    )));
                }
            }
        }

        Ok(())
    }
}

fn config_error(reason: String) -> CustosError {
    CustosError::ConfigError { reason }
}
