//! Permission registry: derives and defines a model's permissions.
//!
//! Registration happens once per model at startup. For every action the
//! model supports the registry derives a `PermissionKey`, resolves its
//! description, and defines it in the external permission store. Afterwards
//! the registry is only read.
//!
//! Every configuration check runs before the first definition is written,
//! so a rejected model leaves the permission store untouched. A store failure
//! while defining is propagated and the model stays unregistered, but the
//! definitions written before it remain in the store.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use custos_contracts::{
    error::{CustosError, CustosResult},
    model::ModelSchema,
    permission::{strip_own, PermissionDefinition, PermissionKey, DEFAULT_NAMESPACE},
};

use crate::traits::{LifecycleListener, MessageResolver, PermissionStore};

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Registry-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Prefix of every permission name (`<namespace>@...`).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// What to do with a personal action on a model without an owner field:
    /// `false` skips that permission, `true` rejects the whole model.
    #[serde(default)]
    pub strict_ownership_registration: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            strict_ownership_registration: false,
        }
    }
}

#[derive(Debug, Clone)]
struct RegisteredModel {
    schema: ModelSchema,
    keys: Vec<PermissionKey>,
}

pub struct PermissionRegistry {
    config: RegistryConfig,
    permissions: Arc<dyn PermissionStore>,
    messages: Arc<dyn MessageResolver>,
    models: RwLock<BTreeMap<String, RegisteredModel>>,
}

impl PermissionRegistry {
    pub fn new(
        config: RegistryConfig,
        permissions: Arc<dyn PermissionStore>,
        messages: Arc<dyn MessageResolver>,
    ) -> Self {
        Self {
            config,
            permissions,
            messages,
            models: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Register `schema` and define its permissions.
    ///
    /// Returns the keys that were defined. Fails with `ConfigError` when the
    /// model's localization package is unknown, when the model is already
    /// registered, when an action is empty, or (strict mode only) when a
    /// personal action is declared on a model without an owner field.
    /// Errors from the permission store are returned as they are.
    pub fn register(&self, schema: &ModelSchema) -> CustosResult<Vec<PermissionKey>> {
        if !self.messages.is_package_registered(&schema.package) {
            return Err(CustosError::ConfigError {
                reason: format!("language package '{}' is not registered", schema.package),
            });
        }

        let mut models = self.models.write().map_err(|e| CustosError::StoreError {
            reason: format!("model registry lock poisoned: {}", e),
        })?;

        if models.contains_key(&schema.name) {
            return Err(CustosError::ConfigError {
                reason: format!("model '{}' is already registered", schema.name),
            });
        }

        let group = schema.permission_group();
        let keys = if group.is_empty() {
            debug!(model = %schema.name, "model has no permission group, defining no permissions");
            Vec::new()
        } else {
            self.derive_keys(schema)?
        };

        for key in &keys {
            let description = self.messages.resolve(&schema.package, &key.message_id());
            self.permissions.define(PermissionDefinition {
                name: key.to_string(),
                description,
                group: group.clone(),
            })?;
        }

        info!(
            model = %schema.name,
            group = %group,
            permissions = keys.len(),
            "registered model permissions"
        );

        models.insert(
            schema.name.clone(),
            RegisteredModel {
                schema: schema.clone(),
                keys: keys.clone(),
            },
        );

        Ok(keys)
    }

    fn derive_keys(&self, schema: &ModelSchema) -> CustosResult<Vec<PermissionKey>> {
        let owner_field = schema.owner_field();
        let mut keys: Vec<PermissionKey> = Vec::with_capacity(schema.actions.len());

        for declared in &schema.actions {
            if strip_own(declared).is_empty() {
                return Err(CustosError::ConfigError {
                    reason: format!("model '{}' declares an empty action", schema.name),
                });
            }

            let key = PermissionKey::from_declared(&self.config.namespace, declared, &schema.name);

            if key.personal && owner_field.is_none() {
                if self.config.strict_ownership_registration {
                    return Err(CustosError::ConfigError {
                        reason: format!(
                            "model '{}' declares personal action '{}' but has no owner field",
                            schema.name, declared
                        ),
                    });
                }
                debug!(
                    model = %schema.name,
                    action = %declared,
                    "skipping personal permission for model without owner field"
                );
                continue;
            }

            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        Ok(keys)
    }

    pub fn is_registered(&self, model: &str) -> bool {
        self.read_models().contains_key(model)
    }

    pub fn schema(&self, model: &str) -> Option<ModelSchema> {
        self.read_models().get(model).map(|m| m.schema.clone())
    }

    /// Keys defined for `model` at registration, in declaration order.
    pub fn permission_keys(&self, model: &str) -> Vec<PermissionKey> {
        self.read_models()
            .get(model)
            .map(|m| m.keys.clone())
            .unwrap_or_default()
    }

    /// Every owner field of every registered model, as `(model, field)`.
    /// A model declaring both `author` and `owner` appears twice.
    pub fn owner_capable_models(&self) -> Vec<(String, &'static str)> {
        self.read_models()
            .values()
            .flat_map(|m| m.schema.owner_fields().map(move |f| (m.schema.name.clone(), f)))
            .collect()
    }

    fn read_models(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, RegisteredModel>> {
        // Entries are inserted whole, so a poisoned map is still consistent.
        self.models.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LifecycleListener for PermissionRegistry {
    fn on_register(&self, schema: &ModelSchema) -> CustosResult<()> {
        self.register(schema).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use custos_contracts::{
        error::{CustosError, CustosResult},
        model::ModelSchema,
        permission::{PermissionDefinition, PermissionKey},
    };

    use crate::testing::{MockMessages, MockPermissions};
    use crate::traits::PermissionStore;

    use super::{PermissionRegistry, RegistryConfig};

    fn registry(strict: bool) -> (PermissionRegistry, Arc<MockPermissions>) {
        let permissions = Arc::new(MockPermissions::default());
        let registry = PermissionRegistry::new(
            RegistryConfig {
                strict_ownership_registration: strict,
                ..RegistryConfig::default()
            },
            permissions.clone(),
            Arc::new(MockMessages::with_packages(&["plugins.docs"])),
        );
        (registry, permissions)
    }

    fn doc() -> ModelSchema {
        ModelSchema::new("doc", "plugins.docs")
            .with_fields(&["title", "author"])
            .with_actions(&["create", "modify", "delete", "modify_own", "delete_own"])
    }

    fn tag() -> ModelSchema {
        ModelSchema::new("tag", "plugins.docs")
            .with_fields(&["title"])
            .with_actions(&["create", "modify", "modify_own"])
    }

    #[test]
    fn defines_every_declared_permission() {
        let (registry, permissions) = registry(false);
        let keys = registry.register(&doc()).unwrap();

        let names: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "odm_auth@create.doc",
                "odm_auth@modify.doc",
                "odm_auth@delete.doc",
                "odm_auth@modify_own.doc",
                "odm_auth@delete_own.doc",
            ]
        );
        for name in &names {
            assert!(permissions.is_defined(name), "{name} should be defined");
        }
    }

    #[test]
    fn definitions_carry_group_and_resolved_description() {
        let (registry, permissions) = registry(false);
        registry.register(&doc()).unwrap();

        let defs = permissions.definitions();
        let modify_own = defs
            .iter()
            .find(|d| d.name == "odm_auth@modify_own.doc")
            .unwrap();
        assert_eq!(modify_own.group, "docs");
        assert_eq!(modify_own.description, "plugins.docs@odm_auth_modify_own_doc");
    }

    #[test]
    fn lenient_mode_skips_personal_permissions_without_owner_field() {
        let (registry, permissions) = registry(false);
        let keys = registry.register(&tag()).unwrap();

        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| !k.personal));
        assert!(!permissions.is_defined("odm_auth@modify_own.tag"));
        assert!(registry.is_registered("tag"));
    }

    #[test]
    fn strict_mode_rejects_model_and_defines_nothing() {
        let (registry, permissions) = registry(true);

        match registry.register(&tag()) {
            Err(CustosError::ConfigError { reason }) => {
                assert!(reason.contains("no owner field"), "{reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
        assert!(permissions.definitions().is_empty());
        assert!(!registry.is_registered("tag"));
    }

    #[test]
    fn strict_mode_accepts_owner_capable_model() {
        let (registry, _) = registry(true);
        assert_eq!(registry.register(&doc()).unwrap().len(), 5);
    }

    #[test]
    fn unknown_language_package_is_fatal() {
        let (registry, permissions) = registry(false);
        let schema = ModelSchema::new("post", "plugins.blog").with_fields(&["author"]);

        match registry.register(&schema) {
            Err(CustosError::ConfigError { reason }) => {
                assert!(reason.contains("plugins.blog"), "{reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
        assert!(permissions.definitions().is_empty());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (registry, _) = registry(false);
        registry.register(&doc()).unwrap();
        assert!(matches!(
            registry.register(&doc()),
            Err(CustosError::ConfigError { .. })
        ));
    }

    #[test]
    fn empty_group_registers_model_without_permissions() {
        let (registry, permissions) = registry(false);
        let keys = registry.register(&doc().with_group("")).unwrap();

        assert!(keys.is_empty());
        assert!(permissions.definitions().is_empty());
        assert!(registry.is_registered("doc"));
    }

    #[test]
    fn custom_namespace_flows_into_names() {
        let permissions = Arc::new(MockPermissions::default());
        let registry = PermissionRegistry::new(
            RegistryConfig {
                namespace: "cms".to_string(),
                strict_ownership_registration: false,
            },
            permissions.clone(),
            Arc::new(MockMessages::with_packages(&["plugins.docs"])),
        );
        registry.register(&doc()).unwrap();
        assert!(permissions.is_defined("cms@modify_own.doc"));
        assert!(!permissions.is_defined("odm_auth@modify_own.doc"));
    }

    #[test]
    fn owner_capable_models_lists_owner_field() {
        let (registry, _) = registry(false);
        registry.register(&doc()).unwrap();
        registry.register(&tag()).unwrap();
        registry
            .register(&ModelSchema::new("page", "plugins.docs").with_fields(&["owner", "author"]))
            .unwrap();

        assert_eq!(
            registry.owner_capable_models(),
            vec![
                ("doc".to_string(), "author"),
                ("page".to_string(), "author"),
                ("page".to_string(), "owner"),
            ]
        );
        assert_eq!(
            registry.permission_keys("doc")[0],
            PermissionKey::global("odm_auth", "create", "doc")
        );
    }

    /// Accepts a fixed number of definitions, then fails.
    struct FailingPermissions {
        inner: MockPermissions,
        remaining: Mutex<usize>,
    }

    impl PermissionStore for FailingPermissions {
        fn define(&self, definition: PermissionDefinition) -> CustosResult<()> {
            let mut remaining = self.remaining.lock().unwrap();
            if *remaining == 0 {
                return Err(CustosError::StoreError {
                    reason: format!("cannot write {}", definition.name),
                });
            }
            *remaining -= 1;
            self.inner.define(definition)
        }

        fn is_defined(&self, name: &str) -> bool {
            self.inner.is_defined(name)
        }

        fn definitions(&self) -> Vec<PermissionDefinition> {
            self.inner.definitions()
        }
    }

    #[test]
    fn store_failure_while_defining_leaves_model_unregistered() {
        let permissions = Arc::new(FailingPermissions {
            inner: MockPermissions::default(),
            remaining: Mutex::new(2),
        });
        let registry = PermissionRegistry::new(
            RegistryConfig::default(),
            permissions.clone(),
            Arc::new(MockMessages::with_packages(&["plugins.docs"])),
        );

        match registry.register(&doc()) {
            Err(CustosError::StoreError { reason }) => {
                assert!(reason.contains("odm_auth@delete.doc"));
            }
            other => panic!("expected StoreError, got {:?}", other),
        }
        assert!(!registry.is_registered("doc"));
        assert!(registry.permission_keys("doc").is_empty());
        assert!(registry.owner_capable_models().is_empty());
        // Definitions written before the failure are not rolled back.
        assert_eq!(permissions.definitions().len(), 2);
    }
}
