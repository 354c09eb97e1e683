//! In-memory permission-definition store.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use custos_contracts::{
    error::{CustosError, CustosResult},
    permission::PermissionDefinition,
};
use custos_core::traits::PermissionStore;

/// Permission definitions keyed by name. Redefining a name replaces it.
#[derive(Default)]
pub struct InMemoryPermissionStore {
    definitions: RwLock<BTreeMap<String, PermissionDefinition>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<PermissionDefinition> {
        self.read().get(name).cloned()
    }

    /// Definitions in `group`, sorted by name.
    pub fn by_group(&self, group: &str) -> Vec<PermissionDefinition> {
        self.read()
            .values()
            .filter(|d| d.group == group)
            .cloned()
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, PermissionDefinition>> {
        self.definitions.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PermissionStore for InMemoryPermissionStore {
    fn define(&self, definition: PermissionDefinition) -> CustosResult<()> {
        let mut definitions = self.definitions.write().map_err(|e| CustosError::StoreError {
            reason: format!("permission store lock poisoned: {}", e),
        })?;
        debug!(permission = %definition.name, group = %definition.group, "permission defined");
        definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    fn is_defined(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// All definitions, sorted by name.
    fn definitions(&self) -> Vec<PermissionDefinition> {
        self.read().values().cloned().collect()
    }
}
