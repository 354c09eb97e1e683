//! In-memory principal store.
//!
//! Principals are kept in insertion order, which defines the fallback owner:
//! the first principal holding the admin role.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::info;

use custos_contracts::{
    error::{CustosError, CustosResult},
    principal::{Principal, PrincipalId, Role},
};
use custos_core::traits::PrincipalStore;
use custos_core::SecurityContext;

use crate::hooks::HookRegistry;

pub struct InMemoryPrincipalStore {
    hooks: Arc<HookRegistry>,
    principals: RwLock<Vec<Principal>>,
}

impl InMemoryPrincipalStore {
    pub fn new(hooks: Arc<HookRegistry>) -> Self {
        Self {
            hooks,
            principals: RwLock::new(Vec::new()),
        }
    }

    /// Add `principal`, or replace the one with the same id in place.
    pub fn insert(&self, principal: Principal) -> CustosResult<()> {
        let mut principals = self.write()?;
        match principals.iter_mut().find(|p| p.id == principal.id) {
            Some(existing) => *existing = principal,
            None => principals.push(principal),
        }
        Ok(())
    }

    /// Grant the permission `name` to an existing principal.
    pub fn grant(&self, id: &PrincipalId, name: &str) -> CustosResult<()> {
        let mut principals = self.write()?;
        let principal = principals
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| CustosError::PrincipalNotFound { id: id.to_string() })?;
        principal.grant(name);
        Ok(())
    }

    pub fn contains(&self, id: &PrincipalId) -> bool {
        self.read().iter().any(|p| &p.id == id)
    }

    pub fn list(&self) -> Vec<Principal> {
        self.read().clone()
    }

    /// Delete a principal after every principal pre-delete hook agreed.
    ///
    /// Hooks run before the store is locked; a veto leaves the principal in
    /// place.
    pub fn delete(&self, ctx: &SecurityContext, id: &PrincipalId) -> CustosResult<()> {
        if !self.contains(id) {
            return Err(CustosError::PrincipalNotFound { id: id.to_string() });
        }

        self.hooks.fire_pre_delete_principal(ctx, id)?;

        self.write()?.retain(|p| &p.id != id);
        info!(principal = %id, by = %ctx.current().id, "principal deleted");
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Principal>> {
        self.principals.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> CustosResult<std::sync::RwLockWriteGuard<'_, Vec<Principal>>> {
        self.principals.write().map_err(|e| CustosError::StoreError {
            reason: format!("principal store lock poisoned: {}", e),
        })
    }
}

impl PrincipalStore for InMemoryPrincipalStore {
    fn get(&self, id: &PrincipalId) -> CustosResult<Principal> {
        self.read()
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| CustosError::PrincipalNotFound { id: id.to_string() })
    }

    fn fallback_owner(&self) -> CustosResult<Option<Principal>> {
        Ok(self.read().iter().find(|p| p.has_role(Role::Admin)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use custos_contracts::{
        error::CustosError,
        principal::{Principal, PrincipalId, Role},
    };
    use custos_core::traits::PrincipalStore;
    use custos_core::SecurityContext;

    use super::InMemoryPrincipalStore;
    use crate::hooks::HookRegistry;

    fn store() -> InMemoryPrincipalStore {
        let store = InMemoryPrincipalStore::new(Arc::new(HookRegistry::new()));
        store.insert(Principal::new("u1", "alice", Role::Regular)).unwrap();
        store.insert(Principal::new("d1", "dev", Role::Dev)).unwrap();
        store.insert(Principal::new("a2", "second-admin", Role::Admin)).unwrap();
        store.insert(Principal::new("a3", "third-admin", Role::Admin)).unwrap();
        store
    }

    #[test]
    fn fallback_owner_is_first_admin() {
        let store = store();
        assert_eq!(store.fallback_owner().unwrap().unwrap().id, PrincipalId::new("a2"));
    }

    #[test]
    fn no_admin_means_no_fallback() {
        let store = InMemoryPrincipalStore::new(Arc::new(HookRegistry::new()));
        store.insert(Principal::new("u1", "alice", Role::Regular)).unwrap();
        assert!(store.fallback_owner().unwrap().is_none());
    }

    #[test]
    fn unknown_principal_is_not_found() {
        let err = store().get(&PrincipalId::new("ghost")).unwrap_err();
        assert!(matches!(err, CustosError::PrincipalNotFound { id } if id == "ghost"));
    }

    #[test]
    fn reinsert_keeps_position() {
        let store = store();
        store.insert(Principal::new("a2", "renamed", Role::Admin)).unwrap();

        let list = store.list();
        assert_eq!(list.len(), 4);
        assert_eq!(list[2].login, "renamed");
    }

    #[test]
    fn grant_adds_permission() {
        let store = store();
        store.grant(&PrincipalId::new("u1"), "odm_auth@create.doc").unwrap();

        let alice = store.get(&PrincipalId::new("u1")).unwrap();
        assert!(alice.has_permission("odm_auth@create.doc"));
        assert!(store.grant(&PrincipalId::new("ghost"), "x").is_err());
    }

    #[test]
    fn delete_removes_principal() {
        let store = store();
        let ctx = SecurityContext::new(Principal::new("a2", "second-admin", Role::Admin));

        store.delete(&ctx, &PrincipalId::new("u1")).unwrap();

        assert!(!store.contains(&PrincipalId::new("u1")));
        assert!(store.delete(&ctx, &PrincipalId::new("u1")).is_err());
    }
}
