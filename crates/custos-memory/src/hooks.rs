//! Lifecycle hook fan-out.
//!
//! `HookRegistry` keeps weak handles to its listeners: subscribing never
//! extends a listener's lifetime, so a guard that holds a store which holds
//! the registry does not leak. Dropped listeners are pruned lazily.
//!
//! Listeners are snapshotted before each event and called with no lock held,
//! so a listener may subscribe, or call back into a store that fires hooks
//! itself.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::trace;

use custos_contracts::{error::CustosResult, model::ModelSchema, principal::PrincipalId};
use custos_core::traits::{HookDispatcher, LifecycleListener, OwnedEntity};
use custos_core::SecurityContext;

#[derive(Default)]
pub struct HookRegistry {
    listeners: RwLock<Vec<Weak<dyn LifecycleListener>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners still alive.
    pub fn listener_count(&self) -> usize {
        self.live().len()
    }

    pub fn fire_register(&self, schema: &ModelSchema) -> CustosResult<()> {
        trace!(model = %schema.name, "firing register");
        self.live().iter().try_for_each(|l| l.on_register(schema))
    }

    pub fn fire_pre_save(&self, ctx: &SecurityContext, entity: &dyn OwnedEntity) -> CustosResult<()> {
        trace!(model = %entity.model_name(), new = entity.is_new(), "firing pre-save");
        self.live().iter().try_for_each(|l| l.on_pre_save(ctx, entity))
    }

    pub fn fire_pre_delete(&self, ctx: &SecurityContext, entity: &dyn OwnedEntity) -> CustosResult<()> {
        trace!(model = %entity.model_name(), "firing pre-delete");
        self.live().iter().try_for_each(|l| l.on_pre_delete(ctx, entity))
    }

    pub fn fire_pre_delete_principal(
        &self,
        ctx: &SecurityContext,
        principal: &PrincipalId,
    ) -> CustosResult<()> {
        trace!(principal = %principal, "firing principal pre-delete");
        self.live()
            .iter()
            .try_for_each(|l| l.on_pre_delete_principal(ctx, principal))
    }

    /// Upgrade every live listener, dropping dead handles.
    fn live(&self) -> Vec<Arc<dyn LifecycleListener>> {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|l| l.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }
}

impl HookDispatcher for HookRegistry {
    fn subscribe(&self, listener: Arc<dyn LifecycleListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&listener));
    }
}
