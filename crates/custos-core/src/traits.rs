//! Collaborator trait definitions for the Custos authorization core.
//!
//! The core owns no storage. Everything it reads or writes goes through the
//! traits below, implemented by the hosting application:
//!
//! - `OwnedEntity`      : capability interface of an entity instance
//! - `PrincipalStore`   : principal lookup and the fallback owner
//! - `EntityStore`      : entity lookup, owner search, single-field save
//! - `PermissionStore`  : permission-definition registry
//! - `MessageResolver`  : localization packages and descriptions
//! - `HookDispatcher`   : lifecycle event fan-out
//! - `LifecycleListener`: receiver side of the dispatcher
//! - `AuditWriter`      : sink for decision records

use std::sync::Arc;

use serde_json::Value;

use custos_contracts::{
    decision::DecisionRecord,
    entity::{EntityId, EntityRef},
    error::CustosResult,
    model::ModelSchema,
    permission::PermissionDefinition,
    principal::{Principal, PrincipalId},
};

use crate::context::SecurityContext;

/// What the core needs to know about an entity instance.
///
/// Any entity type gains ownership-aware authorization by implementing this
/// trait; the evaluator and guard never depend on a concrete entity type.
pub trait OwnedEntity {
    fn model_name(&self) -> &str;

    /// Persisted id, or `None` before the first save.
    fn entity_id(&self) -> Option<&EntityId>;

    /// True until the entity has been persisted once.
    fn is_new(&self) -> bool;

    fn has_field(&self, field: &str) -> bool;

    fn field_get(&self, field: &str) -> Option<Value>;

    fn field_set(&mut self, field: &str, value: Value);

    /// Raw owner reference stored in `field`, without resolving it.
    fn owner_ref(&self, field: &str) -> Option<PrincipalId> {
        self.field_get(field)?.as_str().map(PrincipalId::new)
    }

    fn set_owner(&mut self, field: &str, owner: &PrincipalId) {
        self.field_set(field, Value::String(owner.0.clone()));
    }

    fn entity_ref(&self) -> Option<EntityRef> {
        self.entity_id()
            .map(|id| EntityRef::new(self.model_name(), id.clone()))
    }
}

/// Read access to principals.
pub trait PrincipalStore: Send + Sync {
    /// Look up a principal.
    ///
    /// Must return `CustosError::PrincipalNotFound` when the id is unknown;
    /// the ownership resolver relies on that variant to detect a dangling
    /// owner reference.
    fn get(&self, id: &PrincipalId) -> CustosResult<Principal>;

    /// The principal that inherits entities whose owner no longer exists.
    /// Conventionally the first administrative principal.
    fn fallback_owner(&self) -> CustosResult<Option<Principal>>;

    /// The principal used for scoped privilege elevation.
    fn system_principal(&self) -> Principal {
        Principal::system()
    }
}

/// Access to stored entities.
pub trait EntityStore: Send + Sync {
    /// Load an entity. `Ok(None)` if it does not exist.
    fn dispense(&self, model: &str, id: &EntityId) -> CustosResult<Option<Box<dyn OwnedEntity>>>;

    /// Ids of the `model` entities whose `field` references `owner`.
    fn find_by_field(
        &self,
        model: &str,
        field: &str,
        owner: &PrincipalId,
    ) -> CustosResult<Vec<EntityId>>;

    /// Persist the current value of a single field of a stored entity.
    ///
    /// Hosts that fire lifecycle hooks on save must pass `ctx` through so
    /// guards see the acting principal (possibly elevated).
    fn save_field(
        &self,
        ctx: &SecurityContext,
        entity: &dyn OwnedEntity,
        field: &str,
    ) -> CustosResult<()>;
}

/// The external permission-definition registry.
pub trait PermissionStore: Send + Sync {
    fn define(&self, definition: PermissionDefinition) -> CustosResult<()>;

    fn is_defined(&self, name: &str) -> bool;

    fn definitions(&self) -> Vec<PermissionDefinition>;
}

/// Localization lookups, used only at model-registration time.
pub trait MessageResolver: Send + Sync {
    fn is_package_registered(&self, package: &str) -> bool;

    /// Resolve `key` within `package` to a human-readable message.
    fn resolve(&self, package: &str, key: &str) -> String;
}

/// Receiver of lifecycle events. Every method defaults to "allow".
///
/// Returning an error from a `pre_*` callback aborts the mutation that
/// triggered it.
pub trait LifecycleListener: Send + Sync {
    fn on_register(&self, _schema: &ModelSchema) -> CustosResult<()> {
        Ok(())
    }

    fn on_pre_save(&self, _ctx: &SecurityContext, _entity: &dyn OwnedEntity) -> CustosResult<()> {
        Ok(())
    }

    fn on_pre_delete(&self, _ctx: &SecurityContext, _entity: &dyn OwnedEntity) -> CustosResult<()> {
        Ok(())
    }

    fn on_pre_delete_principal(
        &self,
        _ctx: &SecurityContext,
        _principal: &PrincipalId,
    ) -> CustosResult<()> {
        Ok(())
    }
}

/// Fan-out of lifecycle events to subscribed listeners.
pub trait HookDispatcher: Send + Sync {
    /// Subscribe a listener. Implementations may keep only a weak handle,
    /// in which case the caller keeps the listener alive.
    fn subscribe(&self, listener: Arc<dyn LifecycleListener>);
}

/// Sink for authorization decisions.
///
/// A failed write fails the decision it records: a guard that cannot audit
/// its decision does not let the mutation proceed.
pub trait AuditWriter: Send + Sync {
    fn write(&self, record: &DecisionRecord) -> CustosResult<()>;
}
