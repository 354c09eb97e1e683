//! Lifecycle guards: authorization enforced at mutation time.
//!
//! The guard is subscribed to the host's hook dispatcher and sits in front of
//! every create, modify, and delete of an owned entity, and every deletion of
//! a principal:
//!
//!   pre-save (new)       → `create` check  → `CreateForbidden`
//!   pre-save (persisted) → `modify` check  → `ModifyForbidden`
//!   pre-delete           → `delete` check  → `DeleteForbidden`
//!   pre-delete principal → ownership scan  → `DeleteForbidden` (blocked_by)
//!
//! Guards decide, they do not mutate: the only write that can happen while a
//! guard runs is the owner correction performed by the ownership resolver.
//! Every decision is written to the audit sink before it takes effect.

use std::sync::Arc;

use tracing::{debug, info, warn};

use custos_contracts::{
    decision::{DecisionKind, DecisionRecord},
    error::{CustosError, CustosResult},
    principal::PrincipalId,
};

use crate::context::SecurityContext;
use crate::evaluator::PermissionEvaluator;
use crate::registry::PermissionRegistry;
use crate::traits::{AuditWriter, EntityStore, HookDispatcher, LifecycleListener, OwnedEntity};

/// Model name recorded for principal-deletion decisions.
const PRINCIPAL_MODEL: &str = "principal";

pub struct LifecycleGuard {
    registry: Arc<PermissionRegistry>,
    evaluator: Arc<PermissionEvaluator>,
    entities: Arc<dyn EntityStore>,
    audit: Arc<dyn AuditWriter>,
}

impl LifecycleGuard {
    pub fn new(
        registry: Arc<PermissionRegistry>,
        evaluator: Arc<PermissionEvaluator>,
        entities: Arc<dyn EntityStore>,
        audit: Arc<dyn AuditWriter>,
    ) -> Self {
        Self { registry, evaluator, entities, audit }
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    pub fn evaluator(&self) -> &Arc<PermissionEvaluator> {
        &self.evaluator
    }

    /// Subscribe the registry (model registration) and this guard (entity
    /// and principal mutations) to `dispatcher`. Call once at startup.
    ///
    /// The caller keeps the guard alive; dispatchers may hold it weakly.
    pub fn register_hooks(self: &Arc<Self>, dispatcher: &dyn HookDispatcher) {
        dispatcher.subscribe(Arc::clone(&self.registry) as Arc<dyn LifecycleListener>);
        dispatcher.subscribe(Arc::clone(self) as Arc<dyn LifecycleListener>);
        debug!("lifecycle guard subscribed");
    }

    /// Dispatch a save to the create or modify guard by `is_new`.
    pub fn pre_save(&self, ctx: &SecurityContext, entity: &dyn OwnedEntity) -> CustosResult<()> {
        if entity.is_new() {
            self.pre_create(ctx, entity)
        } else {
            self.pre_modify(ctx, entity)
        }
    }

    pub fn pre_create(&self, ctx: &SecurityContext, entity: &dyn OwnedEntity) -> CustosResult<()> {
        self.guard_entity(ctx, entity, DecisionKind::Create, "create", || {
            CustosError::CreateForbidden {
                model: entity.model_name().to_string(),
            }
        })
    }

    pub fn pre_modify(&self, ctx: &SecurityContext, entity: &dyn OwnedEntity) -> CustosResult<()> {
        self.guard_entity(ctx, entity, DecisionKind::Modify, "modify", || {
            CustosError::ModifyForbidden {
                model: entity.model_name().to_string(),
                id: display_id(entity),
            }
        })
    }

    pub fn pre_delete(&self, ctx: &SecurityContext, entity: &dyn OwnedEntity) -> CustosResult<()> {
        self.guard_entity(ctx, entity, DecisionKind::Delete, "delete", || {
            CustosError::DeleteForbidden {
                model: entity.model_name().to_string(),
                id: display_id(entity),
                blocked_by: None,
            }
        })
    }

    /// Refuse to delete a principal that still owns entities.
    ///
    /// This is a referential-integrity check, so it applies to every actor,
    /// exempt principals included. Every owner field of every owner-capable
    /// model is scanned; the first hit is reported as a `DeleteForbidden`
    /// naming the principal and the blocking entity.
    pub fn pre_delete_principal(
        &self,
        ctx: &SecurityContext,
        principal: &PrincipalId,
    ) -> CustosResult<()> {
        let actor = ctx.current();

        for (model, field) in self.registry.owner_capable_models() {
            let owned = self.entities.find_by_field(&model, field, principal)?;
            let Some(blocking) = owned.into_iter().next() else {
                continue;
            };

            let blocking = format!("{}:{}", model, blocking);
            warn!(
                principal = %principal,
                actor = %actor.login,
                blocking = %blocking,
                field,
                "principal deletion blocked by owned entity"
            );
            let err = CustosError::DeleteForbidden {
                model: PRINCIPAL_MODEL.to_string(),
                id: principal.to_string(),
                blocked_by: Some(blocking),
            };
            self.audit.write(&DecisionRecord::denied(
                DecisionKind::DeletePrincipal,
                PRINCIPAL_MODEL,
                Some(principal.to_string()),
                actor.id.clone(),
                err.to_string(),
            ))?;
            return Err(err);
        }

        self.audit.write(&DecisionRecord::allowed(
            DecisionKind::DeletePrincipal,
            PRINCIPAL_MODEL,
            Some(principal.to_string()),
            actor.id.clone(),
        ))?;
        info!(principal = %principal, actor = %actor.login, "principal owns no entities, deletion allowed");
        Ok(())
    }

    fn guard_entity(
        &self,
        ctx: &SecurityContext,
        entity: &dyn OwnedEntity,
        kind: DecisionKind,
        action: &str,
        forbidden: impl FnOnce() -> CustosError,
    ) -> CustosResult<()> {
        let model = entity.model_name();

        // Only models registered with the registry are owned entities.
        if !self.registry.is_registered(model) {
            return Ok(());
        }

        let actor = ctx.current();
        let entity_id = entity.entity_id().map(|id| id.to_string());

        if actor.is_exempt() {
            debug!(model = %model, decision = %kind, actor = %actor.login, "exempt principal bypasses guard");
            return self.audit.write(
                &DecisionRecord::allowed(kind, model, entity_id, actor.id.clone())
                    .with_reason("exempt principal"),
            );
        }

        if self
            .evaluator
            .check_entity_permission(ctx, entity, action, Some(actor.as_ref()))?
        {
            debug!(model = %model, decision = %kind, actor = %actor.login, "guard allowed");
            return self.audit.write(&DecisionRecord::allowed(
                kind,
                model,
                entity_id,
                actor.id.clone(),
            ));
        }

        let err = forbidden();
        warn!(
            model = %model,
            decision = %kind,
            actor = %actor.login,
            requester = %ctx.requester().login,
            error = %err,
            "guard denied"
        );
        self.audit.write(&DecisionRecord::denied(
            kind,
            model,
            entity_id,
            actor.id.clone(),
            err.to_string(),
        ))?;
        Err(err)
    }
}

fn display_id(entity: &dyn OwnedEntity) -> String {
    entity
        .entity_id()
        .map(|id| id.to_string())
        .unwrap_or_default()
}

impl LifecycleListener for LifecycleGuard {
    fn on_pre_save(&self, ctx: &SecurityContext, entity: &dyn OwnedEntity) -> CustosResult<()> {
        self.pre_save(ctx, entity)
    }

    fn on_pre_delete(&self, ctx: &SecurityContext, entity: &dyn OwnedEntity) -> CustosResult<()> {
        self.pre_delete(ctx, entity)
    }

    fn on_pre_delete_principal(
        &self,
        ctx: &SecurityContext,
        principal: &PrincipalId,
    ) -> CustosResult<()> {
        self.pre_delete_principal(ctx, principal)
    }
}
