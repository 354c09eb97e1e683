//! Owner resolution with dangling-reference correction.
//!
//! Reading an entity's owner normally just looks the referenced principal up.
//! When the principal store reports the owner as gone, the resolver repairs
//! the entity:
//!
//!   fallback owner → elevate to system → set field → save field → restore → re-read
//!
//! The elevation is scoped, so the acting principal is restored even when the
//! save fails. The repair runs at most once per read: if the re-read fails
//! too, the error is returned rather than corrected again. Two readers racing
//! on the same stale entity both write the same fallback, which is harmless.

use std::sync::Arc;

use tracing::{debug, warn};

use custos_contracts::{
    decision::{DecisionKind, DecisionRecord},
    error::{CustosError, CustosResult},
    principal::{Principal, PrincipalId},
};

use crate::context::SecurityContext;
use crate::traits::{AuditWriter, EntityStore, OwnedEntity, PrincipalStore};

pub struct OwnershipResolver {
    principals: Arc<dyn PrincipalStore>,
    entities: Arc<dyn EntityStore>,
    audit: Arc<dyn AuditWriter>,
}

impl OwnershipResolver {
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        entities: Arc<dyn EntityStore>,
        audit: Arc<dyn AuditWriter>,
    ) -> Self {
        Self { principals, entities, audit }
    }

    /// Resolve the principal referenced by `field` on `entity`.
    ///
    /// Returns `Ok(None)` when the field is empty. A persisted entity whose
    /// owner no longer exists is reassigned to the fallback owner and that
    /// principal is returned. Fails with `ConfigError` when no fallback owner
    /// exists.
    pub fn resolve_owner(
        &self,
        ctx: &SecurityContext,
        entity: &mut dyn OwnedEntity,
        field: &str,
    ) -> CustosResult<Option<Principal>> {
        let Some(owner_id) = entity.owner_ref(field) else {
            return Ok(None);
        };

        match self.principals.get(&owner_id) {
            Ok(owner) => Ok(Some(owner)),
            Err(CustosError::PrincipalNotFound { .. }) if !entity.is_new() => {
                self.reassign(ctx, entity, field, &owner_id).map(Some)
            }
            Err(e) => Err(e),
        }
    }

    fn reassign(
        &self,
        ctx: &SecurityContext,
        entity: &mut dyn OwnedEntity,
        field: &str,
        stale: &PrincipalId,
    ) -> CustosResult<Principal> {
        let target = entity
            .entity_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| entity.model_name().to_string());

        let fallback = self.principals.fallback_owner()?.ok_or_else(|| CustosError::ConfigError {
            reason: format!(
                "owner '{}' of entity '{}' no longer exists and no fallback owner is available",
                stale, target
            ),
        })?;

        // The request's own principal, even if the check itself runs elevated.
        let requester = ctx.requester();
        warn!(
            entity = %target,
            field = %field,
            stale_owner = %stale,
            fallback_owner = %fallback.id,
            requester = %requester.login,
            "owner no longer exists, reassigning to fallback owner"
        );

        let system = self.principals.system_principal();
        let system_id = system.id.clone();
        {
            let _scope = ctx.elevate(system);
            entity.set_owner(field, &fallback.id);
            self.entities.save_field(ctx, entity, field)?;
        }

        self.audit.write(
            &DecisionRecord::allowed(
                DecisionKind::OwnerCorrected,
                entity.model_name(),
                entity.entity_id().map(|id| id.to_string()),
                system_id,
            )
            .with_reason(format!(
                "owner '{}' replaced by '{}' while serving '{}'",
                stale, fallback.id, requester.id
            )),
        )?;

        let owner_id = entity.owner_ref(field).ok_or_else(|| CustosError::StoreError {
            reason: format!("field '{}' of entity '{}' is empty after owner correction", field, target),
        })?;

        debug!(entity = %target, owner = %owner_id, "re-reading corrected owner");
        self.principals.get(&owner_id)
    }
}
