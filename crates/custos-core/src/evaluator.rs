//! Two-tier permission evaluation.
//!
//! Evaluation algorithm for one principal and one action:
//!
//! 1. Admin, developer, and system principals are allowed outright.
//! 2. The global permission (`ns@action.model`) is tested: it must be both
//!    defined and granted. A granted global permission always wins.
//! 3. For entity checks only, the personal permission (`ns@action_own.model`)
//!    is tested, and if granted the stored entity's owner is compared to the
//!    principal.
//!
//! An action set is granted iff any member is granted.

use std::sync::Arc;

use tracing::debug;

use custos_contracts::{
    entity::EntityId,
    error::{CustosError, CustosResult},
    model::OWNER_FIELDS,
    permission::{is_personal_action, ActionQuery, PermissionKey, OWN_SUFFIX},
    principal::Principal,
};

use crate::context::SecurityContext;
use crate::ownership::OwnershipResolver;
use crate::traits::{EntityStore, OwnedEntity, PermissionStore};

pub struct PermissionEvaluator {
    namespace: String,
    permissions: Arc<dyn PermissionStore>,
    entities: Arc<dyn EntityStore>,
    ownership: OwnershipResolver,
}

impl PermissionEvaluator {
    pub fn new(
        namespace: impl Into<String>,
        permissions: Arc<dyn PermissionStore>,
        entities: Arc<dyn EntityStore>,
        ownership: OwnershipResolver,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            permissions,
            entities,
            ownership,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ownership(&self) -> &OwnershipResolver {
        &self.ownership
    }

    /// Does the principal hold a model-wide permission for any of `actions`?
    ///
    /// `principal` defaults to `ctx.current()`. Personal suffixes are ignored
    /// here: a model-wide check is always a global check.
    pub fn check_model_permission(
        &self,
        ctx: &SecurityContext,
        model: &str,
        actions: impl Into<ActionQuery>,
        principal: Option<&Principal>,
    ) -> bool {
        let current;
        let principal = match principal {
            Some(p) => p,
            None => {
                current = ctx.current();
                current.as_ref()
            }
        };

        if principal.is_exempt() {
            return true;
        }

        let actions: ActionQuery = actions.into();
        let granted = actions
            .iter()
            .any(|action| self.global_grant(model, action, principal));
        if !granted && actions.is_set() {
            debug!(principal = %principal.login, model = %model, actions = ?actions, "no action in the set is granted");
        }
        granted
    }

    /// May the principal perform any of `actions` on `model`, optionally on
    /// the stored entity `entity_id`?
    ///
    /// Without an entity id only global permissions apply. A missing entity
    /// yields `Ok(false)`. An action already ending in `_own` is a caller bug
    /// and yields `ContractViolation`.
    pub fn check_permission(
        &self,
        ctx: &SecurityContext,
        actions: impl Into<ActionQuery>,
        model: &str,
        entity_id: Option<&EntityId>,
        principal: Option<&Principal>,
    ) -> CustosResult<bool> {
        let current;
        let principal = match principal {
            Some(p) => p,
            None => {
                current = ctx.current();
                current.as_ref()
            }
        };

        if principal.is_exempt() {
            return Ok(true);
        }

        let actions: ActionQuery = actions.into();
        if let Some(action) = actions.iter().find(|a| is_personal_action(a)) {
            return Err(CustosError::ContractViolation {
                reason: format!(
                    "action '{}' passed to an entity check already ends in '{}'; \
                     personal permissions are derived by the evaluator",
                    action, OWN_SUFFIX
                ),
            });
        }

        for action in actions.iter() {
            if self.entity_grant(ctx, model, action, entity_id, principal)? {
                return Ok(true);
            }
        }

        if actions.is_set() {
            debug!(principal = %principal.login, model = %model, actions = ?actions, "no action in the set is granted");
        }
        Ok(false)
    }

    /// `check_permission` bound to a loaded entity.
    ///
    /// A new entity has no id and can only pass through global permissions.
    /// A persisted entity is judged by its stored copy, so an unsaved change
    /// to its owner field cannot grant itself access.
    pub fn check_entity_permission(
        &self,
        ctx: &SecurityContext,
        entity: &dyn OwnedEntity,
        actions: impl Into<ActionQuery>,
        principal: Option<&Principal>,
    ) -> CustosResult<bool> {
        let entity_id = if entity.is_new() { None } else { entity.entity_id() };
        self.check_permission(ctx, actions, entity.model_name(), entity_id, principal)
    }

    /// A permission counts only if it is both defined and granted.
    fn grants(&self, principal: &Principal, key: &PermissionKey) -> bool {
        self.permissions.is_defined(&key.to_string()) && principal.holds(key)
    }

    fn global_grant(&self, model: &str, action: &str, principal: &Principal) -> bool {
        let key = PermissionKey::global(&self.namespace, action, model);
        let granted = self.grants(principal, &key);

        debug!(
            principal = %principal.login,
            permission = %key,
            granted,
            "global permission check"
        );

        granted
    }

    fn entity_grant(
        &self,
        ctx: &SecurityContext,
        model: &str,
        action: &str,
        entity_id: Option<&EntityId>,
        principal: &Principal,
    ) -> CustosResult<bool> {
        if self.global_grant(model, action, principal) {
            return Ok(true);
        }

        let Some(entity_id) = entity_id else {
            return Ok(false);
        };

        let key = PermissionKey::personal(&self.namespace, action, model);
        if !self.grants(principal, &key) {
            return Ok(false);
        }

        let Some(mut entity) = self.entities.dispense(model, entity_id)? else {
            debug!(model = %model, id = %entity_id, "entity does not exist");
            return Ok(false);
        };

        for field in OWNER_FIELDS {
            if !entity.has_field(field) {
                continue;
            }
            let owner = self.ownership.resolve_owner(ctx, entity.as_mut(), field)?;
            if owner.is_some_and(|owner| owner.id == principal.id) {
                debug!(
                    principal = %principal.login,
                    permission = %key,
                    entity = %entity_id,
                    "personal permission matched owner"
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use custos_contracts::{
        entity::EntityId,
        error::CustosError,
        model::ModelSchema,
        principal::{Principal, Role},
    };

    use crate::context::SecurityContext;
    use crate::testing::{Harness, MockEntity};
    use crate::traits::OwnedEntity;

    fn ctx(p: &Principal) -> SecurityContext {
        SecurityContext::new(p.clone())
    }

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    // ── Exempt principals ────────────────────────────────────────────────────

    #[test]
    fn exempt_principals_pass_every_check_with_empty_registry() {
        let h = Harness::empty();
        for p in [
            Principal::system(),
            Principal::new("a9", "admin", Role::Admin),
            Principal::new("d9", "dev", Role::Dev),
        ] {
            let c = ctx(&p);
            assert!(h.evaluator.check_model_permission(&c, "anything", "delete", None));
            assert!(h
                .evaluator
                .check_permission(&c, "delete", "anything", Some(&id("nope")), None)
                .unwrap());
            // Even a malformed personal action is allowed for exempt principals.
            assert!(h
                .evaluator
                .check_permission(&c, "delete_own", "anything", None, None)
                .unwrap());
        }
    }

    // ── Model-wide checks ────────────────────────────────────────────────────

    #[test]
    fn model_check_requires_definition_and_grant() {
        let h = Harness::new(false);
        let granted = h.regular("u5", &["odm_auth@modify.doc"]);
        let undefined = h.regular("u6", &["odm_auth@publish.doc"]);
        let c = ctx(&granted);

        assert!(h.evaluator.check_model_permission(&c, "doc", "modify", Some(&granted)));
        assert!(!h.evaluator.check_model_permission(&c, "doc", "delete", Some(&granted)));
        // Granted but never defined.
        assert!(!h.evaluator.check_model_permission(&c, "doc", "publish", Some(&undefined)));
    }

    #[test]
    fn model_check_defaults_to_context_principal() {
        let h = Harness::new(false);
        let alice = h.regular("u5", &["odm_auth@create.doc"]);
        let c = ctx(&alice);

        assert!(h.evaluator.check_model_permission(&c, "doc", "create", None));

        let bob = h.regular("u6", &[]);
        assert!(!h.evaluator.check_model_permission(&c, "doc", "create", Some(&bob)));
    }

    #[test]
    fn model_check_strips_personal_suffix() {
        let h = Harness::new(false);
        let p = h.regular("u5", &["odm_auth@modify.doc"]);
        let c = ctx(&p);

        assert!(h.evaluator.check_model_permission(&c, "doc", "modify_own", None));
    }

    #[test]
    fn model_check_set_is_or_of_members() {
        let h = Harness::new(false);
        let c = ctx(&Principal::new("u0", "nobody", Role::Regular));
        let principals = [
            h.regular("u5", &[]),
            h.regular("u6", &["odm_auth@modify.doc"]),
            h.regular("u7", &["odm_auth@delete.doc"]),
            h.regular("u8", &["odm_auth@modify.doc", "odm_auth@delete.doc"]),
        ];

        for p in &principals {
            let set = h.evaluator.check_model_permission(&c, "doc", ["modify", "delete"], Some(p));
            let a = h.evaluator.check_model_permission(&c, "doc", "modify", Some(p));
            let b = h.evaluator.check_model_permission(&c, "doc", "delete", Some(p));
            assert_eq!(set, a || b, "principal {}", p.login);
        }
    }

    // ── Entity checks ────────────────────────────────────────────────────────

    #[test]
    fn personal_permission_allows_owner_only() {
        let h = Harness::new(false);
        let owner = h.regular("u5", &["odm_auth@modify_own.doc"]);
        let other = h.regular("u6", &[]);
        let other_with_grant = h.regular("u7", &["odm_auth@modify_own.doc"]);
        h.stored_doc("d1", "u5");

        let c = ctx(&owner);
        assert!(h.evaluator.check_permission(&c, "modify", "doc", Some(&id("d1")), Some(&owner)).unwrap());
        assert!(!h.evaluator.check_permission(&c, "modify", "doc", Some(&id("d1")), Some(&other)).unwrap());
        assert!(!h
            .evaluator
            .check_permission(&c, "modify", "doc", Some(&id("d1")), Some(&other_with_grant))
            .unwrap());
        // Personal grant for modify says nothing about delete.
        assert!(!h.evaluator.check_permission(&c, "delete", "doc", Some(&id("d1")), Some(&owner)).unwrap());
    }

    #[test]
    fn global_permission_dominates_ownership() {
        let h = Harness::new(false);
        let p = h.regular("u5", &["odm_auth@delete.doc"]);
        h.stored_doc("d1", "u1");

        let c = ctx(&p);
        assert!(h.evaluator.check_permission(&c, "delete", "doc", Some(&id("d1")), None).unwrap());
        // Global permission is decided without loading the entity.
        assert!(h.evaluator.check_permission(&c, "delete", "doc", Some(&id("missing")), None).unwrap());
    }

    #[test]
    fn own_suffix_is_a_contract_violation() {
        let h = Harness::new(false);
        let p = h.regular("u5", &["odm_auth@modify.doc", "odm_auth@modify_own.doc"]);
        h.stored_doc("d1", "u5");
        let c = ctx(&p);

        for query in [vec!["modify_own"], vec!["modify", "delete_own"]] {
            match h.evaluator.check_permission(&c, query.clone(), "doc", Some(&id("d1")), None) {
                Err(CustosError::ContractViolation { reason }) => {
                    assert!(reason.contains("_own"), "{reason}");
                }
                other => panic!("expected ContractViolation for {:?}, got {:?}", query, other),
            }
        }
    }

    #[test]
    fn missing_entity_is_plain_false() {
        let h = Harness::new(false);
        let p = h.regular("u5", &["odm_auth@modify_own.doc"]);
        let c = ctx(&p);

        assert!(!h.evaluator.check_permission(&c, "modify", "doc", Some(&id("nope")), None).unwrap());
    }

    #[test]
    fn personal_check_without_entity_id_is_false() {
        let h = Harness::new(false);
        let p = h.regular("u5", &["odm_auth@modify_own.doc"]);
        let c = ctx(&p);

        assert!(!h.evaluator.check_permission(&c, "modify", "doc", None, None).unwrap());
    }

    #[test]
    fn model_without_owner_field_has_no_personal_access() {
        let h = Harness::new(false);
        h.registry
            .register(&ModelSchema::new("tag", "plugins.docs").with_fields(&["title"]))
            .unwrap();
        let p = h.regular("u5", &["odm_auth@modify_own.tag"]);
        let mut tag = MockEntity::persisted("tag", "t1", &["title"]);
        tag.field_set("title", serde_json::json!("rust"));
        h.entities.insert(tag);

        let c = ctx(&p);
        assert!(!h.evaluator.check_permission(&c, "modify", "tag", Some(&id("t1")), None).unwrap());
    }

    #[test]
    fn entity_set_is_or_of_members() {
        let h = Harness::new(false);
        let p = h.regular("u5", &["odm_auth@delete_own.doc"]);
        h.stored_doc("d1", "u5");
        let c = ctx(&p);

        assert!(h.evaluator.check_permission(&c, ["modify", "delete"], "doc", Some(&id("d1")), None).unwrap());
        assert!(!h.evaluator.check_permission(&c, ["modify", "create"], "doc", Some(&id("d1")), None).unwrap());
    }

    #[test]
    fn entity_check_uses_stored_owner_not_unsaved_change() {
        let h = Harness::new(false);
        let p = h.regular("u5", &["odm_auth@modify_own.doc"]);
        h.stored_doc("d1", "u1");

        // In-flight change claiming ownership for u5.
        let mut doc = h.entities.load("doc", "d1");
        doc.set_owner("author", &p.id);

        let c = ctx(&p);
        assert!(!h.evaluator.check_entity_permission(&c, &doc, "modify", None).unwrap());
    }

    #[test]
    fn new_entity_passes_only_through_global_permission() {
        let h = Harness::new(false);
        let creator = h.regular("u5", &["odm_auth@create.doc"]);
        let personal_only = h.regular("u6", &["odm_auth@create_own.doc"]);
        let mut doc = MockEntity::new_entity("doc", &["title", "author"]);
        doc.set_owner("author", &personal_only.id);

        let c = ctx(&creator);
        assert!(h.evaluator.check_entity_permission(&c, &doc, "create", None).unwrap());
        assert!(!h.evaluator.check_entity_permission(&c, &doc, "create", Some(&personal_only)).unwrap());
    }

    #[test]
    fn personal_check_corrects_dangling_owner_on_read() {
        let h = Harness::new(false);
        let p = h.regular("u5", &["odm_auth@modify_own.doc"]);
        h.stored_doc("d1", "ghost");
        let c = ctx(&p);

        assert!(!h.evaluator.check_permission(&c, "modify", "doc", Some(&id("d1")), None).unwrap());
        assert_eq!(h.entities.load("doc", "d1").owner_ref("author").unwrap().0, "a1");
        assert_eq!(h.entities.write_count(), 1);

        assert!(!h.evaluator.check_permission(&c, "modify", "doc", Some(&id("d1")), None).unwrap());
        assert_eq!(h.entities.write_count(), 1);
    }
}
