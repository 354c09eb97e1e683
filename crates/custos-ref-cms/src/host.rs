//! The reference CMS host.
//!
//! Wires the authorization core into an application the way a real host
//! would:
//!
//!   policy TOML → stores → registry → evaluator → guard → hooks → models
//!
//! Models are declared through the entity store after the guard is
//! subscribed, so their permissions are defined by the registry's register
//! hook.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use custos_audit::InMemoryAuditWriter;
use custos_contracts::{
    entity::EntityId,
    error::CustosResult,
    principal::PrincipalId,
};
use custos_core::traits::PrincipalStore;
use custos_core::{
    LifecycleGuard, OwnershipResolver, PermissionEvaluator, PermissionRegistry, SecurityContext,
};
use custos_memory::{
    Document, HookRegistry, InMemoryEntityStore, InMemoryPermissionStore, InMemoryPrincipalStore,
};
use custos_policy::AuthzPolicy;

use crate::mock_data;

/// The bundled CMS policy.
pub const CMS_POLICY: &str = include_str!("../policies/cms.toml");

pub struct CmsHost {
    policy: AuthzPolicy,
    hooks: Arc<HookRegistry>,
    principals: Arc<InMemoryPrincipalStore>,
    entities: Arc<InMemoryEntityStore>,
    permissions: Arc<InMemoryPermissionStore>,
    audit: Arc<InMemoryAuditWriter>,
    guard: Arc<LifecycleGuard>,
}

impl CmsHost {
    /// A host running the bundled policy.
    pub fn new() -> CustosResult<Self> {
        Self::from_policy(AuthzPolicy::from_toml_str(CMS_POLICY)?)
    }

    /// A host running `policy`, seeded with the fixture principals.
    pub fn from_policy(policy: AuthzPolicy) -> CustosResult<Self> {
        let config = policy.registry_config();

        let hooks = Arc::new(HookRegistry::new());
        let principals = Arc::new(InMemoryPrincipalStore::new(hooks.clone()));
        let entities = Arc::new(InMemoryEntityStore::new(hooks.clone()));
        let permissions = Arc::new(InMemoryPermissionStore::new());
        let audit = Arc::new(InMemoryAuditWriter::new(format!(
            "cms-{}",
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        )));
        let messages = Arc::new(mock_data::message_catalogue(&config.namespace));

        let registry = Arc::new(PermissionRegistry::new(config, permissions.clone(), messages));
        let ownership = OwnershipResolver::new(principals.clone(), entities.clone(), audit.clone());
        let evaluator = Arc::new(PermissionEvaluator::new(
            registry.namespace(),
            permissions.clone(),
            entities.clone(),
            ownership,
        ));
        let guard = Arc::new(LifecycleGuard::new(
            registry.clone(),
            evaluator,
            entities.clone(),
            audit.clone(),
        ));
        guard.register_hooks(hooks.as_ref());

        for principal in mock_data::principals(registry.namespace()) {
            principals.insert(principal)?;
        }
        for schema in &policy.models {
            entities.register_model(schema)?;
        }

        info!(
            log_id = %audit.log_id(),
            models = policy.models.len(),
            "cms host ready"
        );

        Ok(Self {
            policy,
            hooks,
            principals,
            entities,
            permissions,
            audit,
            guard,
        })
    }

    pub fn policy(&self) -> &AuthzPolicy {
        &self.policy
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn principals(&self) -> &InMemoryPrincipalStore {
        &self.principals
    }

    pub fn entities(&self) -> &InMemoryEntityStore {
        &self.entities
    }

    pub fn permissions(&self) -> &InMemoryPermissionStore {
        &self.permissions
    }

    pub fn audit(&self) -> &InMemoryAuditWriter {
        &self.audit
    }

    pub fn registry(&self) -> &PermissionRegistry {
        self.guard.registry()
    }

    pub fn evaluator(&self) -> &PermissionEvaluator {
        self.guard.evaluator()
    }

    /// A request context acting as the principal `id`.
    pub fn session(&self, id: &str) -> CustosResult<SecurityContext> {
        Ok(SecurityContext::new(self.principals.get(&PrincipalId::new(id))?))
    }

    /// Create and save a document authored by the acting principal.
    pub fn write_doc(&self, ctx: &SecurityContext, title: &str, body: &str) -> CustosResult<Document> {
        let mut doc = self.entities.create("doc")?;
        doc.set("title", title)
            .set("body", body)
            .set("author", ctx.current().id.as_str());
        self.entities.save(ctx, &mut doc)?;
        Ok(doc)
    }

    /// Store a document as a data import would: no hooks, no checks, and
    /// `author` taken verbatim.
    pub fn import_doc(&self, id: &str, title: &str, author: &str) -> CustosResult<Document> {
        let mut doc = self.entities.create("doc")?;
        doc.set("title", title).set("author", author);
        self.entities.seed(doc, EntityId::new(id))
    }

    /// One-line audit summary for scenario output.
    pub fn audit_summary(&self) -> String {
        let log = self.audit.export_log();
        format!(
            "{} ({} decision(s), {} denied)",
            if self.audit.verify_integrity() { "VERIFIED" } else { "FAILED" },
            log.events.len(),
            log.denial_count()
        )
    }
}
