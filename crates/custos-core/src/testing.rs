//! Mock collaborators shared by the core's unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use custos_contracts::{
    decision::DecisionRecord,
    entity::EntityId,
    error::{CustosError, CustosResult},
    model::ModelSchema,
    permission::PermissionDefinition,
    principal::{Principal, PrincipalId, Role},
};

use crate::context::SecurityContext;
use crate::evaluator::PermissionEvaluator;
use crate::guard::LifecycleGuard;
use crate::ownership::OwnershipResolver;
use crate::registry::{PermissionRegistry, RegistryConfig};
use crate::traits::{
    AuditWriter, EntityStore, HookDispatcher, LifecycleListener, MessageResolver, OwnedEntity,
    PermissionStore, PrincipalStore,
};

// ── Entities ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MockEntity {
    model: String,
    id: Option<EntityId>,
    fields: Vec<String>,
    values: BTreeMap<String, Value>,
}

impl MockEntity {
    pub fn new_entity(model: &str, fields: &[&str]) -> Self {
        Self {
            model: model.to_string(),
            id: None,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            values: BTreeMap::new(),
        }
    }

    pub fn persisted(model: &str, id: &str, fields: &[&str]) -> Self {
        Self {
            id: Some(EntityId::new(id)),
            ..Self::new_entity(model, fields)
        }
    }
}

impl OwnedEntity for MockEntity {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn entity_id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn is_new(&self) -> bool {
        self.id.is_none()
    }

    fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    fn field_get(&self, field: &str) -> Option<Value> {
        self.values.get(field).cloned()
    }

    fn field_set(&mut self, field: &str, value: Value) {
        self.values.insert(field.to_string(), value);
    }
}

/// Entity store recording every write and every owner scan.
#[derive(Default)]
pub struct MockEntities {
    rows: Mutex<BTreeMap<(String, EntityId), MockEntity>>,
    writes: Mutex<Vec<Arc<Principal>>>,
    scanned: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
}

impl MockEntities {
    pub fn insert(&self, entity: MockEntity) {
        let id = entity.id.clone().expect("mock rows must be persisted");
        self.rows
            .lock()
            .unwrap()
            .insert((entity.model.clone(), id), entity);
    }

    pub fn load(&self, model: &str, id: &str) -> MockEntity {
        self.rows
            .lock()
            .unwrap()
            .get(&(model.to_string(), EntityId::new(id)))
            .cloned()
            .expect("mock row exists")
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// The acting principal of each write, in order.
    pub fn saved_as(&self) -> Vec<Arc<Principal>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn scanned_models(&self) -> Vec<String> {
        self.scanned.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl EntityStore for MockEntities {
    fn dispense(&self, model: &str, id: &EntityId) -> CustosResult<Option<Box<dyn OwnedEntity>>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(model.to_string(), id.clone()))
            .cloned()
            .map(|e| Box::new(e) as Box<dyn OwnedEntity>))
    }

    fn find_by_field(
        &self,
        model: &str,
        field: &str,
        owner: &PrincipalId,
    ) -> CustosResult<Vec<EntityId>> {
        self.scanned.lock().unwrap().push(model.to_string());
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.model == model && e.owner_ref(field).as_ref() == Some(owner))
            .filter_map(|e| e.id.clone())
            .collect())
    }

    fn save_field(
        &self,
        ctx: &SecurityContext,
        entity: &dyn OwnedEntity,
        field: &str,
    ) -> CustosResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CustosError::StoreError {
                reason: "mock write failure".to_string(),
            });
        }

        let id = entity.entity_id().cloned().ok_or_else(|| CustosError::StoreError {
            reason: "cannot save a field of a new entity".to_string(),
        })?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&(entity.model_name().to_string(), id))
            .ok_or_else(|| CustosError::StoreError {
                reason: "row vanished".to_string(),
            })?;
        if let Some(value) = entity.field_get(field) {
            row.field_set(field, value);
        }
        self.writes.lock().unwrap().push(ctx.current());
        Ok(())
    }
}

// ── Principals ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPrincipals {
    principals: Mutex<Vec<Principal>>,
}

impl MockPrincipals {
    pub fn insert(&self, principal: Principal) {
        let mut principals = self.principals.lock().unwrap();
        principals.retain(|p| p.id != principal.id);
        principals.push(principal);
    }

    pub fn remove(&self, id: &str) {
        self.principals.lock().unwrap().retain(|p| p.id.0 != id);
    }
}

impl PrincipalStore for MockPrincipals {
    fn get(&self, id: &PrincipalId) -> CustosResult<Principal> {
        self.principals
            .lock()
            .unwrap()
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| CustosError::PrincipalNotFound { id: id.to_string() })
    }

    fn fallback_owner(&self) -> CustosResult<Option<Principal>> {
        Ok(self
            .principals
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.is_admin())
            .cloned())
    }
}

// ── Permissions, messages, audit, hooks ──────────────────────────────────────

#[derive(Default)]
pub struct MockPermissions {
    defined: Mutex<Vec<PermissionDefinition>>,
}

impl PermissionStore for MockPermissions {
    fn define(&self, definition: PermissionDefinition) -> CustosResult<()> {
        let mut defined = self.defined.lock().unwrap();
        defined.retain(|d| d.name != definition.name);
        defined.push(definition);
        Ok(())
    }

    fn is_defined(&self, name: &str) -> bool {
        self.defined.lock().unwrap().iter().any(|d| d.name == name)
    }

    fn definitions(&self) -> Vec<PermissionDefinition> {
        self.defined.lock().unwrap().clone()
    }
}

pub struct MockMessages {
    packages: Vec<String>,
}

impl MockMessages {
    pub fn with_packages(packages: &[&str]) -> Self {
        Self {
            packages: packages.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl MessageResolver for MockMessages {
    fn is_package_registered(&self, package: &str) -> bool {
        self.packages.iter().any(|p| p == package)
    }

    fn resolve(&self, package: &str, key: &str) -> String {
        format!("{}@{}", package, key)
    }
}

#[derive(Default)]
pub struct MockAudit {
    records: Mutex<Vec<DecisionRecord>>,
    fail: AtomicBool,
}

impl MockAudit {
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl AuditWriter for MockAudit {
    fn write(&self, record: &DecisionRecord) -> CustosResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CustosError::StoreError {
                reason: "mock audit failure".to_string(),
            });
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockDispatcher {
    listeners: Mutex<Vec<Arc<dyn LifecycleListener>>>,
}

impl MockDispatcher {
    pub fn listeners(&self) -> Vec<Arc<dyn LifecycleListener>> {
        self.listeners.lock().unwrap().clone()
    }
}

impl HookDispatcher for MockDispatcher {
    fn subscribe(&self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.lock().unwrap().push(listener);
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

/// Fully wired core over mock collaborators.
///
/// Seeded principals: `a1` root (admin, the fallback owner), `u1` alice and
/// `u2` bob (regular, no grants).
pub struct Harness {
    pub principals: Arc<MockPrincipals>,
    pub entities: Arc<MockEntities>,
    pub permissions: Arc<MockPermissions>,
    pub audit: Arc<MockAudit>,
    pub registry: Arc<PermissionRegistry>,
    pub evaluator: Arc<PermissionEvaluator>,
    pub guard: Arc<LifecycleGuard>,
}

impl Harness {
    /// No models registered.
    pub fn empty() -> Self {
        Self::build(false)
    }

    /// With the `doc` model registered: fields `title`, `author`; actions
    /// create, modify, delete, modify_own, delete_own.
    pub fn new(strict: bool) -> Self {
        let h = Self::build(strict);
        h.registry
            .register(
                &ModelSchema::new("doc", "plugins.docs")
                    .with_fields(&["title", "author"])
                    .with_actions(&["create", "modify", "delete", "modify_own", "delete_own"]),
            )
            .expect("doc model registers");
        h
    }

    fn build(strict: bool) -> Self {
        let principals = Arc::new(MockPrincipals::default());
        principals.insert(Principal::new("a1", "root", Role::Admin));
        principals.insert(Principal::new("u1", "alice", Role::Regular));
        principals.insert(Principal::new("u2", "bob", Role::Regular));

        let entities = Arc::new(MockEntities::default());
        let permissions = Arc::new(MockPermissions::default());
        let audit = Arc::new(MockAudit::default());

        let registry = Arc::new(PermissionRegistry::new(
            RegistryConfig {
                strict_ownership_registration: strict,
                ..RegistryConfig::default()
            },
            permissions.clone(),
            Arc::new(MockMessages::with_packages(&["plugins.docs"])),
        ));

        let ownership = OwnershipResolver::new(principals.clone(), entities.clone(), audit.clone());
        let evaluator = Arc::new(PermissionEvaluator::new(
            registry.namespace(),
            permissions.clone(),
            entities.clone(),
            ownership,
        ));
        let guard = Arc::new(LifecycleGuard::new(
            registry.clone(),
            evaluator.clone(),
            entities.clone(),
            audit.clone(),
        ));

        Self {
            principals,
            entities,
            permissions,
            audit,
            registry,
            evaluator,
            guard,
        }
    }

    pub fn ownership(&self) -> &OwnershipResolver {
        self.evaluator.ownership()
    }

    /// Add a regular principal holding `grants` and return it.
    pub fn regular(&self, id: &str, grants: &[&str]) -> Principal {
        let mut principal = Principal::new(id, id, Role::Regular);
        for grant in grants {
            principal.grant(*grant);
        }
        self.principals.insert(principal.clone());
        principal
    }

    /// Store a persisted `doc` authored by `author` and return a copy.
    pub fn stored_doc(&self, id: &str, author: &str) -> MockEntity {
        let mut doc = MockEntity::persisted("doc", id, &["title", "author"]);
        doc.field_set("title", Value::String(format!("Document {}", id)));
        doc.set_owner("author", &PrincipalId::new(author));
        self.entities.insert(doc.clone());
        doc
    }
}
