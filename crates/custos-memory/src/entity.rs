//! In-memory entity store and its document type.
//!
//! Every mutation fires the matching lifecycle hooks before the store is
//! locked, and commits only when all listeners agreed:
//!
//!   save (new)        → pre-save → assign id → insert
//!   save (persisted)  → pre-save → replace
//!   save_field        → pre-save → update one field
//!   delete            → pre-delete → remove
//!
//! Hooks may read the store, and the ownership resolver may write a single
//! field through `save_field` from inside a pre-save hook.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use custos_contracts::{
    entity::EntityId,
    error::{CustosError, CustosResult},
    model::ModelSchema,
    principal::PrincipalId,
};
use custos_core::traits::{EntityStore, OwnedEntity};
use custos_core::SecurityContext;

use crate::hooks::HookRegistry;

// ── Document ──────────────────────────────────────────────────────────────────

/// A schemaless entity: a model name, an optional id, and field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    model: String,
    id: Option<EntityId>,
    fields: Vec<String>,
    values: BTreeMap<String, Value>,
}

impl Document {
    fn blank(schema: &ModelSchema) -> Self {
        Self {
            model: schema.name.clone(),
            id: None,
            fields: schema.fields.clone(),
            values: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(Value::as_str)
    }

    /// Set a declared field. Values for undeclared fields are ignored.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        if self.has_field(field) {
            self.values.insert(field.to_string(), value.into());
        }
        self
    }
}

impl OwnedEntity for Document {
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
        self.set(field, value);
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

type Rows = BTreeMap<String, BTreeMap<EntityId, Document>>;

pub struct InMemoryEntityStore {
    hooks: Arc<HookRegistry>,
    schemas: RwLock<BTreeMap<String, ModelSchema>>,
    rows: RwLock<Rows>,
    writes: AtomicUsize,
}

impl InMemoryEntityStore {
    pub fn new(hooks: Arc<HookRegistry>) -> Self {
        Self {
            hooks,
            schemas: RwLock::new(BTreeMap::new()),
            rows: RwLock::new(BTreeMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Declare a model. Register hooks run first; a rejection leaves the
    /// model undeclared.
    pub fn register_model(&self, schema: &ModelSchema) -> CustosResult<()> {
        if self.schema(&schema.name).is_some() {
            return Err(CustosError::ConfigError {
                reason: format!("model '{}' is already declared", schema.name),
            });
        }

        self.hooks.fire_register(schema)?;

        self.schemas
            .write()
            .map_err(poisoned)?
            .insert(schema.name.clone(), schema.clone());
        Ok(())
    }

    pub fn schema(&self, model: &str) -> Option<ModelSchema> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model)
            .cloned()
    }

    /// A new, unsaved document of `model`.
    pub fn create(&self, model: &str) -> CustosResult<Document> {
        self.schema(model)
            .map(|schema| Document::blank(&schema))
            .ok_or_else(|| CustosError::StoreError {
                reason: format!("model '{}' is not declared", model),
            })
    }

    /// Persist `doc`, assigning an id on first save.
    pub fn save(&self, ctx: &SecurityContext, doc: &mut Document) -> CustosResult<EntityId> {
        self.hooks.fire_pre_save(ctx, doc)?;

        let mut rows = self.write_rows()?;
        let id = match &doc.id {
            Some(id) => {
                let exists = rows.get(&doc.model).is_some_and(|t| t.contains_key(id));
                if !exists {
                    return Err(CustosError::StoreError {
                        reason: format!("entity '{}:{}' does not exist", doc.model, id),
                    });
                }
                id.clone()
            }
            None => EntityId::generate(),
        };

        doc.id = Some(id.clone());
        rows.entry(doc.model.clone())
            .or_default()
            .insert(id.clone(), doc.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!(model = %doc.model, id = %id, by = %ctx.current().id, "document saved");
        Ok(id)
    }

    /// The stored copy of a document.
    pub fn load(&self, model: &str, id: &EntityId) -> Option<Document> {
        self.read_rows().get(model)?.get(id).cloned()
    }

    /// Delete a stored document. `Ok(false)` if it does not exist.
    pub fn delete(&self, ctx: &SecurityContext, model: &str, id: &EntityId) -> CustosResult<bool> {
        let Some(doc) = self.load(model, id) else {
            return Ok(false);
        };

        self.hooks.fire_pre_delete(ctx, &doc)?;

        let removed = self
            .write_rows()?
            .get_mut(model)
            .and_then(|t| t.remove(id))
            .is_some();
        if removed {
            self.writes.fetch_add(1, Ordering::SeqCst);
            debug!(model = %model, id = %id, by = %ctx.current().id, "document deleted");
        }
        Ok(removed)
    }

    pub fn count(&self, model: &str) -> usize {
        self.read_rows().get(model).map_or(0, BTreeMap::len)
    }

    /// Number of committed writes (saves, field saves, and deletes).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Store a document as-is, bypassing hooks. For seeding fixtures.
    pub fn seed(&self, mut doc: Document, id: EntityId) -> CustosResult<Document> {
        doc.id = Some(id.clone());
        self.write_rows()?
            .entry(doc.model.clone())
            .or_default()
            .insert(id, doc.clone());
        Ok(doc)
    }

    fn read_rows(&self) -> RwLockReadGuard<'_, Rows> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_rows(&self) -> CustosResult<RwLockWriteGuard<'_, Rows>> {
        self.rows.write().map_err(poisoned)
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> CustosError {
    CustosError::StoreError {
        reason: format!("entity store lock poisoned: {}", e),
    }
}

impl EntityStore for InMemoryEntityStore {
    fn dispense(&self, model: &str, id: &EntityId) -> CustosResult<Option<Box<dyn OwnedEntity>>> {
        Ok(self
            .load(model, id)
            .map(|doc| Box::new(doc) as Box<dyn OwnedEntity>))
    }

    fn find_by_field(
        &self,
        model: &str,
        field: &str,
        owner: &PrincipalId,
    ) -> CustosResult<Vec<EntityId>> {
        Ok(self
            .read_rows()
            .get(model)
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, doc)| doc.owner_ref(field).as_ref() == Some(owner))
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn save_field(
        &self,
        ctx: &SecurityContext,
        entity: &dyn OwnedEntity,
        field: &str,
    ) -> CustosResult<()> {
        let id = entity.entity_id().cloned().ok_or_else(|| CustosError::StoreError {
            reason: format!("cannot save field '{}' of an unsaved entity", field),
        })?;

        self.hooks.fire_pre_save(ctx, entity)?;

        let mut rows = self.write_rows()?;
        let doc = rows
            .get_mut(entity.model_name())
            .and_then(|t| t.get_mut(&id))
            .ok_or_else(|| CustosError::StoreError {
                reason: format!("entity '{}:{}' does not exist", entity.model_name(), id),
            })?;
        match entity.field_get(field) {
            Some(value) => {
                doc.set(field, value);
            }
            None => {
                doc.values.remove(field);
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!(model = %entity.model_name(), id = %id, field, by = %ctx.current().id, "field saved");
        Ok(())
    }
}
