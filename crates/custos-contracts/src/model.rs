//! Model schema declarations.
//!
//! A model is a named entity schema. The core needs three things from it:
//! the package it lives in (for localization and the permission group), the
//! fields it exposes (to detect an owner-capable field), and the actions it
//! supports.

use serde::{Deserialize, Serialize};

use crate::permission::DEFAULT_ACTIONS;

/// Field names that make a model owner-capable, in lookup order.
pub const OWNER_FIELDS: [&str; 2] = ["author", "owner"];

fn default_actions() -> Vec<String> {
    DEFAULT_ACTIONS.iter().map(|a| a.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Model name as used in permission names (`doc`).
    pub name: String,

    /// Dotted package the model is declared in (`plugins.docs`).
    pub package: String,

    /// Explicit permission group. Defaults to the last package segment.
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub fields: Vec<String>,

    /// Declared actions, personal ones carrying the `_own` suffix.
    #[serde(default = "default_actions")]
    pub actions: Vec<String>,
}

impl ModelSchema {
    /// A schema with no fields and the default action set.
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            group: None,
            fields: Vec::new(),
            actions: default_actions(),
        }
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// The first owner-capable field the model declares, if any.
    pub fn owner_field(&self) -> Option<&'static str> {
        self.owner_fields().next()
    }

    /// Every owner-capable field the model declares, in `OWNER_FIELDS` order.
    pub fn owner_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        OWNER_FIELDS.into_iter().filter(|f| self.has_field(f))
    }

    /// Permission group: the explicit override, or the last segment of the
    /// package (`plugins.docs` → `docs`).
    pub fn permission_group(&self) -> String {
        match &self.group {
            Some(group) => group.clone(),
            None => self
                .package
                .rsplit('.')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}
