//! Authorization decision records.
//!
//! `DecisionRecord` is what gets written to the audit log: one per guard
//! decision and one per ownership correction.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::principal::PrincipalId;

/// Which lifecycle boundary produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionKind {
    Create,
    Modify,
    Delete,
    DeletePrincipal,
    /// A dangling owner reference was reassigned to the fallback principal.
    OwnerCorrected,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::DeletePrincipal => "delete-principal",
            Self::OwnerCorrected => "owner-corrected",
        };
        f.write_str(name)
    }
}

/// An immutable record of one authorization decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub kind: DecisionKind,
    /// Model of the target entity, or `"principal"` for principal deletion.
    pub model: String,
    /// Target entity id; absent for entities that were never persisted.
    pub entity_id: Option<String>,
    /// The acting principal at decision time.
    pub principal: PrincipalId,
    pub allowed: bool,
    /// Denial or correction detail. Absent on plain allows.
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn allowed(
        kind: DecisionKind,
        model: impl Into<String>,
        entity_id: Option<String>,
        principal: PrincipalId,
    ) -> Self {
        Self {
            kind,
            model: model.into(),
            entity_id,
            principal,
            allowed: true,
            reason: None,
            timestamp: Utc::now(),
        }
    }

    pub fn denied(
        kind: DecisionKind,
        model: impl Into<String>,
        entity_id: Option<String>,
        principal: PrincipalId,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            ..Self::allowed(kind, model, entity_id, principal)
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
