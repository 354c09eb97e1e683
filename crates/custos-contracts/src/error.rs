//! Error types for the Custos authorization core.
//!
//! All fallible operations return `CustosResult<T>`. The variants fall into
//! four families: fatal configuration errors, authorization denials,
//! contract violations (caller bugs), and collaborator failures.

use thiserror::Error;

/// The unified error type for the Custos crates.
#[derive(Debug, Error)]
pub enum CustosError {
    /// Startup configuration is missing or inconsistent.
    ///
    /// Fatal: raised during model registration or ownership correction and
    /// meant to stop the process rather than be handled per request.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The acting principal may not create entities of this model.
    #[error("insufficient permissions to create entities of model '{model}'")]
    CreateForbidden { model: String },

    /// The acting principal may not modify this entity.
    #[error("insufficient permissions to modify entity '{model}:{id}'")]
    ModifyForbidden { model: String, id: String },

    /// The entity may not be deleted.
    ///
    /// `blocked_by` is set when the refusal is referential rather than a
    /// missing permission: a principal (`model` is `"principal"`) that is
    /// still the recorded owner of the `model:id` it names.
    #[error("{}", delete_forbidden_message(.model, .id, .blocked_by))]
    DeleteForbidden {
        model: String,
        id: String,
        blocked_by: Option<String>,
    },

    /// The caller used the API incorrectly. Never a policy outcome.
    #[error("contract violation: {reason}")]
    ContractViolation { reason: String },

    /// The principal store has no principal with this id.
    #[error("principal '{id}' not found")]
    PrincipalNotFound { id: String },

    /// A collaborator store failed.
    #[error("store error: {reason}")]
    StoreError { reason: String },
}

impl CustosError {
    /// True for the authorization-denied family.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::CreateForbidden { .. }
                | Self::ModifyForbidden { .. }
                | Self::DeleteForbidden { .. }
        )
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }
}

fn delete_forbidden_message(model: &str, id: &str, blocked_by: &Option<String>) -> String {
    match blocked_by {
        Some(entity) => format!("{model} '{id}' cannot be deleted: it still owns entity '{entity}'"),
        None => format!("insufficient permissions to delete entity '{model}:{id}'"),
    }
}

/// Convenience alias used throughout the Custos crates.
pub type CustosResult<T> = Result<T, CustosError>;
