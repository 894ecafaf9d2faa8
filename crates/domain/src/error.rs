//! Domain error types.

use common::EntityKind;
use ledger_store::StoreError;
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// One or more input fields are missing or malformed.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The targeted record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i64 },

    /// A foreign key target is absent, or a delete is blocked by dependents.
    #[error("{message}")]
    Reference {
        entity: EntityKind,
        id: i64,
        message: String,
    },

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl LedgerError {
    pub(crate) fn not_found(entity: EntityKind, id: impl Into<i64>) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Reference { .. } => "reference_error",
            LedgerError::Store(_) => "internal_error",
        }
    }
}

impl From<ValidationErrors> for LedgerError {
    fn from(errors: ValidationErrors) -> Self {
        LedgerError::Validation(errors)
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            StoreError::MissingReference { entity, id }
            | StoreError::StillReferenced { entity, id, .. } => LedgerError::Reference {
                entity,
                id,
                message: err.to_string(),
            },
            other => LedgerError::Store(other),
        }
    }
}

/// Counts and logs a rejected input before handing back the error.
pub(crate) fn rejected(entity: EntityKind, errors: ValidationErrors) -> LedgerError {
    metrics::counter!("ledger_validation_failures_total", "entity" => entity.as_str())
        .increment(1);
    tracing::debug!(%entity, %errors, "input rejected");
    LedgerError::Validation(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err = LedgerError::from(StoreError::NotFound {
            entity: EntityKind::Order,
            id: 4,
        });

        assert!(matches!(
            err,
            LedgerError::NotFound {
                entity: EntityKind::Order,
                id: 4
            }
        ));
        assert_eq!(err.to_string(), "Order 4 not found");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn store_reference_errors_map_to_reference() {
        let missing = LedgerError::from(StoreError::MissingReference {
            entity: EntityKind::Customer,
            id: 9,
        });
        assert_eq!(missing.kind(), "reference_error");
        assert_eq!(missing.to_string(), "Customer 9 does not exist");

        let blocked = LedgerError::from(StoreError::StillReferenced {
            entity: EntityKind::Product,
            id: 2,
            referenced_by: EntityKind::Order,
        });
        assert_eq!(blocked.kind(), "reference_error");
        assert_eq!(
            blocked.to_string(),
            "Product 2 is still referenced by at least one Order"
        );
    }

    #[test]
    fn validation_kind() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Not a valid email address.");

        let err = LedgerError::from(errors);
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(err.to_string(), "Validation failed: invalid fields: email");
    }
}
