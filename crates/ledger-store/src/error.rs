use thiserror::Error;

use crate::EntityKind;

/// Errors that can occur when reading or writing ledger records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The targeted record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i64 },

    /// A foreign key points at a record that does not exist.
    #[error("{entity} {id} does not exist")]
    MissingReference { entity: EntityKind, id: i64 },

    /// The record cannot be removed while other records point at it.
    #[error("{entity} {id} is still referenced by at least one {referenced_by}")]
    StillReferenced {
        entity: EntityKind,
        id: i64,
        referenced_by: EntityKind,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn not_found(entity: EntityKind, id: impl Into<i64>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn missing(entity: EntityKind, id: impl Into<i64>) -> Self {
        StoreError::MissingReference {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn still_referenced(
        entity: EntityKind,
        id: impl Into<i64>,
        referenced_by: EntityKind,
    ) -> Self {
        StoreError::StillReferenced {
            entity,
            id: id.into(),
            referenced_by,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
