//! Storage-layer error taxonomy.

use thiserror::Error;

use super::schema::PhysicalDatabase;

#[derive(Debug, Error)]
pub enum StorageError {
    /// An operation was invoked outside the READY state, or against an entity type the
    /// router does not know. Not recoverable; the request must be aborted.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// A lookup/delete key does not match the primary-key shape of the entity.
    #[error("invalid lookup key for `{entity}`: {reason}")]
    LookupKeyError { entity: String, reason: String },

    /// The store rejected a staged batch (uniqueness, foreign key, not-null, check).
    /// The whole batch of that session has been discarded.
    #[error("integrity violation in {database} database{}: {message}", .table.as_ref().map(|t| format!(" (table `{}`)", t)).unwrap_or_default())]
    IntegrityViolation {
        database: PhysicalDatabase,
        table: Option<String>,
        message: String,
        /// Offending column/value pairs, when they could be recovered from the store message
        detail: Option<String>,
    },

    #[error("entity `{entity}` has no column `{column}`")]
    UnknownColumn { entity: String, column: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub fn precondition(message: impl Into<String>) -> Self {
        StorageError::PreconditionViolation(message.into())
    }

    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, StorageError::IntegrityViolation { .. })
    }
}

/// True when an sqlx error is a constraint failure the store raised for the current batch.
pub(crate) fn is_constraint_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => !matches!(db_err.kind(), sqlx::error::ErrorKind::Other),
        _ => false,
    }
}

/// Columns named by an SQLite `UNIQUE constraint failed: t.a, t.b` message.
pub(crate) fn unique_violation_columns(message: &str) -> Vec<String> {
    let Some(rest) = message.split("UNIQUE constraint failed:").nth(1) else {
        return Vec::new();
    };
    rest.split(',')
        .filter_map(|qualified| {
            let qualified = qualified.trim();
            let column = qualified.rsplit('.').next()?;
            (!column.is_empty()).then(|| column.to_string())
        })
        .collect()
}
