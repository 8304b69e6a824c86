//! # Storage Errors
//!
//! Classifies raw SQLite failures so the engine can tell a duplicate GST
//! number from a dangling reference or a lost status race.
//!
//! ```text
//!   "UNIQUE constraint failed: dealers.gst_number"
//!        └─► UniqueViolation { field: "gst_number" }
//!   "FOREIGN KEY constraint failed"
//!        └─► ForeignKeyViolation
//!   compare-and-set retries exhausted
//!        └─► Conflict { entity, id }
//!   RowNotFound / zero rows affected
//!        └─► NotFound
//! ```
//!
//! The engine turns these into DUPLICATE, NOT_FOUND and INTERNAL responses.

use thiserror::Error;

/// Failure from the storage layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row with that id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE column rejected the write. `field` is the column name
    /// (`gst_number`, `request_id`); `value` is only known to callers
    /// that supplied it.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Write referenced a dealer, batch, request or invoice that is gone.
    #[error("Referenced row does not exist: {message}")]
    ForeignKeyViolation { message: String },

    /// A compare-and-set update found the row in a different state.
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    #[error("Could not open database: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// CHECK constraints and other statement failures.
    #[error("Statement failed: {0}")]
    QueryFailed(String),

    #[error("Timed out waiting for a database connection")]
    PoolExhausted,

    #[error("Storage error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Returns the violated column when this is a UNIQUE violation.
    pub fn unique_field(&self) -> Option<&str> {
        match self {
            DbError::UniqueViolation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Extracts the column from `"UNIQUE constraint failed: <table>.<column>"`.
fn unique_column(message: &str) -> String {
    message
        .split("UNIQUE constraint failed: ")
        .nth(1)
        .and_then(|target| target.split(',').next())
        .map(|target| {
            let target = target.trim();
            target
                .rsplit_once('.')
                .map_or(target, |(_, column)| column)
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

// SQLite reports constraint kinds only through the message text.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if msg.contains("UNIQUE constraint failed") {
                    DbError::UniqueViolation {
                        field: unique_column(msg),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool already closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_column_parsing() {
        assert_eq!(
            unique_column("UNIQUE constraint failed: dealers.gst_number"),
            "gst_number"
        );
        assert_eq!(
            unique_column("UNIQUE constraint failed: invoices.request_id"),
            "request_id"
        );
        assert_eq!(unique_column("something else"), "unknown");
    }

    #[test]
    fn test_display_and_field() {
        let err = DbError::not_found("ProductBatch", 7);
        assert_eq!(err.to_string(), "ProductBatch not found: 7");
        assert_eq!(err.unique_field(), None);

        let err = DbError::duplicate("invoice_number", "INV-1");
        assert_eq!(err.unique_field(), Some("invoice_number"));
    }
}
