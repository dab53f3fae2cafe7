use helixfhir_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

pub type Result<T> = std::result::Result<T, PostgresError>;

/// Errors specific to the PostgreSQL backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Database(e) => sqlx_to_storage(e),
            PostgresError::Migration(m) => StorageError::internal(format!("migration: {m}")),
            PostgresError::Config { message } => StorageError::internal(message),
        }
    }
}

/// Map a sqlx error onto the storage taxonomy, keeping the retryable
/// connection failures distinguishable from everything else.
pub fn sqlx_to_storage(err: SqlxError) -> StorageError {
    match err {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
            StorageError::connection(err.to_string())
        }
        SqlxError::RowNotFound => StorageError::internal("row not found"),
        other => StorageError::internal(other.to_string()),
    }
}
