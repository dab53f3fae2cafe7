use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    #[error("Version conflict for {resource_type}/{id}: expected {expected}, found {found}")]
    VersionConflict {
        resource_type: String,
        id: String,
        expected: i32,
        found: i32,
    },

    #[error("Resource already exists: {resource_type}/{id}")]
    AlreadyExists { resource_type: String, id: String },

    #[error("Invalid resource: {message}")]
    InvalidResource { message: String },

    #[error("Transaction error: {message}")]
    TransactionError { message: String },

    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal storage error: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn version_conflict(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        expected: i32,
        found: i32,
    ) -> Self {
        Self::VersionConflict {
            resource_type: resource_type.into(),
            id: id.into(),
            expected,
            found,
        }
    }

    #[must_use]
    pub fn already_exists(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether retrying the operation without changes could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError { .. } | Self::TransactionError { .. }
        )
    }

    /// Whether the error is the caller's fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::VersionConflict { .. }
                | Self::AlreadyExists { .. }
                | Self::InvalidResource { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found("Patient", "123");
        assert_eq!(err.to_string(), "Resource not found: Patient/123");

        let err = StorageError::version_conflict("Patient", "123", 2, 3);
        assert!(err.to_string().contains("expected 2, found 3"));
    }

    #[test]
    fn test_error_classification() {
        assert!(StorageError::not_found("Patient", "1").is_client_error());
        assert!(!StorageError::not_found("Patient", "1").is_retryable());
        assert!(StorageError::connection("refused").is_retryable());
        assert!(!StorageError::internal("oops").is_client_error());
    }
}
