use thiserror::Error;

pub type SearchResult<T> = Result<T, SearchError>;

/// Errors raised while parsing or compiling a search request.
///
/// All variants are client errors: the request named something the server
/// does not know or supplied a value in the wrong shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Unknown search parameter '{name}' for resource type {resource_type}")]
    UnknownParameter { resource_type: String, name: String },

    #[error("Invalid value for parameter '{name}': {message}")]
    InvalidValue { name: String, message: String },

    #[error(
        "Composite parameter '{name}' expects {expected} components, got {actual}"
    )]
    CompositeArity {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown composite parameter '{name}' for resource type {resource_type}")]
    UnknownComposite { resource_type: String, name: String },

    #[error("Malformed _has parameter: {message}")]
    MalformedHas { message: String },

    #[error("Unsupported modifier '{modifier}' on parameter '{name}'")]
    UnsupportedModifier { name: String, modifier: String },

    #[error("Unsupported prefix '{prefix}' on parameter '{name}'")]
    UnsupportedPrefix { name: String, prefix: String },

    #[error("Query too complex: {message}")]
    QueryTooComplex { message: String },
}

impl SearchError {
    #[must_use]
    pub fn unknown_parameter(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownParameter {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn invalid_value(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn malformed_has(message: impl Into<String>) -> Self {
        Self::MalformedHas {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn too_complex(message: impl Into<String>) -> Self {
        Self::QueryTooComplex {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SearchError::unknown_parameter("Patient", "favourite-colour");
        assert_eq!(
            err.to_string(),
            "Unknown search parameter 'favourite-colour' for resource type Patient"
        );

        let err = SearchError::CompositeArity {
            name: "code-value-quantity".to_string(),
            expected: 2,
            actual: 3,
        };
        assert!(err.to_string().contains("expects 2 components, got 3"));
    }
}
