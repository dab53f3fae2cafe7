use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed FHIR reference.
///
/// References come in several shapes: relative (`Patient/123`), absolute
/// (`https://example.com/fhir/Patient/123`), urn form (`urn:uuid:...`),
/// or a bare logical id whose target type must be inferred from context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FhirReference {
    /// Resource type if the reference carried one.
    pub resource_type: Option<String>,
    /// The logical id, uuid, or opaque identifier.
    pub id: String,
    /// The reference string exactly as it appeared.
    pub raw: String,
}

impl FhirReference {
    /// The canonical `Type/id` form, or the raw value when no type is known.
    pub fn canonical(&self) -> String {
        match &self.resource_type {
            Some(rt) => format!("{rt}/{}", self.id),
            None => self.raw.clone(),
        }
    }

    pub fn is_typed(&self) -> bool {
        self.resource_type.is_some()
    }
}

impl fmt::Display for FhirReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Parse a reference string into its components.
///
/// Absolute URLs are reduced to their trailing `Type/id` segments when the
/// path ends that way. `urn:uuid:` references keep the urn as both id and
/// raw form since no type is recoverable from the urn itself.
pub fn parse_reference(value: &str) -> Result<FhirReference> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_reference("empty reference"));
    }

    if let Some(uuid_part) = trimmed.strip_prefix("urn:uuid:") {
        if uuid_part.is_empty() {
            return Err(CoreError::invalid_reference(trimmed));
        }
        return Ok(FhirReference {
            resource_type: None,
            id: trimmed.to_string(),
            raw: trimmed.to_string(),
        });
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        // Take the last two path segments as Type/id when they look like one.
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() >= 2 {
            let id = segments[segments.len() - 1];
            let rt = segments[segments.len() - 2];
            if is_resource_type_segment(rt) {
                return Ok(FhirReference {
                    resource_type: Some(rt.to_string()),
                    id: id.to_string(),
                    raw: trimmed.to_string(),
                });
            }
        }
        return Ok(FhirReference {
            resource_type: None,
            id: trimmed.to_string(),
            raw: trimmed.to_string(),
        });
    }

    let mut parts = trimmed.splitn(2, '/');
    let first = parts.next().unwrap_or_default();
    match parts.next() {
        Some(id) => {
            if first.is_empty() || id.is_empty() || id.contains('/') {
                return Err(CoreError::invalid_reference(trimmed));
            }
            if !is_resource_type_segment(first) {
                return Err(CoreError::invalid_reference(trimmed));
            }
            Ok(FhirReference {
                resource_type: Some(first.to_string()),
                id: id.to_string(),
                raw: trimmed.to_string(),
            })
        }
        None => Ok(FhirReference {
            resource_type: None,
            id: trimmed.to_string(),
            raw: trimmed.to_string(),
        }),
    }
}

/// Resource type segments start with an uppercase ASCII letter and contain
/// only alphanumerics.
fn is_resource_type_segment(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphanumeric()),
        _ => false,
    }
}
