use crate::params::{SearchParamKind, SearchParameter};
use std::collections::HashMap;

/// One component of a composite parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeComponent {
    /// Name of the plain parameter this component corresponds to.
    pub param: String,
    pub kind: SearchParamKind,
    /// Element path relative to the composite root (or to the resource
    /// root when the composite has no array root).
    pub path: String,
}

/// A composite search parameter: two or more component values that must
/// match within the same element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeDefinition {
    pub name: String,
    /// Path of the repeating element the components correlate over.
    /// `None` when the components live directly on the resource root,
    /// where correlation is trivial.
    pub root: Option<String>,
    pub components: Vec<CompositeComponent>,
}

impl CompositeDefinition {
    pub fn arity(&self) -> usize {
        self.components.len()
    }
}

/// Immutable lookup of search parameter definitions.
///
/// Built once at startup and shared by reference; resolution first checks
/// the resource type's own parameters, then the cross-type common set
/// (`_id`, `_lastUpdated`, ...).
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    by_type: HashMap<String, HashMap<String, SearchParameter>>,
    common: HashMap<String, SearchParameter>,
    composites: HashMap<String, HashMap<String, CompositeDefinition>>,
}

impl ParameterRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Resolve a plain parameter for a resource type.
    pub fn resolve(&self, resource_type: &str, name: &str) -> Option<&SearchParameter> {
        self.by_type
            .get(resource_type)
            .and_then(|params| params.get(name))
            .or_else(|| self.common.get(name))
    }

    /// Resolve a composite parameter for a resource type.
    pub fn resolve_composite(
        &self,
        resource_type: &str,
        name: &str,
    ) -> Option<&CompositeDefinition> {
        self.composites
            .get(resource_type)
            .and_then(|defs| defs.get(name))
    }

    /// All plain parameters applicable to a resource type, common ones
    /// included. Used by the extractor.
    pub fn parameters_for(&self, resource_type: &str) -> impl Iterator<Item = &SearchParameter> {
        self.common.values().chain(
            self.by_type
                .get(resource_type)
                .into_iter()
                .flat_map(|params| params.values()),
        )
    }

    pub fn knows_resource_type(&self, resource_type: &str) -> bool {
        self.by_type.contains_key(resource_type)
    }
}

/// Accumulates definitions and freezes them into a [`ParameterRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: ParameterRegistry,
}

impl RegistryBuilder {
    #[must_use]
    pub fn parameter(mut self, resource_type: &str, param: SearchParameter) -> Self {
        self.registry
            .by_type
            .entry(resource_type.to_string())
            .or_default()
            .insert(param.name.clone(), param);
        self
    }

    #[must_use]
    pub fn common(mut self, param: SearchParameter) -> Self {
        self.registry.common.insert(param.name.clone(), param);
        self
    }

    #[must_use]
    pub fn composite(mut self, resource_type: &str, def: CompositeDefinition) -> Self {
        self.registry
            .composites
            .entry(resource_type.to_string())
            .or_default()
            .insert(def.name.clone(), def);
        self
    }

    pub fn build(self) -> ParameterRegistry {
        self.registry
    }
}

/// The built-in R4 definitions the server ships with.
pub fn default_registry() -> ParameterRegistry {
    use SearchParamKind::*;

    let string_param = |name: &str, paths: &[&str]| {
        SearchParameter::new(name, String, paths.iter().map(|p| p.to_string()).collect())
    };
    let token_param = |name: &str, paths: &[&str]| {
        SearchParameter::new(name, Token, paths.iter().map(|p| p.to_string()).collect())
    };
    let date_param = |name: &str, paths: &[&str]| {
        SearchParameter::new(name, Date, paths.iter().map(|p| p.to_string()).collect())
    };
    let reference_param = |name: &str, paths: &[&str], targets: &[&str]| {
        SearchParameter::new(name, Reference, paths.iter().map(|p| p.to_string()).collect())
            .with_targets(targets.iter().map(|t| t.to_string()).collect())
    };

    ParameterRegistry::builder()
        // Parameters every resource type supports.
        .common(token_param("_id", &["id"]))
        .common(date_param("_lastUpdated", &["meta.lastUpdated"]))
        .common(token_param("_tag", &["meta.tag"]))
        .common(token_param("_profile", &["meta.profile"]))
        // Patient
        .parameter("Patient", string_param("name", &["name"]))
        .parameter("Patient", string_param("family", &["name.family"]))
        .parameter("Patient", string_param("given", &["name.given"]))
        .parameter("Patient", string_param("address", &["address"]))
        .parameter("Patient", token_param("gender", &["gender"]))
        .parameter("Patient", token_param("identifier", &["identifier"]))
        .parameter("Patient", date_param("birthdate", &["birthDate"]))
        .parameter(
            "Patient",
            reference_param(
                "general-practitioner",
                &["generalPractitioner"],
                &["Practitioner", "Organization", "PractitionerRole"],
            ),
        )
        .parameter(
            "Patient",
            reference_param("organization", &["managingOrganization"], &["Organization"]),
        )
        // Observation
        .parameter("Observation", token_param("code", &["code"]))
        .parameter("Observation", token_param("category", &["category"]))
        .parameter("Observation", token_param("status", &["status"]))
        .parameter("Observation", date_param("date", &["effective"]))
        .parameter(
            "Observation",
            SearchParameter::new("value-quantity", Quantity, vec!["valueQuantity".into()]),
        )
        .parameter(
            "Observation",
            reference_param("subject", &["subject"], &["Patient", "Group", "Device", "Location"]),
        )
        .parameter(
            "Observation",
            reference_param("patient", &["subject"], &["Patient"]),
        )
        .parameter(
            "Observation",
            reference_param("performer", &["performer"], &["Practitioner", "Organization"]),
        )
        .parameter(
            "Observation",
            reference_param("encounter", &["encounter"], &["Encounter"]),
        )
        .composite(
            "Observation",
            CompositeDefinition {
                name: "code-value-quantity".to_string(),
                root: None,
                components: vec![
                    CompositeComponent {
                        param: "code".to_string(),
                        kind: Token,
                        path: "code".to_string(),
                    },
                    CompositeComponent {
                        param: "value-quantity".to_string(),
                        kind: Quantity,
                        path: "valueQuantity".to_string(),
                    },
                ],
            },
        )
        .composite(
            "Observation",
            CompositeDefinition {
                name: "component-code-value-quantity".to_string(),
                root: Some("component".to_string()),
                components: vec![
                    CompositeComponent {
                        param: "component-code".to_string(),
                        kind: Token,
                        path: "code".to_string(),
                    },
                    CompositeComponent {
                        param: "component-value-quantity".to_string(),
                        kind: Quantity,
                        path: "valueQuantity".to_string(),
                    },
                ],
            },
        )
        // Condition
        .parameter("Condition", token_param("code", &["code"]))
        .parameter("Condition", token_param("clinical-status", &["clinicalStatus"]))
        .parameter("Condition", date_param("onset-date", &["onsetDateTime"]))
        .parameter(
            "Condition",
            reference_param("subject", &["subject"], &["Patient", "Group"]),
        )
        .parameter(
            "Condition",
            reference_param("patient", &["subject"], &["Patient"]),
        )
        // Encounter
        .parameter("Encounter", token_param("status", &["status"]))
        .parameter("Encounter", token_param("class", &["class"]))
        .parameter("Encounter", date_param("date", &["period.start"]))
        .parameter(
            "Encounter",
            reference_param("subject", &["subject"], &["Patient", "Group"]),
        )
        .parameter(
            "Encounter",
            reference_param("patient", &["subject"], &["Patient"]),
        )
        // MedicationRequest
        .parameter("MedicationRequest", token_param("status", &["status"]))
        .parameter("MedicationRequest", token_param("intent", &["intent"]))
        .parameter(
            "MedicationRequest",
            token_param("code", &["medicationCodeableConcept"]),
        )
        .parameter(
            "MedicationRequest",
            date_param("authoredon", &["authoredOn"]),
        )
        .parameter(
            "MedicationRequest",
            reference_param("subject", &["subject"], &["Patient", "Group"]),
        )
        .parameter(
            "MedicationRequest",
            reference_param("patient", &["subject"], &["Patient"]),
        )
        .parameter(
            "MedicationRequest",
            reference_param("requester", &["requester"], &["Practitioner", "Organization"]),
        )
        // Practitioner
        .parameter("Practitioner", string_param("name", &["name"]))
        .parameter("Practitioner", string_param("family", &["name.family"]))
        .parameter("Practitioner", token_param("identifier", &["identifier"]))
        // Organization
        .parameter("Organization", string_param("name", &["name"]))
        .parameter("Organization", token_param("identifier", &["identifier"]))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_type_specific() {
        let registry = default_registry();
        let param = registry.resolve("Patient", "birthdate").unwrap();
        assert_eq!(param.kind, SearchParamKind::Date);
        assert_eq!(param.paths, vec!["birthDate"]);
    }

    #[test]
    fn test_resolve_common_fallback() {
        let registry = default_registry();
        let param = registry.resolve("Patient", "_lastUpdated").unwrap();
        assert_eq!(param.kind, SearchParamKind::Date);
        // Common params resolve for types with no specific entry too.
        assert!(registry.resolve("Basic", "_id").is_some());
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = default_registry();
        assert!(registry.resolve("Patient", "favourite-colour").is_none());
        // Observation's code does not leak onto Patient.
        assert!(registry.resolve("Patient", "value-quantity").is_none());
    }

    #[test]
    fn test_resolve_composite() {
        let registry = default_registry();
        let def = registry
            .resolve_composite("Observation", "code-value-quantity")
            .unwrap();
        assert_eq!(def.arity(), 2);
        assert!(def.root.is_none());

        let def = registry
            .resolve_composite("Observation", "component-code-value-quantity")
            .unwrap();
        assert_eq!(def.root.as_deref(), Some("component"));
        assert!(registry.resolve_composite("Patient", "code-value-quantity").is_none());
    }

    #[test]
    fn test_parameters_for_includes_common() {
        let registry = default_registry();
        let names: Vec<&str> = registry
            .parameters_for("Patient")
            .map(|p| p.name.as_str())
            .collect();
        assert!(names.contains(&"_id"));
        assert!(names.contains(&"birthdate"));
        assert!(!names.contains(&"value-quantity"));
    }

    #[test]
    fn test_builder_overrides() {
        let registry = ParameterRegistry::builder()
            .parameter(
                "Patient",
                SearchParameter::new("name", SearchParamKind::String, vec!["name".into()]),
            )
            .parameter(
                "Patient",
                SearchParameter::new("name", SearchParamKind::Token, vec!["name".into()]),
            )
            .build();
        let param = registry.resolve("Patient", "name").unwrap();
        assert_eq!(param.kind, SearchParamKind::Token);
    }
}
