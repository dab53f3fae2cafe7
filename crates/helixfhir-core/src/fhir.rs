use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported FHIR specification versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FhirVersion {
    #[serde(rename = "4.0.1")]
    R4,
    #[serde(rename = "4.3.0")]
    R4B,
    #[serde(rename = "5.0.0")]
    R5,
}

impl FhirVersion {
    /// The `fhirVersion` value as published (e.g. "4.0.1").
    pub fn as_version_string(&self) -> &'static str {
        match self {
            FhirVersion::R4 => "4.0.1",
            FhirVersion::R4B => "4.3.0",
            FhirVersion::R5 => "5.0.0",
        }
    }

    /// Short release name (e.g. "R4").
    pub fn as_release_name(&self) -> &'static str {
        match self {
            FhirVersion::R4 => "R4",
            FhirVersion::R4B => "R4B",
            FhirVersion::R5 => "R5",
        }
    }
}

impl fmt::Display for FhirVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_version_string())
    }
}

impl FromStr for FhirVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4.0.1" | "4.0.0" | "R4" => Ok(FhirVersion::R4),
            "4.3.0" | "R4B" => Ok(FhirVersion::R4B),
            "5.0.0" | "R5" => Ok(FhirVersion::R5),
            _ => Err(CoreError::invalid_resource(format!(
                "Unknown FHIR version: {s}"
            ))),
        }
    }
}

impl Default for FhirVersion {
    fn default() -> Self {
        FhirVersion::R4
    }
}

/// FHIR resource types known to the search engine.
///
/// Unknown types round-trip through `Custom` so the engine never rejects a
/// resource it merely has no parameter definitions for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Patient,
    Practitioner,
    Organization,
    Encounter,
    Observation,
    Condition,
    DiagnosticReport,
    Medication,
    MedicationRequest,
    Procedure,
    AllergyIntolerance,
    Immunization,
    CarePlan,
    #[serde(untagged)]
    Custom(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::Organization => "Organization",
            ResourceType::Encounter => "Encounter",
            ResourceType::Observation => "Observation",
            ResourceType::Condition => "Condition",
            ResourceType::DiagnosticReport => "DiagnosticReport",
            ResourceType::Medication => "Medication",
            ResourceType::MedicationRequest => "MedicationRequest",
            ResourceType::Procedure => "Procedure",
            ResourceType::AllergyIntolerance => "AllergyIntolerance",
            ResourceType::Immunization => "Immunization",
            ResourceType::CarePlan => "CarePlan",
            ResourceType::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CoreError::invalid_resource_type(s));
        }
        // Resource type names always start with an uppercase ASCII letter.
        if !s.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            return Err(CoreError::invalid_resource_type(s));
        }
        Ok(match s {
            "Patient" => ResourceType::Patient,
            "Practitioner" => ResourceType::Practitioner,
            "Organization" => ResourceType::Organization,
            "Encounter" => ResourceType::Encounter,
            "Observation" => ResourceType::Observation,
            "Condition" => ResourceType::Condition,
            "DiagnosticReport" => ResourceType::DiagnosticReport,
            "Medication" => ResourceType::Medication,
            "MedicationRequest" => ResourceType::MedicationRequest,
            "Procedure" => ResourceType::Procedure,
            "AllergyIntolerance" => ResourceType::AllergyIntolerance,
            "Immunization" => ResourceType::Immunization,
            "CarePlan" => ResourceType::CarePlan,
            other => ResourceType::Custom(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_display_and_parse() {
        assert_eq!(FhirVersion::R4.to_string(), "4.0.1");
        assert_eq!(FhirVersion::R5.to_string(), "5.0.0");
        assert_eq!("R4B".parse::<FhirVersion>().unwrap(), FhirVersion::R4B);
        assert_eq!("4.0.1".parse::<FhirVersion>().unwrap(), FhirVersion::R4);
        assert!("6.0.0".parse::<FhirVersion>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(FhirVersion::R4 < FhirVersion::R4B);
        assert!(FhirVersion::R4B < FhirVersion::R5);
    }

    #[test]
    fn test_resource_type_roundtrip() {
        let rt: ResourceType = "Observation".parse().unwrap();
        assert_eq!(rt, ResourceType::Observation);
        assert_eq!(rt.to_string(), "Observation");
    }

    #[test]
    fn test_unknown_resource_type_is_custom() {
        let rt: ResourceType = "Basic".parse().unwrap();
        assert_eq!(rt, ResourceType::Custom("Basic".to_string()));
        assert_eq!(rt.as_str(), "Basic");
    }

    #[test]
    fn test_lowercase_resource_type_rejected() {
        assert!("patient".parse::<ResourceType>().is_err());
        assert!("".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_resource_type_serde() {
        let json = serde_json::to_string(&ResourceType::Patient).unwrap();
        assert_eq!(json, "\"Patient\"");
        let rt: ResourceType = serde_json::from_str("\"Basic\"").unwrap();
        assert_eq!(rt, ResourceType::Custom("Basic".to_string()));
    }
}
