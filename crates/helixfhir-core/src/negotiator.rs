use crate::fhir::FhirVersion;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// How faithfully content authored for one FHIR version can be served as
/// another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityLevel {
    /// Same version, no loss.
    Full,
    /// Adjacent versions, most content survives conversion.
    Partial,
    /// Distant versions or forced fallback, lossy conversion.
    Minimal,
}

/// The outcome of version detection over a resource body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub version: FhirVersion,
    /// Sum of signal weights that voted for the winning version, capped at 1.0.
    pub confidence: f64,
    /// Human-readable descriptions of the signals that fired.
    pub signals: Vec<String>,
}

/// The outcome of negotiating a serving version for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    pub target: FhirVersion,
    pub transformation_required: bool,
    pub compatibility: CompatibilityLevel,
}

/// Detects the FHIR version of incoming content and negotiates the version
/// responses should be rendered in.
///
/// Detection is signal based: an explicit `fhirVersion` element outweighs
/// structural markers, which outweigh profile URL hints. Ties fall to the
/// server default.
#[derive(Debug, Clone)]
pub struct VersionNegotiator {
    supported: Vec<FhirVersion>,
    default: FhirVersion,
}

const WEIGHT_DECLARED: f64 = 1.0;
const WEIGHT_STRUCTURAL: f64 = 0.5;
const WEIGHT_PROFILE: f64 = 0.25;

impl VersionNegotiator {
    pub fn new(supported: Vec<FhirVersion>, default: FhirVersion) -> Self {
        debug_assert!(supported.contains(&default));
        Self { supported, default }
    }

    pub fn supported(&self) -> &[FhirVersion] {
        &self.supported
    }

    pub fn default_version(&self) -> FhirVersion {
        self.default
    }

    /// Inspect a resource body and report the most likely authoring version.
    pub fn detect(&self, resource: &Value) -> Detection {
        let mut scores: Vec<(FhirVersion, f64, Vec<String>)> = vec![
            (FhirVersion::R4, 0.0, Vec::new()),
            (FhirVersion::R4B, 0.0, Vec::new()),
            (FhirVersion::R5, 0.0, Vec::new()),
        ];

        let mut vote = |version: FhirVersion, weight: f64, signal: String| {
            for (v, score, signals) in &mut scores {
                if *v == version {
                    *score += weight;
                    signals.push(signal);
                    return;
                }
            }
        };

        // Explicit declaration wins outright when present.
        if let Some(declared) = resource
            .get("fhirVersion")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<FhirVersion>().ok())
        {
            vote(
                declared,
                WEIGHT_DECLARED,
                format!("declared fhirVersion {declared}"),
            );
        }

        for (version, signal) in structural_markers(resource) {
            vote(version, WEIGHT_STRUCTURAL, signal);
        }

        if let Some(profiles) = resource
            .get("meta")
            .and_then(|m| m.get("profile"))
            .and_then(Value::as_array)
        {
            for profile in profiles.iter().filter_map(Value::as_str) {
                if let Some(version) = version_from_profile_url(profile) {
                    vote(version, WEIGHT_PROFILE, format!("profile url {profile}"));
                }
            }
        }

        let winner = scores
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|(_, score, _)| *score > 0.0);

        match winner {
            Some((version, score, signals)) => {
                let detection = Detection {
                    version: *version,
                    confidence: score.min(1.0),
                    signals: signals.clone(),
                };
                debug!(version = %detection.version, confidence = detection.confidence, "detected fhir version");
                detection
            }
            None => Detection {
                version: self.default,
                confidence: 0.0,
                signals: vec!["no signals, server default".to_string()],
            },
        }
    }

    /// Choose the version a response should be rendered in.
    ///
    /// The first client preference the server supports wins. A client with
    /// no acceptable version still gets a response: the server's highest
    /// supported version, reported as [`CompatibilityLevel::Minimal`] so
    /// the caller can decide whether to proceed. An empty preference list
    /// means the client takes anything and gets the server default.
    pub fn negotiate(&self, detected: FhirVersion, preferences: &[FhirVersion]) -> Negotiation {
        if preferences.is_empty() {
            return Negotiation {
                target: self.default,
                transformation_required: detected != self.default,
                compatibility: compatibility(detected, self.default),
            };
        }
        for preference in preferences {
            if self.supported.contains(preference) {
                return Negotiation {
                    target: *preference,
                    transformation_required: detected != *preference,
                    compatibility: compatibility(detected, *preference),
                };
            }
        }
        let best = self
            .supported
            .iter()
            .copied()
            .max()
            .unwrap_or(self.default);
        Negotiation {
            target: best,
            transformation_required: detected != best,
            compatibility: CompatibilityLevel::Minimal,
        }
    }
}

impl Default for VersionNegotiator {
    fn default() -> Self {
        Self::new(
            vec![FhirVersion::R4, FhirVersion::R4B, FhirVersion::R5],
            FhirVersion::R4,
        )
    }
}

/// Fixed compatibility matrix. Adjacent releases convert with modest loss,
/// R4 to R5 crosses enough breaking changes to count as minimal.
pub fn compatibility(source: FhirVersion, target: FhirVersion) -> CompatibilityLevel {
    use FhirVersion::*;
    match (source, target) {
        (a, b) if a == b => CompatibilityLevel::Full,
        (R4, R4B) | (R4B, R4) => CompatibilityLevel::Partial,
        (R4B, R5) | (R5, R4B) => CompatibilityLevel::Partial,
        (R4, R5) | (R5, R4) => CompatibilityLevel::Minimal,
        _ => CompatibilityLevel::Minimal,
    }
}

/// Structural differences between releases that survive serialization.
///
/// MedicationRequest is the clearest marker: R5 folded the
/// `medication[x]` choice into a nested `medication` element with
/// `concept`/`reference` children.
fn structural_markers(resource: &Value) -> Vec<(FhirVersion, String)> {
    let mut markers = Vec::new();
    let Some(obj) = resource.as_object() else {
        return markers;
    };

    if obj.contains_key("medicationCodeableConcept") || obj.contains_key("medicationReference") {
        markers.push((
            FhirVersion::R4,
            "medication[x] choice element".to_string(),
        ));
    }
    if let Some(med) = obj.get("medication").and_then(Value::as_object) {
        if med.contains_key("concept") || med.contains_key("reference") {
            markers.push((
                FhirVersion::R5,
                "nested medication.concept element".to_string(),
            ));
        }
    }

    markers
}

fn version_from_profile_url(url: &str) -> Option<FhirVersion> {
    if url.contains("/R5/") || url.contains("5.0") {
        Some(FhirVersion::R5)
    } else if url.contains("/R4B/") || url.contains("4.3") {
        Some(FhirVersion::R4B)
    } else if url.contains("/R4/") || url.contains("4.0") {
        Some(FhirVersion::R4)
    } else {
        None
    }
}
