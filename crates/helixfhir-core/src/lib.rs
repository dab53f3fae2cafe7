pub mod error;
pub mod fhir;
pub mod json_path;
pub mod negotiator;
pub mod reference;
pub mod time;

pub use error::{CoreError, Result};
pub use fhir::{FhirVersion, ResourceType};
pub use negotiator::{CompatibilityLevel, Detection, Negotiation, VersionNegotiator};
pub use reference::{FhirReference, parse_reference};
pub use time::{FhirDateTime, now_utc, parse_fhir_date};
