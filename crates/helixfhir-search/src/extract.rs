use crate::params::SearchParamKind;
use crate::registry::ParameterRegistry;
use helixfhir_core::json_path::{navigate, path_segments};
use helixfhir_core::reference::parse_reference;
use helixfhir_core::time::parse_fhir_date;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::warn;

/// A single extracted value, typed by parameter kind. Each variant maps to
/// one kind-specific column group in the index table.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexedValue {
    String(String),
    Number(f64),
    Date(OffsetDateTime),
    Token {
        system: Option<String>,
        code: String,
    },
    Quantity {
        value: f64,
        system: Option<String>,
        code: Option<String>,
    },
    Reference(String),
}

/// One row destined for the parameter index table.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub param: String,
    pub value: IndexedValue,
}

impl IndexRow {
    fn new(param: &str, value: IndexedValue) -> Self {
        Self {
            param: param.to_string(),
            value,
        }
    }
}

/// Walk a resource body and produce index rows for every registered
/// parameter of its type.
///
/// Extraction never fails as a whole: a value that cannot be interpreted
/// for its parameter's kind is logged and skipped, and the remaining
/// parameters still produce rows.
pub fn extract(
    registry: &ParameterRegistry,
    resource_type: &str,
    content: &Value,
) -> Vec<IndexRow> {
    let mut rows = Vec::new();
    for param in registry.parameters_for(resource_type) {
        for path in &param.paths {
            let segments = path_segments(path);
            for node in navigate(content, &segments) {
                extract_value(param.kind, node, &param.targets, &mut |value| {
                    rows.push(IndexRow::new(&param.name, value));
                })
                .unwrap_or_else(|| {
                    warn!(
                        resource_type,
                        param = %param.name,
                        path = %path,
                        "skipping value with unexpected shape"
                    );
                });
            }
        }
    }
    rows
}

/// Interpret one JSON node for a parameter kind, emitting zero or more
/// values. Returns `None` when the node's shape does not fit the kind.
fn extract_value(
    kind: SearchParamKind,
    node: &Value,
    targets: &[String],
    emit: &mut dyn FnMut(IndexedValue),
) -> Option<()> {
    match kind {
        SearchParamKind::String => extract_string(node, emit),
        SearchParamKind::Token => extract_token(node, emit),
        SearchParamKind::Date => extract_date(node, emit),
        SearchParamKind::Number => {
            let n = node.as_f64()?;
            emit(IndexedValue::Number(n));
            Some(())
        }
        SearchParamKind::Quantity => extract_quantity(node, emit),
        SearchParamKind::Reference => extract_reference(node, targets, emit),
        SearchParamKind::Composite => Some(()),
    }
}

/// Text fields harvested from complex datatypes like HumanName and Address.
const STRING_FIELDS: &[&str] = &[
    "text", "family", "given", "prefix", "suffix", "line", "city", "district", "state",
    "postalCode", "country",
];

fn extract_string(node: &Value, emit: &mut dyn FnMut(IndexedValue)) -> Option<()> {
    match node {
        Value::String(s) => {
            emit(IndexedValue::String(s.clone()));
            Some(())
        }
        Value::Object(map) => {
            let mut found = false;
            for field in STRING_FIELDS {
                match map.get(*field) {
                    Some(Value::String(s)) => {
                        emit(IndexedValue::String(s.clone()));
                        found = true;
                    }
                    Some(Value::Array(items)) => {
                        for item in items.iter().filter_map(Value::as_str) {
                            emit(IndexedValue::String(item.to_string()));
                            found = true;
                        }
                    }
                    _ => {}
                }
            }
            found.then_some(())
        }
        _ => None,
    }
}

fn extract_token(node: &Value, emit: &mut dyn FnMut(IndexedValue)) -> Option<()> {
    match node {
        // A bare code like gender or status.
        Value::String(s) => {
            emit(IndexedValue::Token {
                system: None,
                code: s.clone(),
            });
            Some(())
        }
        Value::Bool(b) => {
            emit(IndexedValue::Token {
                system: None,
                code: b.to_string(),
            });
            Some(())
        }
        Value::Object(map) => {
            // CodeableConcept: recurse into its codings.
            if let Some(Value::Array(codings)) = map.get("coding") {
                let mut found = false;
                for coding in codings {
                    if extract_token(coding, emit).is_some() {
                        found = true;
                    }
                }
                return found.then_some(());
            }
            // Coding.
            if let Some(code) = map.get("code").and_then(Value::as_str) {
                emit(IndexedValue::Token {
                    system: map.get("system").and_then(Value::as_str).map(String::from),
                    code: code.to_string(),
                });
                return Some(());
            }
            // Identifier.
            if let Some(value) = map.get("value").and_then(Value::as_str) {
                emit(IndexedValue::Token {
                    system: map.get("system").and_then(Value::as_str).map(String::from),
                    code: value.to_string(),
                });
                return Some(());
            }
            None
        }
        _ => None,
    }
}

fn extract_date(node: &Value, emit: &mut dyn FnMut(IndexedValue)) -> Option<()> {
    match node {
        Value::String(s) => {
            let parsed = parse_fhir_date(s).ok()?;
            emit(IndexedValue::Date(parsed));
            Some(())
        }
        // Period: index on its start.
        Value::Object(map) => {
            let start = map.get("start").and_then(Value::as_str)?;
            let parsed = parse_fhir_date(start).ok()?;
            emit(IndexedValue::Date(parsed));
            Some(())
        }
        _ => None,
    }
}

fn extract_quantity(node: &Value, emit: &mut dyn FnMut(IndexedValue)) -> Option<()> {
    let map = node.as_object()?;
    let value = map.get("value").and_then(Value::as_f64)?;
    let code = map
        .get("code")
        .or_else(|| map.get("unit"))
        .and_then(Value::as_str)
        .map(String::from);
    emit(IndexedValue::Quantity {
        value,
        system: map.get("system").and_then(Value::as_str).map(String::from),
        code,
    });
    Some(())
}

fn extract_reference(
    node: &Value,
    targets: &[String],
    emit: &mut dyn FnMut(IndexedValue),
) -> Option<()> {
    let raw = match node {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("reference").and_then(Value::as_str)?,
        _ => return None,
    };
    let parsed = parse_reference(raw).ok()?;
    if parsed.is_typed() {
        emit(IndexedValue::Reference(parsed.canonical()));
    } else if !parsed.id.starts_with("urn:") && targets.len() == 1 {
        // A bare id with a single possible target is unambiguous.
        emit(IndexedValue::Reference(format!("{}/{}", targets[0], parsed.id)));
    } else {
        emit(IndexedValue::Reference(parsed.raw));
    }
    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;
    use serde_json::json;

    fn rows_for<'a>(rows: &'a [IndexRow], param: &str) -> Vec<&'a IndexedValue> {
        rows.iter()
            .filter(|r| r.param == param)
            .map(|r| &r.value)
            .collect()
    }

    #[test]
    fn test_extract_patient_strings_and_dates() {
        let registry = default_registry();
        let patient = json!({
            "resourceType": "Patient",
            "id": "p1",
            "name": [{"family": "Chalmers", "given": ["Peter", "James"]}],
            "gender": "male",
            "birthDate": "1974-12-25"
        });
        let rows = extract(&registry, "Patient", &patient);

        let families = rows_for(&rows, "family");
        assert_eq!(families, vec![&IndexedValue::String("Chalmers".into())]);

        let names = rows_for(&rows, "name");
        assert_eq!(names.len(), 3);

        let birthdates = rows_for(&rows, "birthdate");
        assert_eq!(birthdates.len(), 1);
        match birthdates[0] {
            IndexedValue::Date(d) => assert_eq!(d.day(), 25),
            other => panic!("expected date, got {other:?}"),
        }

        let ids = rows_for(&rows, "_id");
        assert_eq!(
            ids,
            vec![&IndexedValue::Token {
                system: None,
                code: "p1".into()
            }]
        );
    }

    #[test]
    fn test_extract_codeable_concept_tokens() {
        let registry = default_registry();
        let observation = json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {
                "coding": [
                    {"system": "http://loinc.org", "code": "15074-8"},
                    {"system": "http://example.org/local", "code": "glucose"}
                ]
            }
        });
        let rows = extract(&registry, "Observation", &observation);

        let codes = rows_for(&rows, "code");
        assert_eq!(codes.len(), 2);
        assert!(codes.contains(&&IndexedValue::Token {
            system: Some("http://loinc.org".into()),
            code: "15074-8".into()
        }));

        let statuses = rows_for(&rows, "status");
        assert_eq!(
            statuses,
            vec![&IndexedValue::Token {
                system: None,
                code: "final".into()
            }]
        );
    }

    #[test]
    fn test_extract_quantity_and_choice_date() {
        let registry = default_registry();
        let observation = json!({
            "resourceType": "Observation",
            "effectiveDateTime": "2024-03-15T10:30:00Z",
            "valueQuantity": {
                "value": 6.3,
                "system": "http://unitsofmeasure.org",
                "code": "mmol/L"
            }
        });
        let rows = extract(&registry, "Observation", &observation);

        let quantities = rows_for(&rows, "value-quantity");
        assert_eq!(
            quantities,
            vec![&IndexedValue::Quantity {
                value: 6.3,
                system: Some("http://unitsofmeasure.org".into()),
                code: Some("mmol/L".into())
            }]
        );

        // The `effective` path matches effectiveDateTime through the
        // choice element rule.
        assert_eq!(rows_for(&rows, "date").len(), 1);
    }

    #[test]
    fn test_extract_reference_normalization() {
        let registry = default_registry();
        let observation = json!({
            "resourceType": "Observation",
            "subject": {"reference": "Patient/p1"},
            "encounter": {"reference": "e9"},
            "performer": [{"reference": "urn:uuid:550e8400-e29b-41d4-a716-446655440000"}]
        });
        let rows = extract(&registry, "Observation", &observation);

        assert_eq!(
            rows_for(&rows, "subject"),
            vec![&IndexedValue::Reference("Patient/p1".into())]
        );
        // Bare id completed through the single declared target.
        assert_eq!(
            rows_for(&rows, "encounter"),
            vec![&IndexedValue::Reference("Encounter/e9".into())]
        );
        // Urns stay as written.
        assert_eq!(
            rows_for(&rows, "performer"),
            vec![&IndexedValue::Reference(
                "urn:uuid:550e8400-e29b-41d4-a716-446655440000".into()
            )]
        );
    }

    #[test]
    fn test_extract_skips_malformed_values() {
        let registry = default_registry();
        let patient = json!({
            "resourceType": "Patient",
            "birthDate": "not-a-date",
            "gender": "female"
        });
        let rows = extract(&registry, "Patient", &patient);
        assert!(rows_for(&rows, "birthdate").is_empty());
        // Other parameters still produce rows.
        assert_eq!(rows_for(&rows, "gender").len(), 1);
    }

    #[test]
    fn test_extract_period_start() {
        let registry = default_registry();
        let encounter = json!({
            "resourceType": "Encounter",
            "status": "finished",
            "period": {"start": "2024-01-10T08:00:00Z", "end": "2024-01-10T09:00:00Z"}
        });
        let rows = extract(&registry, "Encounter", &encounter);
        assert_eq!(rows_for(&rows, "date").len(), 1);
    }
}
