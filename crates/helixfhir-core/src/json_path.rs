use serde_json::Value;

/// Split a dotted element path into segments, dropping a leading resource
/// type segment (`Patient.name.family` and `name.family` are equivalent).
pub fn path_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    if let Some(first) = segments.first() {
        if first.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            segments.remove(0);
        }
    }
    segments
}

/// Walk a JSON tree along element path segments, collecting every value the
/// path reaches. Arrays fan out: each element is traversed independently.
///
/// Choice elements are handled by prefix: when a segment like `value` has no
/// exact key, any key of the form `valueQuantity`, `valueString`, ... (the
/// segment followed by an uppercase letter) matches instead.
pub fn navigate<'a>(root: &'a Value, segments: &[&str]) -> Vec<&'a Value> {
    let mut current: Vec<&'a Value> = vec![root];
    for segment in segments {
        let mut next: Vec<&'a Value> = Vec::new();
        for node in current {
            collect_field(node, segment, &mut next);
        }
        if next.is_empty() {
            return next;
        }
        current = next;
    }
    // Flatten trailing arrays so callers always see leaf values.
    let mut flattened = Vec::with_capacity(current.len());
    for node in current {
        match node {
            Value::Array(items) => flattened.extend(items.iter()),
            other => flattened.push(other),
        }
    }
    flattened
}

fn collect_field<'a>(node: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(map) => {
            if let Some(v) = map.get(segment) {
                out.push(v);
            } else {
                for (key, v) in map {
                    if is_choice_match(key, segment) {
                        out.push(v);
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_field(item, segment, out);
            }
        }
        _ => {}
    }
}

fn is_choice_match(key: &str, segment: &str) -> bool {
    key.strip_prefix(segment)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}
