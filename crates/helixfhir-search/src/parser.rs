use crate::composite::{split_composite_value, split_unescaped, unescape};
use crate::error::{SearchError, SearchResult};
use crate::params::{SearchModifier, SearchParamKind, SearchParameter, SearchPrefix};
use crate::registry::{CompositeDefinition, ParameterRegistry};
use tracing::debug;

/// One value of a search parameter: a comparator prefix plus the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedValue {
    pub prefix: SearchPrefix,
    pub raw: String,
}

impl ParsedValue {
    fn split(kind: SearchParamKind, raw: &str) -> Self {
        if kind.supports_prefixes() {
            let (prefix, rest) = SearchPrefix::split(raw);
            Self {
                prefix,
                raw: rest.to_string(),
            }
        } else {
            Self {
                prefix: SearchPrefix::Eq,
                raw: raw.to_string(),
            }
        }
    }
}

/// A reverse-chain clause: match resources that some other resource of
/// `target_type` points at through `back_reference`, where that other
/// resource itself matches `inner`.
#[derive(Debug, Clone, PartialEq)]
pub struct HasClause {
    pub target_type: String,
    pub back_reference: SearchParameter,
    pub inner: ParsedSearchParameter,
}

/// A parsed, registry-validated search parameter occurrence.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSearchParameter {
    Plain {
        definition: SearchParameter,
        modifier: Option<SearchModifier>,
        /// Comma-separated alternatives, matched as OR.
        values: Vec<ParsedValue>,
    },
    Composite {
        definition: CompositeDefinition,
        /// Outer: comma alternatives. Inner: the `$`-separated components.
        values: Vec<Vec<ParsedValue>>,
    },
    Has(Box<HasClause>),
}

/// A fully parsed search request for one resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub resource_type: String,
    pub parameters: Vec<ParsedSearchParameter>,
    pub count: Option<u32>,
    pub offset: Option<u32>,
}

/// Parse an application/x-www-form-urlencoded query string into a
/// [`SearchRequest`], validating every parameter against the registry.
pub fn parse_query(
    registry: &ParameterRegistry,
    resource_type: &str,
    query: &str,
) -> SearchResult<SearchRequest> {
    let mut request = SearchRequest {
        resource_type: resource_type.to_string(),
        parameters: Vec::new(),
        count: None,
        offset: None,
    };

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "_count" => {
                request.count = Some(parse_paging_value("_count", &value)?);
            }
            "_offset" => {
                request.offset = Some(parse_paging_value("_offset", &value)?);
            }
            _ => {
                let parsed = parse_parameter(registry, resource_type, &key, &value)?;
                request.parameters.push(parsed);
            }
        }
    }

    debug!(
        resource_type,
        parameters = request.parameters.len(),
        "parsed search request"
    );
    Ok(request)
}

fn parse_paging_value(name: &str, value: &str) -> SearchResult<u32> {
    value
        .parse::<u32>()
        .map_err(|_| SearchError::invalid_value(name, format!("not a non-negative integer: {value}")))
}

/// Parse a single `key=value` pair.
pub fn parse_parameter(
    registry: &ParameterRegistry,
    resource_type: &str,
    key: &str,
    value: &str,
) -> SearchResult<ParsedSearchParameter> {
    if let Some(rest) = key.strip_prefix("_has:") {
        return parse_has(registry, resource_type, rest, value);
    }

    let (name, modifier_str) = match key.split_once(':') {
        Some((name, modifier)) => (name, Some(modifier)),
        None => (key, None),
    };

    // Composite names and plain names share a namespace; composites win
    // since a composite is never also registered as a plain parameter.
    if let Some(definition) = registry.resolve_composite(resource_type, name) {
        if let Some(m) = modifier_str {
            return Err(SearchError::UnsupportedModifier {
                name: name.to_string(),
                modifier: m.to_string(),
            });
        }
        return parse_composite(definition.clone(), value);
    }

    let Some(definition) = registry.resolve(resource_type, name) else {
        return Err(SearchError::unknown_parameter(resource_type, name));
    };

    let modifier = match modifier_str {
        Some(m) => {
            let parsed = SearchModifier::parse(m).ok_or_else(|| SearchError::UnsupportedModifier {
                name: name.to_string(),
                modifier: m.to_string(),
            })?;
            if !parsed.applies_to(definition.kind) {
                return Err(SearchError::UnsupportedModifier {
                    name: name.to_string(),
                    modifier: m.to_string(),
                });
            }
            Some(parsed)
        }
        None => None,
    };

    if modifier == Some(SearchModifier::Missing) && value != "true" && value != "false" {
        return Err(SearchError::invalid_value(
            name,
            format!(":missing takes true or false, got {value}"),
        ));
    }

    let values: Vec<ParsedValue> = split_unescaped(value, ',')
        .iter()
        .map(|v| ParsedValue::split(definition.kind, &unescape(v)))
        .collect();
    if values.iter().any(|v| v.raw.is_empty()) {
        return Err(SearchError::invalid_value(name, "empty value"));
    }

    Ok(ParsedSearchParameter::Plain {
        definition: definition.clone(),
        modifier,
        values,
    })
}

fn parse_composite(
    definition: CompositeDefinition,
    value: &str,
) -> SearchResult<ParsedSearchParameter> {
    let mut values = Vec::new();
    for alternative in split_unescaped(value, ',') {
        let components = split_composite_value(&definition, &alternative)?;
        let parsed: Vec<ParsedValue> = definition
            .components
            .iter()
            .zip(components.iter())
            .map(|(component, raw)| ParsedValue::split(component.kind, raw))
            .collect();
        if parsed.iter().any(|v| v.raw.is_empty()) {
            return Err(SearchError::invalid_value(
                &definition.name,
                "empty composite component",
            ));
        }
        values.push(parsed);
    }
    Ok(ParsedSearchParameter::Composite { definition, values })
}

/// Parse the tail of a `_has` key, `Type:back-ref:rest...`, recursively.
///
/// The back-reference must be a registered reference parameter on the
/// target type whose declared targets include the searched type. Anything
/// short of that is rejected rather than silently matched.
fn parse_has(
    registry: &ParameterRegistry,
    resource_type: &str,
    key_rest: &str,
    value: &str,
) -> SearchResult<ParsedSearchParameter> {
    let mut segments = key_rest.splitn(3, ':');
    let target_type = segments.next().unwrap_or_default();
    let back_ref_name = segments.next().unwrap_or_default();
    let inner_key = segments.next().unwrap_or_default();

    if target_type.is_empty() || back_ref_name.is_empty() || inner_key.is_empty() {
        return Err(SearchError::malformed_has(format!(
            "_has needs type:reference:parameter, got '_has:{key_rest}'"
        )));
    }

    let Some(back_reference) = registry.resolve(target_type, back_ref_name) else {
        return Err(SearchError::malformed_has(format!(
            "unknown reference parameter '{back_ref_name}' on {target_type}"
        )));
    };
    if back_reference.kind != SearchParamKind::Reference {
        return Err(SearchError::malformed_has(format!(
            "'{back_ref_name}' on {target_type} is a {} parameter, not a reference",
            back_reference.kind
        )));
    }
    if !back_reference.targets.iter().any(|t| t == resource_type) {
        return Err(SearchError::malformed_has(format!(
            "'{back_ref_name}' on {target_type} cannot point at {resource_type}"
        )));
    }

    // The inner key may itself be another _has, nesting the chain.
    let inner = parse_parameter(registry, target_type, inner_key, value).map_err(|e| match e {
        SearchError::UnknownParameter { resource_type, name } => SearchError::malformed_has(
            format!("unknown inner parameter '{name}' on {resource_type}"),
        ),
        other => other,
    })?;

    Ok(ParsedSearchParameter::Has(Box::new(HasClause {
        target_type: target_type.to_string(),
        back_reference: back_reference.clone(),
        inner,
    })))
}
