use crate::error::{SearchError, SearchResult};
use crate::registry::CompositeDefinition;

/// Split a string on a delimiter, honoring backslash escapes. An escaped
/// delimiter is unescaped in place; every other escape sequence is carried
/// through intact, so an outer split (commas) does not consume escapes
/// meant for an inner one (`\$`). Remaining escapes are stripped once, by
/// [`unescape`], after the innermost split.
pub fn split_unescaped(value: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) if escaped == delimiter => current.push(escaped),
                Some(escaped) => {
                    current.push('\\');
                    current.push(escaped);
                }
                None => current.push('\\'),
            }
        } else if c == delimiter {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Strip the backslash escapes left over after the last split layer.
/// A trailing lone backslash stays literal.
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Split one composite value into its `$`-delimited components and check
/// the component count against the definition.
pub fn split_composite_value(
    definition: &CompositeDefinition,
    value: &str,
) -> SearchResult<Vec<String>> {
    let components = split_unescaped(value, '$');
    if components.len() != definition.arity() {
        return Err(SearchError::CompositeArity {
            name: definition.name.clone(),
            expected: definition.arity(),
            actual: components.len(),
        });
    }
    Ok(components.iter().map(|c| unescape(c)).collect())
}
