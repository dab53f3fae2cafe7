use serde::{Deserialize, Serialize};
use std::fmt;

/// The value space of a search parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchParamKind {
    String,
    Token,
    Date,
    Number,
    Quantity,
    Reference,
    Composite,
}

impl SearchParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Token => "token",
            Self::Date => "date",
            Self::Number => "number",
            Self::Quantity => "quantity",
            Self::Reference => "reference",
            Self::Composite => "composite",
        }
    }

    /// Kinds whose values accept comparator prefixes.
    pub fn supports_prefixes(&self) -> bool {
        matches!(self, Self::Date | Self::Number | Self::Quantity)
    }
}

impl fmt::Display for SearchParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Search modifiers, the `:suffix` on a parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchModifier {
    Exact,
    Contains,
    Missing,
}

impl SearchModifier {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(Self::Exact),
            "contains" => Some(Self::Contains),
            "missing" => Some(Self::Missing),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::Missing => "missing",
        }
    }

    /// Whether the modifier is meaningful for values of the given kind.
    pub fn applies_to(&self, kind: SearchParamKind) -> bool {
        match self {
            // :missing works on every kind.
            Self::Missing => true,
            Self::Exact | Self::Contains => kind == SearchParamKind::String,
        }
    }
}

impl fmt::Display for SearchModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparator prefixes on date, number, and quantity values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPrefix {
    #[default]
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Sa,
    Eb,
    Ap,
}

impl SearchPrefix {
    /// Split a leading prefix off a value. Values without a recognized
    /// prefix are equality matches.
    pub fn split(value: &str) -> (Self, &str) {
        // A prefix is two ASCII letters followed by the actual value.
        if value.len() < 3 || !value.is_char_boundary(2) {
            return (Self::Eq, value);
        }
        let (head, rest) = value.split_at(2);
        match head {
            "eq" => (Self::Eq, rest),
            "ne" => (Self::Ne, rest),
            "gt" => (Self::Gt, rest),
            "ge" => (Self::Ge, rest),
            "lt" => (Self::Lt, rest),
            "le" => (Self::Le, rest),
            "sa" => (Self::Sa, rest),
            "eb" => (Self::Eb, rest),
            "ap" => (Self::Ap, rest),
            _ => (Self::Eq, value),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Sa => "sa",
            Self::Eb => "eb",
            Self::Ap => "ap",
        }
    }

    /// The SQL comparison operator for this prefix, when one exists.
    /// `sa`, `eb`, and `ap` need period arithmetic the index does not
    /// carry, so they have no direct operator.
    pub fn sql_operator(&self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::Ne => Some("<>"),
            Self::Gt => Some(">"),
            Self::Ge => Some(">="),
            Self::Lt => Some("<"),
            Self::Le => Some("<="),
            Self::Sa | Self::Eb | Self::Ap => None,
        }
    }
}

impl fmt::Display for SearchPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A search parameter definition as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameter {
    /// The name used in query strings, e.g. `birthdate`.
    pub name: String,
    pub kind: SearchParamKind,
    /// Element paths this parameter indexes, relative to the resource root.
    pub paths: Vec<String>,
    /// For reference parameters, the resource types the reference may point
    /// at. Used to complete bare ids and urns into `Type/id` form.
    pub targets: Vec<String>,
}

impl SearchParameter {
    pub fn new(name: impl Into<String>, kind: SearchParamKind, paths: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            paths,
            targets: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_split() {
        assert_eq!(SearchPrefix::split("gt2024"), (SearchPrefix::Gt, "2024"));
        assert_eq!(SearchPrefix::split("le5.4"), (SearchPrefix::Le, "5.4"));
        assert_eq!(SearchPrefix::split("2024"), (SearchPrefix::Eq, "2024"));
        assert_eq!(SearchPrefix::split("eq10"), (SearchPrefix::Eq, "10"));
        // A bare prefix with no value is treated as a literal.
        assert_eq!(SearchPrefix::split("gt"), (SearchPrefix::Eq, "gt"));
        assert_eq!(SearchPrefix::split(""), (SearchPrefix::Eq, ""));
    }

    #[test]
    fn test_modifier_parse() {
        assert_eq!(SearchModifier::parse("exact"), Some(SearchModifier::Exact));
        assert_eq!(
            SearchModifier::parse("missing"),
            Some(SearchModifier::Missing)
        );
        assert_eq!(SearchModifier::parse("below"), None);
    }

    #[test]
    fn test_modifier_applicability() {
        assert!(SearchModifier::Exact.applies_to(SearchParamKind::String));
        assert!(!SearchModifier::Exact.applies_to(SearchParamKind::Token));
        assert!(SearchModifier::Missing.applies_to(SearchParamKind::Date));
    }

    #[test]
    fn test_prefix_operators() {
        assert_eq!(SearchPrefix::Ge.sql_operator(), Some(">="));
        assert_eq!(SearchPrefix::Ap.sql_operator(), None);
    }
}
