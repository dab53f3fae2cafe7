use std::fmt;

/// A bind parameter value. Timestamps travel as RFC3339 text and are cast
/// with `::timestamptz` in the generated SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(String),
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Timestamp(s) => write!(f, "{s}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Accumulates WHERE conditions and their bind parameters, handing out
/// numbered placeholders (`$1`, `$2`, ...) as values are added.
///
/// `param_offset` reserves leading placeholder numbers for binds the caller
/// adds itself around the generated fragment.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    conditions: Vec<String>,
    params: Vec<SqlParam>,
    param_offset: usize,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: usize) -> Self {
        Self {
            param_offset: offset,
            ..Self::default()
        }
    }

    /// Register a bind value and get its placeholder back.
    pub fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.param_offset + self.params.len())
    }

    /// The placeholder the next [`bind`](Self::bind) call will return.
    pub fn next_placeholder(&self) -> String {
        format!("${}", self.param_offset + self.params.len() + 1)
    }

    pub fn push_condition(&mut self, condition: String) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// All conditions joined with AND, or `TRUE` when none were added.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            "TRUE".to_string()
        } else {
            self.conditions.join(" AND ")
        }
    }

    pub fn into_params(self) -> Vec<SqlParam> {
        self.params
    }
}

/// Join alternatives with OR, parenthesized when there is more than one.
pub fn or_clause(alternatives: Vec<String>) -> String {
    match alternatives.len() {
        0 => "FALSE".to_string(),
        1 => alternatives.into_iter().next().unwrap_or_default(),
        _ => format!("({})", alternatives.join(" OR ")),
    }
}

/// Escape LIKE metacharacters in user text. The generated patterns always
/// use backslash as the escape character.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_placeholders() {
        let mut builder = SqlBuilder::new();
        assert_eq!(builder.bind(SqlParam::Text("a".into())), "$1");
        assert_eq!(builder.bind(SqlParam::Integer(7)), "$2");
        assert_eq!(builder.params().len(), 2);
    }

    #[test]
    fn test_offset_reserves_placeholders() {
        let mut builder = SqlBuilder::with_offset(1);
        assert_eq!(builder.next_placeholder(), "$2");
        assert_eq!(builder.bind(SqlParam::Text("a".into())), "$2");
        assert_eq!(builder.bind(SqlParam::Text("b".into())), "$3");
    }

    #[test]
    fn test_where_clause() {
        let mut builder = SqlBuilder::new();
        assert_eq!(builder.where_clause(), "TRUE");
        builder.push_condition("a = 1".into());
        builder.push_condition("b = 2".into());
        assert_eq!(builder.where_clause(), "a = 1 AND b = 2");
    }

    #[test]
    fn test_or_clause() {
        assert_eq!(or_clause(vec![]), "FALSE");
        assert_eq!(or_clause(vec!["x".into()]), "x");
        assert_eq!(or_clause(vec!["x".into(), "y".into()]), "(x OR y)");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
