use crate::engine::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::params::{SearchModifier, SearchParamKind};
use crate::parser::{HasClause, ParsedSearchParameter, ParsedValue, SearchRequest};
use crate::registry::{CompositeComponent, CompositeDefinition};
use crate::sql::{SqlBuilder, SqlParam, escape_like, or_clause};
use helixfhir_core::time::parse_fhir_date;
use time::format_description::well_known::Rfc3339;

/// Reverse chains deeper than this are rejected rather than compiled.
const MAX_HAS_DEPTH: usize = 5;

/// A compiled search: a WHERE fragment over the resource alias `r` plus the
/// bind values it references.
///
/// Placeholder numbering starts at `$2`; the executor binds the searched
/// resource type as `$1` in its surrounding query.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub where_sql: String,
    pub params: Vec<SqlParam>,
    pub limit: i64,
    pub offset: i64,
}

/// Compiles parsed search parameters into SQL over the parameter index.
///
/// Each parameter occurrence becomes its own EXISTS subquery with a fresh
/// index alias (`sp0`, `sp1`, ...), so occurrences never collide; reverse
/// chains get resource aliases (`h1`, `h2`, ...) the same way.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    config: SearchConfig,
}

struct CompileCtx {
    builder: SqlBuilder,
    sp_counter: usize,
    has_counter: usize,
}

impl CompileCtx {
    fn next_sp_alias(&mut self) -> String {
        let alias = format!("sp{}", self.sp_counter);
        self.sp_counter += 1;
        alias
    }

    fn next_has_alias(&mut self) -> String {
        self.has_counter += 1;
        format!("h{}", self.has_counter)
    }
}

impl QueryCompiler {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn compile(&self, request: &SearchRequest) -> SearchResult<CompiledQuery> {
        let mut ctx = CompileCtx {
            // $1 is reserved for the resource type bound by the executor.
            builder: SqlBuilder::with_offset(1),
            sp_counter: 0,
            has_counter: 0,
        };

        for parameter in &request.parameters {
            let condition =
                compile_parameter(&mut ctx, parameter, "r", &request.resource_type, 0)?;
            ctx.builder.push_condition(condition);
        }

        let limit = i64::from(
            request
                .count
                .unwrap_or(self.config.default_count)
                .min(self.config.max_count),
        );
        let offset = i64::from(request.offset.unwrap_or(0));

        Ok(CompiledQuery {
            where_sql: ctx.builder.where_clause(),
            params: ctx.builder.into_params(),
            limit,
            offset,
        })
    }
}

/// Compile one parameter occurrence into a condition over `outer_alias`,
/// the resource-table alias the condition applies to.
fn compile_parameter(
    ctx: &mut CompileCtx,
    parameter: &ParsedSearchParameter,
    outer_alias: &str,
    outer_type: &str,
    has_depth: usize,
) -> SearchResult<String> {
    match parameter {
        ParsedSearchParameter::Plain {
            definition,
            modifier,
            values,
        } => {
            if *modifier == Some(SearchModifier::Missing) {
                let wants_missing = values.first().is_some_and(|v| v.raw == "true");
                return Ok(compile_missing(ctx, &definition.name, outer_alias, wants_missing));
            }
            let alias = ctx.next_sp_alias();
            let name_ph = ctx.builder.bind(SqlParam::Text(definition.name.clone()));
            let mut alternatives = Vec::with_capacity(values.len());
            for value in values {
                alternatives.push(compile_value(
                    ctx,
                    definition.kind,
                    *modifier,
                    &definition.name,
                    &definition.targets,
                    &alias,
                    value,
                )?);
            }
            Ok(format!(
                "EXISTS (SELECT 1 FROM search_param_index {alias} \
                 WHERE {alias}.resource_id = {outer_alias}.id \
                 AND {alias}.param_name = {name_ph} \
                 AND {})",
                or_clause(alternatives)
            ))
        }
        ParsedSearchParameter::Composite { definition, values } => {
            let mut alternatives = Vec::with_capacity(values.len());
            for components in values {
                alternatives.push(compile_composite(
                    ctx,
                    definition,
                    components,
                    outer_alias,
                )?);
            }
            Ok(or_clause(alternatives))
        }
        ParsedSearchParameter::Has(clause) => {
            if has_depth >= MAX_HAS_DEPTH {
                return Err(SearchError::too_complex(format!(
                    "_has chains deeper than {MAX_HAS_DEPTH} are not supported"
                )));
            }
            compile_has(ctx, clause, outer_alias, outer_type, has_depth)
        }
    }
}

fn compile_missing(
    ctx: &mut CompileCtx,
    param_name: &str,
    outer_alias: &str,
    wants_missing: bool,
) -> String {
    let alias = ctx.next_sp_alias();
    let name_ph = ctx.builder.bind(SqlParam::Text(param_name.to_string()));
    let exists = format!(
        "EXISTS (SELECT 1 FROM search_param_index {alias} \
         WHERE {alias}.resource_id = {outer_alias}.id \
         AND {alias}.param_name = {name_ph})"
    );
    if wants_missing {
        format!("NOT {exists}")
    } else {
        exists
    }
}

/// One alternative value for a plain parameter, against index alias `sp`.
fn compile_value(
    ctx: &mut CompileCtx,
    kind: SearchParamKind,
    modifier: Option<SearchModifier>,
    name: &str,
    targets: &[String],
    sp: &str,
    value: &ParsedValue,
) -> SearchResult<String> {
    match kind {
        SearchParamKind::String => {
            if modifier == Some(SearchModifier::Exact) {
                let ph = ctx.builder.bind(SqlParam::Text(value.raw.clone()));
                Ok(format!("{sp}.value_string = {ph}"))
            } else {
                let pattern = format!("%{}%", escape_like(&value.raw));
                let ph = ctx.builder.bind(SqlParam::Text(pattern));
                Ok(format!("{sp}.value_string ILIKE {ph}"))
            }
        }
        SearchParamKind::Token => Ok(compile_token(ctx, sp, &value.raw)),
        SearchParamKind::Date => {
            let op = comparator(name, value)?;
            let parsed = parse_fhir_date(&value.raw)
                .map_err(|e| SearchError::invalid_value(name, e.to_string()))?;
            let formatted = parsed
                .format(&Rfc3339)
                .map_err(|e| SearchError::invalid_value(name, e.to_string()))?;
            let ph = ctx.builder.bind(SqlParam::Timestamp(formatted));
            Ok(format!("{sp}.value_date {op} {ph}::timestamptz"))
        }
        SearchParamKind::Number => {
            let op = comparator(name, value)?;
            let number = parse_number(name, &value.raw)?;
            let ph = ctx.builder.bind(SqlParam::Float(number));
            Ok(format!("{sp}.value_number {op} {ph}"))
        }
        SearchParamKind::Quantity => {
            let op = comparator(name, value)?;
            let number = parse_number(name, &value.raw)?;
            let ph = ctx.builder.bind(SqlParam::Float(number));
            Ok(format!("{sp}.value_quantity {op} {ph}"))
        }
        SearchParamKind::Reference => Ok(compile_reference(ctx, sp, targets, &value.raw)),
        SearchParamKind::Composite => Err(SearchError::invalid_value(
            name,
            "composite parameters have no plain value form",
        )),
    }
}

/// Token matching per the `system|code` convention.
fn compile_token(ctx: &mut CompileCtx, sp: &str, raw: &str) -> String {
    match raw.split_once('|') {
        // `|code`: explicitly no system.
        Some(("", code)) => {
            let ph = ctx.builder.bind(SqlParam::Text(code.to_string()));
            format!("({sp}.value_token_system IS NULL AND {sp}.value_token_code = {ph})")
        }
        // `system|`: any code within the system.
        Some((system, "")) => {
            let ph = ctx.builder.bind(SqlParam::Text(system.to_string()));
            format!("{sp}.value_token_system = {ph}")
        }
        // `system|code`: both must match.
        Some((system, code)) => {
            let system_ph = ctx.builder.bind(SqlParam::Text(system.to_string()));
            let code_ph = ctx.builder.bind(SqlParam::Text(code.to_string()));
            format!(
                "({sp}.value_token_system = {system_ph} AND {sp}.value_token_code = {code_ph})"
            )
        }
        // Bare code: system unconstrained.
        None => {
            let ph = ctx.builder.bind(SqlParam::Text(raw.to_string()));
            format!("{sp}.value_token_code = {ph}")
        }
    }
}

/// Reference matching against the canonical `Type/id` form, completing a
/// bare id through the parameter's declared targets.
fn compile_reference(ctx: &mut CompileCtx, sp: &str, targets: &[String], raw: &str) -> String {
    if raw.contains('/') || raw.starts_with("urn:") {
        let ph = ctx.builder.bind(SqlParam::Text(raw.to_string()));
        return format!("{sp}.value_reference = {ph}");
    }
    // Bare id: try every declared target type, plus the raw form for rows
    // indexed before the target was determinable.
    let mut alternatives = Vec::with_capacity(targets.len() + 1);
    for target in targets {
        let ph = ctx.builder.bind(SqlParam::Text(format!("{target}/{raw}")));
        alternatives.push(format!("{sp}.value_reference = {ph}"));
    }
    let raw_ph = ctx.builder.bind(SqlParam::Text(raw.to_string()));
    alternatives.push(format!("{sp}.value_reference = {raw_ph}"));
    or_clause(alternatives)
}

fn comparator(name: &str, value: &ParsedValue) -> SearchResult<&'static str> {
    value
        .prefix
        .sql_operator()
        .ok_or_else(|| SearchError::UnsupportedPrefix {
            name: name.to_string(),
            prefix: value.prefix.to_string(),
        })
}

fn parse_number(name: &str, raw: &str) -> SearchResult<f64> {
    raw.parse::<f64>()
        .map_err(|_| SearchError::invalid_value(name, format!("not a number: {raw}")))
}

/// Composite compilation.
///
/// When the composite correlates over a repeating element, both component
/// conditions go inside one EXISTS over that JSON array, so they must hold
/// against the same element. A composite rooted directly on the resource
/// has nothing to correlate and compiles to ANDed index conditions.
fn compile_composite(
    ctx: &mut CompileCtx,
    definition: &CompositeDefinition,
    components: &[ParsedValue],
    outer_alias: &str,
) -> SearchResult<String> {
    match &definition.root {
        None => {
            let mut conditions = Vec::with_capacity(components.len());
            for (component, value) in definition.components.iter().zip(components) {
                let alias = ctx.next_sp_alias();
                let name_ph = ctx.builder.bind(SqlParam::Text(component.param.clone()));
                let condition = compile_value(
                    ctx,
                    component.kind,
                    None,
                    &definition.name,
                    &[],
                    &alias,
                    value,
                )?;
                conditions.push(format!(
                    "EXISTS (SELECT 1 FROM search_param_index {alias} \
                     WHERE {alias}.resource_id = {outer_alias}.id \
                     AND {alias}.param_name = {name_ph} \
                     AND {condition})"
                ));
            }
            Ok(format!("({})", conditions.join(" AND ")))
        }
        Some(root) => {
            let root_expr = jsonb_object_path(&format!("{outer_alias}.content"), root);
            let mut conditions = Vec::with_capacity(components.len());
            for (component, value) in definition.components.iter().zip(components) {
                conditions.push(compile_jsonb_component(
                    ctx,
                    &definition.name,
                    component,
                    value,
                )?);
            }
            Ok(format!(
                "(jsonb_typeof({root_expr}) = 'array' \
                 AND EXISTS (SELECT 1 FROM jsonb_array_elements({root_expr}) AS elem \
                 WHERE {}))",
                conditions.join(" AND ")
            ))
        }
    }
}

/// A component condition over one element of the correlated array, bound to
/// the `elem` alias introduced by `jsonb_array_elements`.
fn compile_jsonb_component(
    ctx: &mut CompileCtx,
    composite_name: &str,
    component: &CompositeComponent,
    value: &ParsedValue,
) -> SearchResult<String> {
    let base = jsonb_object_path("elem", &component.path);
    match component.kind {
        SearchParamKind::Token => Ok(compile_jsonb_token(ctx, &base, &value.raw)),
        SearchParamKind::Quantity | SearchParamKind::Number => {
            let op = comparator(composite_name, value)?;
            let number = parse_number(composite_name, &value.raw)?;
            let ph = ctx.builder.bind(SqlParam::Float(number));
            Ok(format!("({base}->>'value')::numeric {op} {ph}"))
        }
        SearchParamKind::String => {
            let pattern = format!("%{}%", escape_like(&value.raw));
            let ph = ctx.builder.bind(SqlParam::Text(pattern));
            Ok(format!("{base} #>> '{{}}' ILIKE {ph}"))
        }
        SearchParamKind::Date => {
            let op = comparator(composite_name, value)?;
            let parsed = parse_fhir_date(&value.raw)
                .map_err(|e| SearchError::invalid_value(composite_name, e.to_string()))?;
            let formatted = parsed
                .format(&Rfc3339)
                .map_err(|e| SearchError::invalid_value(composite_name, e.to_string()))?;
            let ph = ctx.builder.bind(SqlParam::Timestamp(formatted));
            Ok(format!("({base} #>> '{{}}')::timestamptz {op} {ph}::timestamptz"))
        }
        SearchParamKind::Reference | SearchParamKind::Composite => {
            Err(SearchError::invalid_value(
                composite_name,
                format!("unsupported component kind {}", component.kind),
            ))
        }
    }
}

/// Match a token value against a CodeableConcept-shaped JSON element.
fn compile_jsonb_token(ctx: &mut CompileCtx, base: &str, raw: &str) -> String {
    let (system, code) = match raw.split_once('|') {
        Some((system, code)) => (Some(system), code),
        None => (None, raw),
    };
    let code_ph = ctx.builder.bind(SqlParam::Text(code.to_string()));
    let mut coding_cond = format!("coding->>'code' = {code_ph}");
    if let Some(system) = system {
        if system.is_empty() {
            coding_cond.push_str(" AND coding->>'system' IS NULL");
        } else {
            let system_ph = ctx.builder.bind(SqlParam::Text(system.to_string()));
            coding_cond.push_str(&format!(" AND coding->>'system' = {system_ph}"));
        }
    }
    format!(
        "EXISTS (SELECT 1 FROM jsonb_array_elements({base}->'coding') AS coding \
         WHERE {coding_cond})"
    )
}

/// Reverse chaining: match when a resource of the target type points back
/// at the outer resource and itself satisfies the inner parameter.
///
/// The back-reference check tolerates every normalization form the index
/// may contain: `Type/id`, `urn:uuid:<id>`, and the bare id.
fn compile_has(
    ctx: &mut CompileCtx,
    clause: &HasClause,
    outer_alias: &str,
    outer_type: &str,
    has_depth: usize,
) -> SearchResult<String> {
    let target_alias = ctx.next_has_alias();
    let type_ph = ctx.builder.bind(SqlParam::Text(clause.target_type.clone()));

    let sp = ctx.next_sp_alias();
    let ref_name_ph = ctx
        .builder
        .bind(SqlParam::Text(clause.back_reference.name.clone()));
    let typed_prefix_ph = ctx
        .builder
        .bind(SqlParam::Text(format!("{outer_type}/")));
    let back_ref = format!(
        "EXISTS (SELECT 1 FROM search_param_index {sp} \
         WHERE {sp}.resource_id = {target_alias}.id \
         AND {sp}.param_name = {ref_name_ph} \
         AND {sp}.value_reference IN ({typed_prefix_ph} || {outer_alias}.fhir_id, \
         'urn:uuid:' || {outer_alias}.fhir_id, {outer_alias}.fhir_id))"
    );

    let inner = compile_parameter(
        ctx,
        &clause.inner,
        &target_alias,
        &clause.target_type,
        has_depth + 1,
    )?;

    Ok(format!(
        "EXISTS (SELECT 1 FROM resources {target_alias} \
         WHERE {target_alias}.resource_type = {type_ph} \
         AND {target_alias}.deleted = FALSE \
         AND {back_ref} \
         AND {inner})"
    ))
}

/// `base->'a'->'b'` for a dotted path, staying in jsonb.
fn jsonb_object_path(base: &str, path: &str) -> String {
    let mut expr = base.to_string();
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        expr.push_str(&format!("->'{segment}'"));
    }
    expr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;
    use crate::registry::default_registry;

    fn compile(resource_type: &str, query: &str) -> SearchResult<CompiledQuery> {
        let registry = default_registry();
        let request = parse_query(&registry, resource_type, query)?;
        QueryCompiler::new(SearchConfig::default()).compile(&request)
    }

    #[test]
    fn test_empty_query_compiles_to_true() {
        let compiled = compile("Patient", "").unwrap();
        assert_eq!(compiled.where_sql, "TRUE");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_param_numbering_reserves_dollar_one() {
        let compiled = compile("Patient", "gender=female").unwrap();
        // $1 belongs to the executor's resource-type bind.
        assert!(compiled.where_sql.contains("$2"));
        assert!(!compiled.where_sql.contains("$1"));
        assert_eq!(
            compiled.params,
            vec![
                SqlParam::Text("gender".into()),
                SqlParam::Text("female".into())
            ]
        );
    }

    #[test]
    fn test_token_system_and_code() {
        let compiled = compile("Observation", "code=http://loinc.org|15074-8").unwrap();
        assert!(compiled.where_sql.contains("value_token_system = $3"));
        assert!(compiled.where_sql.contains("value_token_code = $4"));
        assert!(compiled
            .params
            .contains(&SqlParam::Text("http://loinc.org".into())));
    }

    #[test]
    fn test_token_bare_code_ignores_system() {
        let compiled = compile("Observation", "code=15074-8").unwrap();
        assert!(compiled.where_sql.contains("value_token_code = $3"));
        assert!(!compiled.where_sql.contains("value_token_system"));
    }

    #[test]
    fn test_token_empty_system_requires_null() {
        let compiled = compile("Observation", "code=|glucose").unwrap();
        assert!(compiled.where_sql.contains("value_token_system IS NULL"));
        assert!(compiled.where_sql.contains("value_token_code = $3"));
    }

    #[test]
    fn test_token_system_only() {
        let compiled = compile("Observation", "code=http://loinc.org|").unwrap();
        assert!(compiled.where_sql.contains("value_token_system = $3"));
        assert!(!compiled.where_sql.contains("value_token_code"));
    }

    #[test]
    fn test_string_partial_and_exact() {
        let compiled = compile("Patient", "family=chal").unwrap();
        assert!(compiled.where_sql.contains("value_string ILIKE $3"));
        assert!(compiled.params.contains(&SqlParam::Text("%chal%".into())));

        let compiled = compile("Patient", "family:exact=Chalmers").unwrap();
        assert!(compiled.where_sql.contains("value_string = $3"));
        assert!(compiled.params.contains(&SqlParam::Text("Chalmers".into())));
    }

    #[test]
    fn test_string_like_metacharacters_escaped() {
        // %25 decodes to a literal percent sign.
        let compiled = compile("Patient", "family=Fifty%25").unwrap();
        assert!(compiled.params.contains(&SqlParam::Text("%Fifty\\%%".into())));
    }

    #[test]
    fn test_date_comparator() {
        let compiled = compile("Patient", "birthdate=ge1974-01-01").unwrap();
        assert!(compiled
            .where_sql
            .contains("value_date >= $3::timestamptz"));
        assert_eq!(
            compiled.params[1],
            SqlParam::Timestamp("1974-01-01T00:00:00Z".into())
        );
    }

    #[test]
    fn test_quantity_comparators() {
        let compiled = compile("Observation", "value-quantity=gt100").unwrap();
        assert!(compiled.where_sql.contains("value_quantity > $3"));
        assert!(compiled.params.contains(&SqlParam::Float(100.0)));

        let compiled = compile("Observation", "value-quantity=120").unwrap();
        assert!(compiled.where_sql.contains("value_quantity = $3"));
    }

    #[test]
    fn test_quantity_invalid_number_rejected() {
        let err = compile("Observation", "value-quantity=gtfast").unwrap_err();
        assert!(matches!(err, SearchError::InvalidValue { .. }));
    }

    #[test]
    fn test_period_prefixes_rejected() {
        let err = compile("Patient", "birthdate=sa2020").unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedPrefix { .. }));
    }

    #[test]
    fn test_reference_typed_and_bare() {
        let compiled = compile("Observation", "subject=Patient/p1").unwrap();
        assert!(compiled.where_sql.contains("value_reference = $3"));
        assert!(compiled.params.contains(&SqlParam::Text("Patient/p1".into())));

        // A bare id fans out over the declared target types.
        let compiled = compile("Observation", "patient=p1").unwrap();
        assert!(compiled.params.contains(&SqlParam::Text("Patient/p1".into())));
        assert!(compiled.params.contains(&SqlParam::Text("p1".into())));
    }

    #[test]
    fn test_comma_values_or_within_one_exists() {
        let compiled = compile("Patient", "gender=male,female").unwrap();
        assert_eq!(compiled.where_sql.matches("EXISTS").count(), 1);
        assert!(compiled.where_sql.contains(" OR "));
    }

    #[test]
    fn test_distinct_parameters_anded() {
        let compiled = compile("Patient", "gender=female&birthdate=ge1974").unwrap();
        assert_eq!(compiled.where_sql.matches("EXISTS").count(), 2);
        assert!(compiled.where_sql.contains(" AND EXISTS"));
        // Each occurrence gets its own alias.
        assert!(compiled.where_sql.contains("sp0"));
        assert!(compiled.where_sql.contains("sp1"));
    }

    #[test]
    fn test_missing_modifier() {
        let compiled = compile("Patient", "birthdate:missing=true").unwrap();
        assert!(compiled.where_sql.starts_with("NOT EXISTS"));

        let compiled = compile("Patient", "birthdate:missing=false").unwrap();
        assert!(compiled.where_sql.starts_with("EXISTS"));
        assert!(!compiled.where_sql.contains("NOT"));
    }

    #[test]
    fn test_composite_root_level() {
        let compiled =
            compile("Observation", "code-value-quantity=8480-6$gt140").unwrap();
        // Root-level composites become one index EXISTS per component.
        assert_eq!(compiled.where_sql.matches("EXISTS").count(), 2);
        assert!(compiled.params.contains(&SqlParam::Text("code".into())));
        assert!(compiled
            .params
            .contains(&SqlParam::Text("value-quantity".into())));
        assert!(compiled.params.contains(&SqlParam::Float(140.0)));
    }

    #[test]
    fn test_composite_correlated_over_component_array() {
        let compiled = compile(
            "Observation",
            "component-code-value-quantity=8480-6$gt140",
        )
        .unwrap();
        // A single EXISTS over the component array carries both
        // conditions, so they hold against the same element.
        assert_eq!(
            compiled
                .where_sql
                .matches("jsonb_array_elements(r.content->'component')")
                .count(),
            1
        );
        assert!(compiled.where_sql.contains("jsonb_typeof"));
        assert!(compiled.where_sql.contains("coding->>'code'"));
        assert!(compiled
            .where_sql
            .contains("(elem->'valueQuantity'->>'value')::numeric >"));
    }

    #[test]
    fn test_has_compiles_to_nested_exists() {
        let compiled = compile("Patient", "_has:Observation:patient:code=15074-8").unwrap();
        assert!(compiled.where_sql.contains("FROM resources h1"));
        assert!(compiled.where_sql.contains("h1.deleted = FALSE"));
        // The back reference accepts all historical normalization forms.
        assert!(compiled
            .where_sql
            .contains("'urn:uuid:' || r.fhir_id"));
        assert!(compiled.params.contains(&SqlParam::Text("Patient/".into())));
        assert!(compiled
            .params
            .contains(&SqlParam::Text("Observation".into())));
        // The inner condition applies to the chained alias.
        assert!(compiled.where_sql.contains("resource_id = h1.id"));
    }

    #[test]
    fn test_nested_has_aliases() {
        let compiled = compile(
            "Patient",
            "_has:Encounter:patient:_has:Encounter:patient:status=finished",
        );
        // Encounter.patient targets Patient only, so the nested chain is
        // rejected at parse time.
        assert!(compiled.is_err());

        let compiled = compile("Patient", "_has:Encounter:patient:status=finished").unwrap();
        assert!(compiled.where_sql.contains("h1"));
    }

    #[test]
    fn test_count_clamped_to_max() {
        let registry = default_registry();
        let request = parse_query(&registry, "Patient", "_count=100000").unwrap();
        let config = SearchConfig::default();
        let compiled = QueryCompiler::new(config.clone()).compile(&request).unwrap();
        assert_eq!(compiled.limit, i64::from(config.max_count));
        assert_eq!(compiled.offset, 0);
    }
}
