//! PostgreSQL JSONB rendering.
//!
//! Data points live in a single JSONB column. Every comparison extracts its
//! field with `col #> $n::text[]` and is guarded so that a value of another
//! JSON type never matches. Timestamps go through `dsu_try_timestamptz`,
//! which the migrations define to return NULL on unparsable text.

use super::PredicateCompiler;
use crate::criteria::format_timestamp;
use crate::filter::{ComparisonOp, ConditionNode, FieldPath, Literal};
use crate::interval::Timestamp;

/// Bind values for `sqlx` queries.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    TextArray(Vec<String>),
    BigInt(i64),
}

/// A rendered WHERE fragment and the values for its placeholders.
///
/// Placeholders are numbered from `$1` in bind order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlPredicate {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

impl SqlPredicate {
    /// Append a bind value and return its placeholder number.
    pub fn push_bind(&mut self, value: BindValue) -> usize {
        self.binds.push(value);
        self.binds.len()
    }
}

fn push_text(bind_params: &mut Vec<BindValue>, value: String) -> usize {
    bind_params.push(BindValue::Text(value));
    bind_params.len()
}

fn push_text_array(bind_params: &mut Vec<BindValue>, value: Vec<String>) -> usize {
    bind_params.push(BindValue::TextArray(value));
    bind_params.len()
}

#[derive(Debug, Clone)]
pub struct SqlCompiler {
    column: String,
}

impl Default for SqlCompiler {
    fn default() -> Self {
        Self::new("data")
    }
}

impl SqlCompiler {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Render `node`, appending its binds after any already in `binds`.
    pub fn compile_into(&self, node: &ConditionNode, binds: &mut Vec<BindValue>) -> String {
        match node {
            ConditionNode::Comparison { field, op, value } => {
                self.comparison(field, *op, value, binds)
            }
            ConditionNode::Exists { field, present } => {
                let target = self.extract(field, binds);
                if *present {
                    format!("({target} IS NOT NULL)")
                } else {
                    format!("({target} IS NULL)")
                }
            }
            ConditionNode::And(children) => self.join(children, "AND", "TRUE", binds),
            ConditionNode::Or(children) => self.join(children, "OR", "FALSE", binds),
        }
    }

    fn join(
        &self,
        children: &[ConditionNode],
        connective: &str,
        empty: &str,
        binds: &mut Vec<BindValue>,
    ) -> String {
        if children.is_empty() {
            return empty.to_string();
        }
        let parts: Vec<String> = children
            .iter()
            .map(|child| self.compile_into(child, binds))
            .collect();
        format!("({})", parts.join(&format!(" {connective} ")))
    }

    fn extract(&self, field: &FieldPath, binds: &mut Vec<BindValue>) -> String {
        let idx = push_text_array(binds, field.segments().to_vec());
        format!("({} #> ${idx}::text[])", self.column)
    }

    fn comparison(
        &self,
        field: &FieldPath,
        op: ComparisonOp,
        value: &Literal,
        binds: &mut Vec<BindValue>,
    ) -> String {
        let target = self.extract(field, binds);

        let (text, cast, json_type) = match value {
            Literal::Timestamp(t) => return timestamp_comparison(&target, op, t, binds),
            Literal::Integer(i) => (i.to_string(), "numeric", "number"),
            Literal::Float(f) => (f.to_string(), "numeric", "number"),
            Literal::Boolean(b) => (b.to_string(), "boolean", "boolean"),
            Literal::String(s) => (s.clone(), "text", "string"),
        };
        let idx = push_text(binds, text);

        // Containment also matches an element of a JSON array.
        let contains = format!("COALESCE({target} @> to_jsonb(${idx}::{cast}), FALSE)");
        match op {
            ComparisonOp::Eq => contains,
            ComparisonOp::Ne => format!("NOT {contains}"),
            _ => {
                let collate = if cast == "text" { " COLLATE \"C\"" } else { "" };
                format!(
                    "(jsonb_typeof({target}) = '{json_type}' AND ({target} #>> '{{}}')::{cast}{collate} {} ${idx}::{cast})",
                    sql_operator(op)
                )
            }
        }
    }
}

fn timestamp_comparison(
    target: &str,
    op: ComparisonOp,
    t: &Timestamp,
    binds: &mut Vec<BindValue>,
) -> String {
    let idx = push_text(binds, format_timestamp(t));
    let test = |sql_op: &str| {
        format!(
            "(jsonb_typeof({target}) = 'string' AND dsu_try_timestamptz({target} #>> '{{}}') {sql_op} ${idx}::timestamptz)"
        )
    };
    match op {
        ComparisonOp::Ne => format!("NOT COALESCE({}, FALSE)", test("=")),
        _ => test(sql_operator(op)),
    }
}

fn sql_operator(op: ComparisonOp) -> &'static str {
    match op {
        ComparisonOp::Eq => "=",
        ComparisonOp::Ne => "<>",
        ComparisonOp::Gt => ">",
        ComparisonOp::Ge => ">=",
        ComparisonOp::Lt => "<",
        ComparisonOp::Le => "<=",
    }
}

impl PredicateCompiler for SqlCompiler {
    type Predicate = SqlPredicate;

    fn compile(&self, node: &ConditionNode) -> SqlPredicate {
        let mut binds = Vec::new();
        let sql = self.compile_into(node, &mut binds);
        SqlPredicate { sql, binds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FilterTranslator;

    fn compile(filter: &str) -> SqlPredicate {
        let node = FilterTranslator::default().translate(filter).unwrap();
        SqlCompiler::default().compile(&node)
    }

    fn path(segments: &[&str]) -> BindValue {
        BindValue::TextArray(segments.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn string_equality_uses_containment() {
        let p = compile("header.user_id == 'u1'");
        assert_eq!(
            p.sql,
            "COALESCE((data #> $1::text[]) @> to_jsonb($2::text), FALSE)"
        );
        assert_eq!(
            p.binds,
            vec![path(&["header", "user_id"]), BindValue::Text("u1".into())]
        );
    }

    #[test]
    fn inequality_matches_absent_fields() {
        let p = compile("a != 3");
        assert_eq!(
            p.sql,
            "NOT COALESCE((data #> $1::text[]) @> to_jsonb($2::numeric), FALSE)"
        );
    }

    #[test]
    fn ordering_is_type_guarded() {
        let p = compile("body.step_count > 1000");
        assert_eq!(
            p.sql,
            "(jsonb_typeof((data #> $1::text[])) = 'number' AND ((data #> $1::text[]) #>> '{}')::numeric > $2::numeric)"
        );
        assert_eq!(p.binds[1], BindValue::Text("1000".into()));

        let p = compile("name >= 'b'");
        assert!(p.sql.contains("::text COLLATE \"C\" >= $2::text"), "{}", p.sql);
    }

    #[test]
    fn timestamps_compare_as_instants() {
        let p = compile("header.creation_date_time < '2024-02-01T00:00:00+01:00'");
        assert!(p
            .sql
            .contains("dsu_try_timestamptz((data #> $1::text[]) #>> '{}') < $2::timestamptz"));
        assert_eq!(
            p.binds[1],
            BindValue::Text("2024-02-01T00:00:00+01:00".into())
        );
    }

    #[test]
    fn exists_maps_to_null_checks() {
        assert_eq!(
            compile("x =ex= true").sql,
            "((data #> $1::text[]) IS NOT NULL)"
        );
        assert_eq!(compile("x =ex= false").sql, "((data #> $1::text[]) IS NULL)");
    }

    #[test]
    fn connectives_nest_with_parentheses_and_sequential_binds() {
        let p = compile("a == 1 ; (b == 2 , c =ex= false)");
        assert!(p.sql.starts_with("(COALESCE("));
        assert!(p.sql.contains(" AND ("));
        assert!(p.sql.contains(" OR "));
        assert!(p.sql.contains("$5::text[]"));
        assert_eq!(p.binds.len(), 5);
    }

    #[test]
    fn empty_groups_are_constants() {
        let compiler = SqlCompiler::default();
        assert_eq!(compiler.compile(&ConditionNode::And(vec![])).sql, "TRUE");
        assert_eq!(compiler.compile(&ConditionNode::Or(vec![])).sql, "FALSE");
    }

    #[test]
    fn compile_into_continues_numbering() {
        let node = FilterTranslator::default().translate("a == true").unwrap();
        let mut binds = vec![BindValue::BigInt(10)];
        let sql = SqlCompiler::new("doc").compile_into(&node, &mut binds);
        assert_eq!(
            sql,
            "COALESCE((doc #> $2::text[]) @> to_jsonb($3::boolean), FALSE)"
        );
        assert_eq!(binds.len(), 3);
    }
}
