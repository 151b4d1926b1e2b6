//! Document-shaped predicates.
//!
//! The rendering follows the usual document-store query dialect:
//! `{"header.user_id": {"$eq": "u1"}}`, `{"$and": [...]}`,
//! `{"x": {"$exists": false}}`. Timestamps are wrapped as
//! `{"$date": "<rfc3339>"}` so they compare as instants rather than text.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::PredicateCompiler;
use crate::criteria::format_timestamp;
use crate::filter::{parse_offset_timestamp, ComparisonOp, ConditionNode, Literal};

/// A compiled document predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentPredicate(Value);

impl DocumentPredicate {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Evaluate the predicate against a document.
    ///
    /// Equality on an array field matches when any element matches.
    /// Ordering and timestamp tests only match scalar values, as in the
    /// JSONB store. `$ne` matches documents that lack the field.
    pub fn matches(&self, doc: &Value) -> bool {
        eval(&self.0, doc)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCompiler;

impl DocumentCompiler {
    fn render(node: &ConditionNode) -> Value {
        match node {
            ConditionNode::Comparison { field, op, value } => {
                let mut test = Map::new();
                test.insert(operator_key(*op).to_string(), literal_value(value));
                field_test(field.dotted(), Value::Object(test))
            }
            ConditionNode::Exists { field, present } => {
                field_test(field.dotted(), json!({ "$exists": present }))
            }
            ConditionNode::And(children) => {
                json!({ "$and": children.iter().map(Self::render).collect::<Vec<_>>() })
            }
            ConditionNode::Or(children) => {
                json!({ "$or": children.iter().map(Self::render).collect::<Vec<_>>() })
            }
        }
    }
}

impl PredicateCompiler for DocumentCompiler {
    type Predicate = DocumentPredicate;

    fn compile(&self, node: &ConditionNode) -> DocumentPredicate {
        DocumentPredicate(Self::render(node))
    }
}

fn field_test(path: String, test: Value) -> Value {
    let mut obj = Map::new();
    obj.insert(path, test);
    Value::Object(obj)
}

fn operator_key(op: ComparisonOp) -> &'static str {
    match op {
        ComparisonOp::Eq => "$eq",
        ComparisonOp::Ne => "$ne",
        ComparisonOp::Gt => "$gt",
        ComparisonOp::Ge => "$gte",
        ComparisonOp::Lt => "$lt",
        ComparisonOp::Le => "$lte",
    }
}

fn literal_value(value: &Literal) -> Value {
    match value {
        Literal::Timestamp(t) => json!({ "$date": format_timestamp(t) }),
        Literal::Integer(i) => json!(i),
        Literal::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Literal::Boolean(b) => json!(b),
        Literal::String(s) => json!(s),
    }
}

fn eval(predicate: &Value, doc: &Value) -> bool {
    let Some(obj) = predicate.as_object() else {
        return false;
    };
    obj.iter().all(|(key, test)| match key.as_str() {
        "$and" => test
            .as_array()
            .is_some_and(|tests| tests.iter().all(|t| eval(t, doc))),
        "$or" => test
            .as_array()
            .is_some_and(|tests| tests.iter().any(|t| eval(t, doc))),
        path => eval_field(resolve_path(doc, path), test),
    })
}

fn eval_field(value: Option<&Value>, test: &Value) -> bool {
    let Some(ops) = test.as_object() else {
        return false;
    };
    ops.iter().all(|(op, operand)| {
        let scalar_only = (op != "$eq" && op != "$ne") || operand.get("$date").is_some();
        let test = |accept: fn(Ordering) -> bool| {
            value.is_some_and(|v| match v {
                Value::Array(_) if scalar_only => false,
                v => elements(v).any(|e| compare(e, operand).is_some_and(accept)),
            })
        };
        match op.as_str() {
            "$exists" => operand.as_bool() == Some(value.is_some()),
            "$eq" => test(Ordering::is_eq),
            "$ne" => !test(Ordering::is_eq),
            "$gt" => test(Ordering::is_gt),
            "$gte" => test(Ordering::is_ge),
            "$lt" => test(Ordering::is_lt),
            "$lte" => test(Ordering::is_le),
            _ => false,
        }
    })
}

/// The value itself, or its elements when it is an array.
fn elements(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Array(items) => Box::new(items.iter()),
        other => Box::new(std::iter::once(other)),
    }
}

/// Resolve a dot-separated path. `None` if any segment is missing.
fn resolve_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| current.get(segment))
}

/// Ordering of a document value relative to an operand, if comparable.
fn compare(value: &Value, operand: &Value) -> Option<Ordering> {
    if let Some(date) = operand.get("$date").and_then(Value::as_str) {
        let expected = parse_offset_timestamp(date)?;
        let actual = parse_offset_timestamp(value.as_str()?)?;
        return Some(actual.cmp(&expected));
    }
    match (value, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
