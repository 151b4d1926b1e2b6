use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interval::Timestamp;
use crate::{Error, Result};

/// Dot-separated path into a data point document, e.g. `header.user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::parse(0, "empty field path"));
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::parse(0, format!("empty segment in field path '{raw}'")));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn dotted(&self) -> String {
        self.0.join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// A filter literal after coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Timestamp(Timestamp),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Timestamp(_) => "timestamp",
            Self::Integer(_) | Self::Float(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::String(_) => "string",
        }
    }
}

/// Structured condition tree produced by the filter translator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionNode {
    Comparison {
        field: FieldPath,
        op: ComparisonOp,
        value: Literal,
    },
    Exists {
        field: FieldPath,
        present: bool,
    },
    And(Vec<ConditionNode>),
    Or(Vec<ConditionNode>),
}

impl ConditionNode {
    /// Conjunction that collapses to its only child.
    pub fn all(mut children: Vec<ConditionNode>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Self::And(children)
        }
    }

    /// Disjunction that collapses to its only child.
    pub fn any(mut children: Vec<ConditionNode>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Self::Or(children)
        }
    }

    /// Number of comparison and existence tests in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Comparison { .. } | Self::Exists { .. } => 1,
            Self::And(children) | Self::Or(children) => {
                children.iter().map(ConditionNode::leaf_count).sum()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_path_splits_on_dots() {
        let p = FieldPath::parse("header.schema_id.name").unwrap();
        assert_eq!(p.segments(), ["header", "schema_id", "name"]);
        assert_eq!(p.to_string(), "header.schema_id.name");
    }

    #[test]
    fn field_path_rejects_empty_segments() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("header..name").is_err());
        assert!(FieldPath::parse(".header").is_err());
    }

    #[test]
    fn single_child_groups_collapse() {
        let leaf = ConditionNode::Exists {
            field: FieldPath::parse("a").unwrap(),
            present: true,
        };
        assert_eq!(ConditionNode::all(vec![leaf.clone()]), leaf);
        assert_eq!(ConditionNode::any(vec![leaf.clone()]), leaf);
        assert_eq!(
            ConditionNode::all(vec![leaf.clone(), leaf.clone()]).leaf_count(),
            2
        );
    }
}
