//! Filter-language translation.
//!
//! Callers write filters such as
//! `header.schema_id.name == 'step-count' && body.step_count > 1000`.
//! The translator rewrites the caller-facing `&&` / `||` connectives to the
//! grammar's `;` / `,`, parses the result, and coerces every literal through
//! the configured [`LiteralCoercion`] chain.

mod ast;
mod coerce;
mod parser;

use std::borrow::Cow;

pub use ast::{ComparisonOp, ConditionNode, FieldPath, Literal};
pub use coerce::{
    best_effort, parse_offset_timestamp, Converter, FieldType, FieldTypeResolver,
    LiteralCoercion, OpaqueFieldResolver,
};
pub use parser::MAX_NESTING_DEPTH;

use crate::Result;

/// Parses filter fragments into [`ConditionNode`] trees.
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug)]
pub struct FilterTranslator {
    coercion: LiteralCoercion,
    resolver: Box<dyn FieldTypeResolver>,
}

impl Default for FilterTranslator {
    fn default() -> Self {
        Self::new(LiteralCoercion::standard(), Box::new(OpaqueFieldResolver))
    }
}

impl FilterTranslator {
    pub fn new(coercion: LiteralCoercion, resolver: Box<dyn FieldTypeResolver>) -> Self {
        Self { coercion, resolver }
    }

    pub fn translate(&self, filter: &str) -> Result<ConditionNode> {
        let normalized = normalize_connectives(filter);
        let node = parser::Parser::new(&normalized, &self.coercion, self.resolver.as_ref())
            .parse()?;
        tracing::trace!(
            filter = %normalized,
            tests = node.leaf_count(),
            "translated filter"
        );
        Ok(node)
    }
}

/// Rewrite `&&` to `;` and `||` to `,` outside quoted arguments.
pub fn normalize_connectives(input: &str) -> Cow<'_, str> {
    if !input.contains("&&") && !input.contains("||") {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '&' if chars.peek() == Some(&'&') => {
                    chars.next();
                    out.push(';');
                }
                '|' if chars.peek() == Some(&'|') => {
                    chars.next();
                    out.push(',');
                }
                _ => out.push(c),
            },
        }
    }
    Cow::Owned(out)
}
