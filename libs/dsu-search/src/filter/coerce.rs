//! Literal coercion and field-type resolution.

use std::fmt;

use chrono::DateTime;

use super::ast::{FieldPath, Literal};
use crate::interval::Timestamp;
use crate::{Error, Result};

/// Declared type of a field, as reported by a [`FieldTypeResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Type unknown; literals go through the coercion chain.
    Opaque,
    Timestamp,
    Number,
    Boolean,
    String,
}

/// Resolves the declared type of a field path.
pub trait FieldTypeResolver: fmt::Debug + Send + Sync {
    fn resolve(&self, path: &FieldPath) -> FieldType;
}

/// Data point bodies are schema-polymorphic, so no path has a static type.
///
/// Every field is [`FieldType::Opaque`]: paths are never checked for
/// existence and operators are never checked against a declared type.
/// A path that does not exist yields a predicate that matches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueFieldResolver;

impl FieldTypeResolver for OpaqueFieldResolver {
    fn resolve(&self, _path: &FieldPath) -> FieldType {
        FieldType::Opaque
    }
}

/// One conversion attempt in the coercion chain.
#[derive(Clone, Copy)]
pub struct Converter {
    pub name: &'static str,
    /// Whether the converter also runs on quoted literals.
    pub applies_to_quoted: bool,
    pub convert: fn(&str) -> Option<Literal>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("name", &self.name)
            .field("applies_to_quoted", &self.applies_to_quoted)
            .finish()
    }
}

/// Ordered list of converters; the first one that succeeds wins.
#[derive(Debug, Clone)]
pub struct LiteralCoercion {
    converters: Vec<Converter>,
}

impl Default for LiteralCoercion {
    fn default() -> Self {
        Self::standard()
    }
}

impl LiteralCoercion {
    /// Offset timestamp first, then best-effort number/boolean/string.
    pub fn standard() -> Self {
        Self::new(vec![
            Converter {
                name: "offset-timestamp",
                applies_to_quoted: true,
                convert: |raw| parse_offset_timestamp(raw).map(Literal::Timestamp),
            },
            Converter {
                name: "best-effort",
                applies_to_quoted: false,
                convert: |raw| Some(best_effort(raw)),
            },
        ])
    }

    pub fn new(converters: Vec<Converter>) -> Self {
        Self { converters }
    }

    pub fn converters(&self) -> &[Converter] {
        &self.converters
    }

    /// Coerce a raw argument for a field of the given type.
    ///
    /// Quoted arguments that no quote-aware converter accepts stay strings.
    pub fn coerce(&self, raw: &str, quoted: bool, target: FieldType) -> Result<Literal> {
        match target {
            FieldType::Opaque => Ok(self
                .converters
                .iter()
                .filter(|c| !quoted || c.applies_to_quoted)
                .find_map(|c| (c.convert)(raw))
                .unwrap_or_else(|| Literal::String(raw.to_string()))),
            FieldType::Timestamp => parse_offset_timestamp(raw)
                .map(Literal::Timestamp)
                .ok_or_else(|| type_mismatch(raw, "timestamp")),
            FieldType::Number => match best_effort(raw) {
                lit @ (Literal::Integer(_) | Literal::Float(_)) => Ok(lit),
                _ => Err(type_mismatch(raw, "number")),
            },
            FieldType::Boolean => parse_bool(raw)
                .map(Literal::Boolean)
                .ok_or_else(|| type_mismatch(raw, "boolean")),
            FieldType::String => Ok(Literal::String(raw.to_string())),
        }
    }
}

fn type_mismatch(raw: &str, expected: &str) -> Error {
    Error::parse(0, format!("'{raw}' is not a valid {expected}"))
}

/// ISO-8601 timestamp with offset. Seconds may be omitted.
pub fn parse_offset_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t);
    }

    // 2024-01-01T10:15Z / 2024-01-01T10:15+02:00
    let (date, time) = raw.split_once('T')?;
    let hm = time.get(..5)?;
    let offset = time.get(5..)?;
    if offset.starts_with(':') || offset.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(&format!("{date}T{hm}:00{offset}")).ok()
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Integer, then finite float, then boolean, else string.
pub fn best_effort(raw: &str) -> Literal {
    if let Ok(i) = raw.parse::<i64>() {
        return Literal::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Literal::Float(f);
        }
    }
    if let Some(b) = parse_bool(raw) {
        return Literal::Boolean(b);
    }
    Literal::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(raw: &str, quoted: bool) -> Literal {
        LiteralCoercion::standard()
            .coerce(raw, quoted, FieldType::Opaque)
            .unwrap()
    }

    #[test]
    fn timestamps_win_over_best_effort() {
        assert!(matches!(
            opaque("2024-01-01T00:00:00Z", false),
            Literal::Timestamp(_)
        ));
        assert!(matches!(
            opaque("2024-01-01T00:00:00+02:00", true),
            Literal::Timestamp(_)
        ));
    }

    #[test]
    fn timestamps_without_seconds_are_accepted() {
        let t = parse_offset_timestamp("2024-01-01T10:15Z").unwrap();
        assert_eq!(t, DateTime::parse_from_rfc3339("2024-01-01T10:15:00Z").unwrap());
        assert!(parse_offset_timestamp("2024-01-01T10:15").is_none());
        assert!(parse_offset_timestamp("2024-01-01").is_none());
    }

    #[test]
    fn best_effort_order() {
        assert_eq!(opaque("42", false), Literal::Integer(42));
        assert_eq!(opaque("-3", false), Literal::Integer(-3));
        assert_eq!(opaque("2.5", false), Literal::Float(2.5));
        assert_eq!(opaque("TRUE", false), Literal::Boolean(true));
        assert_eq!(opaque("NaN", false), Literal::String("NaN".into()));
        assert_eq!(opaque("steps", false), Literal::String("steps".into()));
    }

    #[test]
    fn quoted_literals_only_become_timestamps() {
        assert_eq!(opaque("123", true), Literal::String("123".into()));
        assert_eq!(opaque("true", true), Literal::String("true".into()));
    }

    #[test]
    fn typed_fields_reject_mismatched_literals() {
        let chain = LiteralCoercion::standard();
        assert!(chain.coerce("abc", false, FieldType::Number).is_err());
        assert!(chain.coerce("yes", false, FieldType::Boolean).is_err());
        assert!(chain.coerce("2024", false, FieldType::Timestamp).is_err());
        assert_eq!(
            chain.coerce("12", false, FieldType::String).unwrap(),
            Literal::String("12".into())
        );
    }

    #[test]
    fn opaque_resolver_never_types_a_field() {
        let path = FieldPath::parse("body.effective_time_frame.date_time").unwrap();
        assert_eq!(OpaqueFieldResolver.resolve(&path), FieldType::Opaque);
    }
}
