//! Structured data point search criteria.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::fields;
use crate::interval::{Bound, Interval, Timestamp};
use crate::{Error, Result};

static SCHEMA_NAMESPACE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.\-]+$").expect("valid namespace regex"));
static SCHEMA_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.\-]+$").expect("valid name regex"));
static SCHEMA_VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\.(\d+)(?:-([a-zA-Z0-9]+))?$").expect("valid version regex")
});

/// Version of the schema a data point body conforms to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl SchemaVersion {
    pub fn new(major: u32, minor: u32, qualifier: Option<String>) -> Self {
        Self {
            major,
            minor,
            qualifier,
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = SCHEMA_VERSION_PATTERN.captures(s).ok_or_else(|| {
            Error::Validation(format!(
                "schema version '{s}' must look like 'major.minor' or 'major.minor-qualifier'"
            ))
        })?;

        let component = |idx: usize, name: &str| -> Result<u32> {
            caps[idx].parse::<u32>().map_err(|_| {
                Error::Validation(format!("schema version {name} in '{s}' is out of range"))
            })
        };

        Ok(Self {
            major: component(1, "major")?,
            minor: component(2, "minor")?,
            qualifier: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(q) = &self.qualifier {
            write!(f, "-{q}")?;
        }
        Ok(())
    }
}

/// A search for the data points of one user and one schema.
///
/// Fields are bound once per request, validated, rendered, and dropped.
#[derive(Debug, Clone, Default, PartialEq, Validate, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub owner_user_id: String,

    #[validate(custom(function = "validate_schema_namespace"))]
    pub schema_namespace: String,

    #[validate(custom(function = "validate_schema_name"))]
    pub schema_name: String,

    #[validate(custom(function = "validate_schema_version"))]
    pub schema_version: Option<String>,

    pub created_on_or_after: Option<Timestamp>,
    pub created_before: Option<Timestamp>,

    /// Reserved; not rendered into filters yet.
    pub effective_on_or_after: Option<Timestamp>,
    pub effective_before: Option<Timestamp>,

    /// Validated but not rendered into filters.
    #[validate(length(min = 1, message = "must not be empty"))]
    pub acquisition_source_id: Option<String>,
}

impl SearchCriteria {
    pub fn new(
        owner_user_id: impl Into<String>,
        schema_namespace: impl Into<String>,
        schema_name: impl Into<String>,
    ) -> Self {
        Self {
            owner_user_id: owner_user_id.into(),
            schema_namespace: schema_namespace.into(),
            schema_name: schema_name.into(),
            ..Default::default()
        }
    }

    pub fn with_schema_version(mut self, version: Option<impl Into<String>>) -> Self {
        self.schema_version = version.map(Into::into);
        self
    }

    pub fn with_creation_range(
        mut self,
        on_or_after: Option<Timestamp>,
        before: Option<Timestamp>,
    ) -> Self {
        self.created_on_or_after = on_or_after;
        self.created_before = before;
        self
    }

    /// Check every structural constraint, reporting all violations at once.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(Error::from)
    }

    pub fn parsed_schema_version(&self) -> Result<Option<SchemaVersion>> {
        self.schema_version
            .as_deref()
            .map(SchemaVersion::from_str)
            .transpose()
    }

    pub fn creation_timestamp_range(&self) -> Interval {
        Interval::closed_open(self.created_on_or_after, self.created_before)
    }

    pub fn effective_timestamp_range(&self) -> Interval {
        Interval::closed_open(self.effective_on_or_after, self.effective_before)
    }

    /// Render the criteria as a conjunctive filter expression.
    ///
    /// Clause order is fixed: owner, namespace, name, version, creation range.
    pub fn render(&self) -> Result<String> {
        let mut clauses = vec![
            format!("{} == {}", fields::USER_ID, quote(&self.owner_user_id)),
            format!(
                "{} == {}",
                fields::SCHEMA_NAMESPACE,
                quote(&self.schema_namespace)
            ),
            format!("{} == {}", fields::SCHEMA_NAME, quote(&self.schema_name)),
        ];

        if let Some(version) = self.parsed_schema_version()? {
            clauses.push(format!(
                "{} == {}",
                fields::SCHEMA_VERSION_MAJOR,
                version.major
            ));
            clauses.push(format!(
                "{} == {}",
                fields::SCHEMA_VERSION_MINOR,
                version.minor
            ));
            match &version.qualifier {
                Some(q) => clauses.push(format!(
                    "{} == {}",
                    fields::SCHEMA_VERSION_QUALIFIER,
                    quote(q)
                )),
                None => clauses.push(format!(
                    "{} =ex= false",
                    fields::SCHEMA_VERSION_QUALIFIER
                )),
            }
        }

        if let Some(clause) = creation_timestamp_clause(&self.creation_timestamp_range()) {
            clauses.push(clause);
        }

        Ok(clauses.join(" and "))
    }
}

fn creation_timestamp_clause(range: &Interval) -> Option<String> {
    if range.is_unbounded() {
        return None;
    }

    let mut parts = Vec::with_capacity(2);
    if let Some(t) = range.lower.value() {
        let op = if range.lower.is_inclusive() { ">=" } else { ">" };
        parts.push(format!(
            "{} {} {}",
            fields::CREATION_DATE_TIME,
            op,
            quote(&format_timestamp(t))
        ));
    }
    if let Some(t) = range.upper.value() {
        let op = if matches!(range.upper, Bound::Included(_)) {
            "<="
        } else {
            "<"
        };
        parts.push(format!(
            "{} {} {}",
            fields::CREATION_DATE_TIME,
            op,
            quote(&format_timestamp(t))
        ));
    }
    Some(parts.join(" and "))
}

/// RFC 3339 with a `Z` suffix for UTC offsets.
pub fn format_timestamp(t: &Timestamp) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Single-quote a literal for the filter language.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn pattern_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

fn validate_schema_namespace(value: &str) -> std::result::Result<(), ValidationError> {
    if SCHEMA_NAMESPACE_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(pattern_error(
            "schema_namespace",
            format!("'{value}' is not a valid schema namespace"),
        ))
    }
}

fn validate_schema_name(value: &str) -> std::result::Result<(), ValidationError> {
    if SCHEMA_NAME_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(pattern_error(
            "schema_name",
            format!("'{value}' is not a valid schema name"),
        ))
    }
}

fn validate_schema_version(value: &str) -> std::result::Result<(), ValidationError> {
    SchemaVersion::from_str(value)
        .map(|_| ())
        .map_err(|_| {
            pattern_error(
                "schema_version",
                format!("'{value}' is not a valid schema version"),
            )
        })
}
