//! Data point documents.
//!
//! The serialized form is the document that filter field paths address,
//! e.g. `header.schema_id.version.major` or `body.step_count`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use dsu_search::SchemaVersion;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub header: DataPointHeader,
    /// Schema-specific payload; never interpreted by the service
    pub body: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPointHeader {
    pub id: String,
    pub creation_date_time: DateTime<FixedOffset>,
    pub schema_id: SchemaId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_provenance: Option<AcquisitionProvenance>,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaId {
    pub namespace: String,
    pub name: String,
    pub version: SchemaVersion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionProvenance {
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<Modality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_creation_date_time: Option<DateTime<FixedOffset>>,
}

/// How a data point was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Sensed,
    SelfReported,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Sensed => "sensed",
            Modality::SelfReported => "self-reported",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "SENSED" => Ok(Modality::Sensed),
            "SELF_REPORTED" => Ok(Modality::SelfReported),
            _ => Err(format!("unknown modality '{s}'")),
        }
    }
}

impl Serialize for Modality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Modality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
