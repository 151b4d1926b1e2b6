//! Domain models for the search service

pub mod data_point;

pub use data_point::{AcquisitionProvenance, DataPoint, DataPointHeader, Modality, SchemaId};
