//! Request handlers for API endpoints
//!
//! Handlers extract the caller and parameters, invoke the search service,
//! and collect results into JSON responses.

pub mod data_points;
pub mod participants;

pub use data_points::*;
pub use participants::*;
