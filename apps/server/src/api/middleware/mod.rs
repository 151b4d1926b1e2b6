//! Middleware stack for the API

pub mod layers;

pub use layers::{cors, propagate_request_id, set_request_id, trace};
