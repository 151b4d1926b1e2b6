//! Service layer between the HTTP handlers and the stores

pub mod search;

pub use search::{DataPointSearch, Page, SearchRequest, SearchService};
