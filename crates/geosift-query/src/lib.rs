//! Geosift Query - Attribute filtering and query orchestration
//!
//! This crate compiles where clauses into predicate trees, orders and
//! aggregates result rows, and runs the full query pipeline over an
//! in-memory feature collection.

pub mod aggregate;
pub mod filter;
pub mod pipeline;
pub mod sort;

pub use filter::{compile, FilterNode};
pub use pipeline::QueryPipeline;

use geosift_core::error::Result;
use geosift_core::models::{Feature, OutputFeature, QueryOptions};

/// Query WGS 84 features with the default providers
pub fn query(features: &[Feature], options: &QueryOptions) -> Result<Vec<OutputFeature>> {
    QueryPipeline::default().execute(features, options)
}
