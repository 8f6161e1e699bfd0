//! Geosift Core - Domain models, errors, and configuration
//!
//! This crate contains the feature and geometry model shared by the geometry
//! and query crates, the query option surface, and the layered engine
//! configuration.

pub mod config;
pub mod error;
pub mod models;

pub use error::{GeosiftError, Result};
