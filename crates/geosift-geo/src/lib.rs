//! Geosift Geo - Spatial references, projection, and geometry conventions
//!
//! This crate resolves spatial reference descriptors, reprojects geometries
//! through a pluggable transform provider, converts between the GeoJSON and
//! Esri geometry conventions, and evaluates spatial relations.

pub mod convert;
pub mod models;
pub mod projector;
pub mod reference;
pub mod spatial;
pub mod transform;
pub mod validation;

pub use convert::{from_esri, from_esri_as, to_esri};
pub use projector::Projector;
pub use reference::resolve;
pub use spatial::{GeoRelations, RelationProvider, SpatialFilter};
pub use transform::{CoordinateTransform, ProjTransforms, TransformProvider};
