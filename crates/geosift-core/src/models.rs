pub mod esri;
pub mod feature;
pub mod geometry;
pub mod options;
pub mod spatial_reference;

pub use esri::EsriGeometry;
pub use feature::{parse_features, EsriFeature, Feature, OutputFeature, Properties};
pub use geometry::{Coordinates, Geometry, GeometryType, Position};
pub use options::{
    Aggregate, AggregateKind, OrderBy, OutFields, QueryGeometry, QueryOptions, SortDirection,
    SortField, SpatialRelation,
};
pub use spatial_reference::{CanonicalSr, SpatialReference, SpatialReferenceObject};
