//! Esri JSON geometry representation (the ring/path convention).
//!
//! Rings are stored outer-clockwise with counter-clockwise holes; conversion
//! to and from [`Geometry`](super::Geometry) lives in `geosift-geo`.

use super::geometry::{deserialize_axis, serialize_axis, Position};
use super::spatial_reference::SpatialReference;
use serde::{Deserialize, Serialize};

/// Esri JSON geometry.
///
/// The variants are distinguished by their member names (`x`/`y`, `points`,
/// `paths`, `rings`, `xmin`...), matching how Esri services emit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EsriGeometry {
    Point {
        #[serde(serialize_with = "serialize_axis", deserialize_with = "deserialize_axis")]
        x: f64,
        #[serde(serialize_with = "serialize_axis", deserialize_with = "deserialize_axis")]
        y: f64,
        #[serde(rename = "spatialReference", default, skip_serializing_if = "Option::is_none")]
        spatial_reference: Option<SpatialReference>,
    },
    MultiPoint {
        points: Vec<Position>,
        #[serde(rename = "spatialReference", default, skip_serializing_if = "Option::is_none")]
        spatial_reference: Option<SpatialReference>,
    },
    Polyline {
        paths: Vec<Vec<Position>>,
        #[serde(rename = "spatialReference", default, skip_serializing_if = "Option::is_none")]
        spatial_reference: Option<SpatialReference>,
    },
    Polygon {
        rings: Vec<Vec<Position>>,
        #[serde(rename = "spatialReference", default, skip_serializing_if = "Option::is_none")]
        spatial_reference: Option<SpatialReference>,
    },
    Envelope {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
        #[serde(rename = "spatialReference", default, skip_serializing_if = "Option::is_none")]
        spatial_reference: Option<SpatialReference>,
    },
}

impl EsriGeometry {
    /// Untagged point
    pub fn point(x: f64, y: f64) -> Self {
        EsriGeometry::Point { x, y, spatial_reference: None }
    }

    /// Untagged polygon from raw rings
    pub fn polygon(rings: Vec<Vec<Position>>) -> Self {
        EsriGeometry::Polygon { rings, spatial_reference: None }
    }

    /// Untagged envelope
    pub fn envelope(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        EsriGeometry::Envelope { xmin, ymin, xmax, ymax, spatial_reference: None }
    }

    /// The spatial reference this geometry declares, if any
    pub fn spatial_reference(&self) -> Option<&SpatialReference> {
        match self {
            EsriGeometry::Point { spatial_reference, .. }
            | EsriGeometry::MultiPoint { spatial_reference, .. }
            | EsriGeometry::Polyline { spatial_reference, .. }
            | EsriGeometry::Polygon { spatial_reference, .. }
            | EsriGeometry::Envelope { spatial_reference, .. } => spatial_reference.as_ref(),
        }
    }

    /// Rings when this is a polygon
    pub fn rings(&self) -> Option<&[Vec<Position>]> {
        match self {
            EsriGeometry::Polygon { rings, .. } => Some(rings),
            _ => None,
        }
    }

    /// Paths when this is a polyline
    pub fn paths(&self) -> Option<&[Vec<Position>]> {
        match self {
            EsriGeometry::Polyline { paths, .. } => Some(paths),
            _ => None,
        }
    }
}
