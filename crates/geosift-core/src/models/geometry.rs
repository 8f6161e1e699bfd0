//! Canonical geometry types used across all geosift crates.
//!
//! These types follow the GeoJSON coordinate-array convention. A coordinate
//! axis may hold a non-finite placeholder (JSON `null` on the wire, NaN in
//! memory); such positions are carried through every stage untouched.

use crate::error::{GeosiftError, Result};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A coordinate pair. Either axis may be a non-finite placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The placeholder read from `[null, null]`
    pub fn placeholder() -> Self {
        Self { x: f64::NAN, y: f64::NAN }
    }

    /// True when both axes are usable numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Equality that treats two placeholders in the same axis as equal.
    pub fn same_as(&self, other: &Position) -> bool {
        fn axis_eq(a: f64, b: f64) -> bool {
            a == b || (a.is_nan() && b.is_nan())
        }
        axis_eq(self.x, other.x) && axis_eq(self.y, other.y)
    }

    fn from_json(value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| {
            GeosiftError::unsupported_geometry(format!("expected a coordinate pair, found {}", value))
        })?;
        if items.len() < 2 {
            return Err(GeosiftError::unsupported_geometry(format!(
                "coordinate pair needs at least 2 values, found {}",
                items.len()
            )));
        }
        Ok(Self { x: axis_from_json(&items[0])?, y: axis_from_json(&items[1])? })
    }
}

impl From<[f64; 2]> for Position {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

fn axis_from_json(value: &Value) -> Result<f64> {
    match value {
        Value::Null => Ok(f64::NAN),
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            GeosiftError::unsupported_geometry(format!("coordinate {} is not representable", n))
        }),
        other => Err(GeosiftError::unsupported_geometry(format!(
            "coordinate must be a number or null, found {}",
            other
        ))),
    }
}

/// Serializes a single axis, writing placeholders as `null`.
pub(crate) fn serialize_axis<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

/// Deserializes a single axis, reading `null` as the NaN placeholder.
pub(crate) fn deserialize_axis<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Axis(f64);
        impl Serialize for Axis {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serialize_axis(&self.0, serializer)
            }
        }

        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&Axis(self.x))?;
        seq.serialize_element(&Axis(self.y))?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Position::from_json(&value).map_err(de::Error::custom)
    }
}

/// Nested coordinate structures: a position, or a sequence of a nested
/// structure one level shallower.
///
/// Every geometry kind is walked through this one trait, so the nesting depth
/// (position 0, line 1, polygon 2, multipolygon 3) is carried by the type and
/// per-position rules are applied identically at every depth.
pub trait Coordinates: Sized {
    /// Rebuild the structure with every position passed through `f`.
    fn try_map_positions<F>(&self, f: &mut F) -> Result<Self>
    where
        F: FnMut(Position) -> Result<Position>;

    /// Visit every position in order.
    fn for_each_position<F: FnMut(&Position)>(&self, f: &mut F);

    /// Parse the structure from a GeoJSON coordinates array.
    fn from_json(value: &Value) -> Result<Self>;
}

impl Coordinates for Position {
    fn try_map_positions<F>(&self, f: &mut F) -> Result<Self>
    where
        F: FnMut(Position) -> Result<Position>,
    {
        f(*self)
    }

    fn for_each_position<F: FnMut(&Position)>(&self, f: &mut F) {
        f(self)
    }

    fn from_json(value: &Value) -> Result<Self> {
        Position::from_json(value)
    }
}

impl<T: Coordinates> Coordinates for Vec<T> {
    fn try_map_positions<F>(&self, f: &mut F) -> Result<Self>
    where
        F: FnMut(Position) -> Result<Position>,
    {
        self.iter().map(|inner| inner.try_map_positions(f)).collect()
    }

    fn for_each_position<F: FnMut(&Position)>(&self, f: &mut F) {
        for inner in self {
            inner.for_each_position(f);
        }
    }

    fn from_json(value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| {
            GeosiftError::unsupported_geometry(format!("expected a coordinate array, found {}", value))
        })?;
        items.iter().map(T::from_json).collect()
    }
}

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

impl GeometryType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(GeometryType::Point),
            "LineString" => Some(GeometryType::LineString),
            "Polygon" => Some(GeometryType::Polygon),
            "MultiPoint" => Some(GeometryType::MultiPoint),
            "MultiLineString" => Some(GeometryType::MultiLineString),
            "MultiPolygon" => Some(GeometryType::MultiPolygon),
            _ => None,
        }
    }
}

/// GeoJSON-compatible geometry representation
///
/// Serializes as a GeoJSON geometry object. Deserialization goes through
/// [`Geometry::from_value`] so unknown types and malformed coordinate arrays
/// surface as [`GeosiftError::UnsupportedGeometry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    LineString { coordinates: Vec<Position> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPoint { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

impl Geometry {
    /// Create a Point geometry
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { coordinates: Position::new(x, y) }
    }

    /// Create a LineString geometry
    pub fn line_string(coords: Vec<[f64; 2]>) -> Self {
        Geometry::LineString { coordinates: positions(coords) }
    }

    /// Create a Polygon geometry
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates: rings.into_iter().map(positions).collect() }
    }

    /// Create a MultiPolygon geometry
    pub fn multi_polygon(polygons: Vec<Vec<Vec<[f64; 2]>>>) -> Self {
        Geometry::MultiPolygon {
            coordinates: polygons
                .into_iter()
                .map(|rings| rings.into_iter().map(positions).collect())
                .collect(),
        }
    }

    /// Get the geometry type
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } => GeometryType::Point,
            Geometry::LineString { .. } => GeometryType::LineString,
            Geometry::Polygon { .. } => GeometryType::Polygon,
            Geometry::MultiPoint { .. } => GeometryType::MultiPoint,
            Geometry::MultiLineString { .. } => GeometryType::MultiLineString,
            Geometry::MultiPolygon { .. } => GeometryType::MultiPolygon,
        }
    }

    /// Rebuild the geometry with every position passed through `f`.
    pub fn try_map_positions<F>(&self, mut f: F) -> Result<Geometry>
    where
        F: FnMut(Position) -> Result<Position>,
    {
        Ok(match self {
            Geometry::Point { coordinates } => {
                Geometry::Point { coordinates: coordinates.try_map_positions(&mut f)? }
            }
            Geometry::LineString { coordinates } => {
                Geometry::LineString { coordinates: coordinates.try_map_positions(&mut f)? }
            }
            Geometry::Polygon { coordinates } => {
                Geometry::Polygon { coordinates: coordinates.try_map_positions(&mut f)? }
            }
            Geometry::MultiPoint { coordinates } => {
                Geometry::MultiPoint { coordinates: coordinates.try_map_positions(&mut f)? }
            }
            Geometry::MultiLineString { coordinates } => {
                Geometry::MultiLineString { coordinates: coordinates.try_map_positions(&mut f)? }
            }
            Geometry::MultiPolygon { coordinates } => {
                Geometry::MultiPolygon { coordinates: coordinates.try_map_positions(&mut f)? }
            }
        })
    }

    /// Visit every position in order.
    pub fn for_each_position<F: FnMut(&Position)>(&self, mut f: F) {
        match self {
            Geometry::Point { coordinates } => coordinates.for_each_position(&mut f),
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.for_each_position(&mut f)
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.for_each_position(&mut f)
            }
            Geometry::MultiPolygon { coordinates } => coordinates.for_each_position(&mut f),
        }
    }

    /// True when any position holds a placeholder axis
    pub fn has_placeholder(&self) -> bool {
        let mut found = false;
        self.for_each_position(|p| found |= !p.is_finite());
        found
    }

    /// Parse a GeoJSON geometry object
    pub fn from_value(value: &Value) -> Result<Self> {
        let type_name = value.get("type").and_then(Value::as_str).ok_or_else(|| {
            GeosiftError::unsupported_geometry("geometry object has no 'type' member")
        })?;
        let kind = GeometryType::parse(type_name).ok_or_else(|| {
            GeosiftError::unsupported_geometry(format!("geometry type '{}' is not supported", type_name))
        })?;
        let coords = value.get("coordinates").ok_or_else(|| {
            GeosiftError::unsupported_geometry(format!("{} has no 'coordinates' member", type_name))
        })?;

        Ok(match kind {
            GeometryType::Point => Geometry::Point { coordinates: Coordinates::from_json(coords)? },
            GeometryType::LineString => {
                Geometry::LineString { coordinates: Coordinates::from_json(coords)? }
            }
            GeometryType::Polygon => Geometry::Polygon { coordinates: Coordinates::from_json(coords)? },
            GeometryType::MultiPoint => {
                Geometry::MultiPoint { coordinates: Coordinates::from_json(coords)? }
            }
            GeometryType::MultiLineString => {
                Geometry::MultiLineString { coordinates: Coordinates::from_json(coords)? }
            }
            GeometryType::MultiPolygon => {
                Geometry::MultiPolygon { coordinates: Coordinates::from_json(coords)? }
            }
        })
    }

    /// Convert to serde_json::Value (GeoJSON)
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl<'de> Deserialize<'de> for Geometry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Geometry::from_value(&value).map_err(de::Error::custom)
    }
}

fn positions(coords: Vec<[f64; 2]>) -> Vec<Position> {
    coords.into_iter().map(Position::from).collect()
}
