//! Conversions between geosift geometries and the `geo` crate.

use geo::Geometry as GeoGeometry;
use geosift_core::error::{GeosiftError, Result};
use geosift_core::models::{Geometry, Position};
use std::str::FromStr;

fn coord(p: &Position) -> geo::Coord {
    geo::Coord { x: p.x, y: p.y }
}

fn position(c: &geo::Coord) -> Position {
    Position::new(c.x, c.y)
}

fn line(coords: &[Position]) -> geo::LineString {
    geo::LineString::new(coords.iter().map(coord).collect())
}

fn polygon(rings: &[Vec<Position>]) -> geo::Polygon {
    match rings.split_first() {
        Some((exterior, interiors)) => {
            geo::Polygon::new(line(exterior), interiors.iter().map(|ring| line(ring)).collect())
        }
        None => geo::Polygon::new(geo::LineString::new(vec![]), vec![]),
    }
}

/// Convert a canonical Geometry to a geo::Geometry
pub fn to_geo_geometry(geom: &Geometry) -> GeoGeometry {
    match geom {
        Geometry::Point { coordinates } => GeoGeometry::Point(geo::Point(coord(coordinates))),
        Geometry::LineString { coordinates } => GeoGeometry::LineString(line(coordinates)),
        Geometry::Polygon { coordinates } => GeoGeometry::Polygon(polygon(coordinates)),
        Geometry::MultiPoint { coordinates } => GeoGeometry::MultiPoint(geo::MultiPoint::new(
            coordinates.iter().map(|p| geo::Point(coord(p))).collect(),
        )),
        Geometry::MultiLineString { coordinates } => GeoGeometry::MultiLineString(
            geo::MultiLineString::new(coordinates.iter().map(|l| line(l)).collect()),
        ),
        Geometry::MultiPolygon { coordinates } => GeoGeometry::MultiPolygon(geo::MultiPolygon::new(
            coordinates.iter().map(|rings| polygon(rings)).collect(),
        )),
    }
}

fn polygon_rings(p: &geo::Polygon) -> Vec<Vec<Position>> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(|ring| ring.coords().map(position).collect())
        .collect()
}

/// Convert a geo::Geometry to a canonical Geometry
pub fn from_geo_geometry(geom: &GeoGeometry) -> Result<Geometry> {
    Ok(match geom {
        GeoGeometry::Point(p) => Geometry::Point { coordinates: position(&p.0) },
        GeoGeometry::Line(l) => {
            Geometry::LineString { coordinates: vec![position(&l.start), position(&l.end)] }
        }
        GeoGeometry::LineString(ls) => {
            Geometry::LineString { coordinates: ls.coords().map(position).collect() }
        }
        GeoGeometry::Polygon(p) => Geometry::Polygon { coordinates: polygon_rings(p) },
        GeoGeometry::MultiPoint(mp) => {
            Geometry::MultiPoint { coordinates: mp.iter().map(|p| position(&p.0)).collect() }
        }
        GeoGeometry::MultiLineString(mls) => Geometry::MultiLineString {
            coordinates: mls.iter().map(|ls| ls.coords().map(position).collect()).collect(),
        },
        GeoGeometry::MultiPolygon(mp) => {
            Geometry::MultiPolygon { coordinates: mp.iter().map(polygon_rings).collect() }
        }
        GeoGeometry::Rect(r) => Geometry::Polygon { coordinates: polygon_rings(&r.to_polygon()) },
        GeoGeometry::Triangle(t) => Geometry::Polygon { coordinates: polygon_rings(&t.to_polygon()) },
        GeoGeometry::GeometryCollection(_) => {
            return Err(GeosiftError::unsupported_geometry(
                "geometry collections are not supported",
            ))
        }
    })
}

/// Parse a WKT geometry (`POLYGON((...))`, `POINT(...)`, ...)
pub fn geometry_from_wkt(text: &str) -> Result<Geometry> {
    let parsed = wkt::Wkt::<f64>::from_str(text)
        .map_err(|e| GeosiftError::unsupported_geometry(format!("invalid WKT geometry: {}", e)))?;
    let geom: GeoGeometry = parsed
        .try_into()
        .map_err(|e: wkt::conversion::Error| {
            GeosiftError::unsupported_geometry(format!("invalid WKT geometry: {:?}", e))
        })?;
    from_geo_geometry(&geom)
}
