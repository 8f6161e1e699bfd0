//! Conversion between the GeoJSON and Esri geometry conventions.
//!
//! GeoJSON wants outer rings counter-clockwise and holes clockwise; Esri
//! wants the opposite. Each ring's winding is read from its signed area and
//! the ring is reversed only when it disagrees with its role.
//!
//! Esri has no single/multi distinction, so [`from_esri_as`] takes the kind
//! the caller expects back. Rings are normalized, not mirrored: a GeoJSON
//! polygon already following the right-hand rule survives a round trip
//! unchanged, one wound the other way comes back reoriented.

use crate::validation::ensure_valid;
use geosift_core::error::{GeosiftError, Result};
use geosift_core::models::{EsriGeometry, Geometry, GeometryType, Position};
use tracing::debug;

/// Shoelace signed area; positive for counter-clockwise rings.
///
/// NaN when the ring holds a placeholder position.
pub fn signed_area(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for pair in ring.windows(2) {
        sum += pair[0].x * pair[1].y - pair[1].x * pair[0].y;
    }
    // Close the ring when the caller left it open
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if !first.same_as(last) {
            sum += last.x * first.y - first.x * last.y;
        }
    }
    sum / 2.0
}

pub fn is_clockwise(ring: &[Position]) -> bool {
    signed_area(ring) < 0.0
}

/// Orient a ring; rings whose winding can't be determined are kept as-is.
fn oriented(ring: &[Position], clockwise: bool) -> Vec<Position> {
    let area = signed_area(ring);
    let mut ring = ring.to_vec();
    if area.is_finite() && area != 0.0 && (area < 0.0) != clockwise {
        ring.reverse();
    }
    ring
}

fn polygon_to_rings(rings: &[Vec<Position>], out: &mut Vec<Vec<Position>>) {
    for (i, ring) in rings.iter().enumerate() {
        // First ring of each part is the outer ring
        out.push(oriented(ring, i == 0));
    }
}

/// GeoJSON geometry to its Esri form.
///
/// Open or short rings fail with `UnsupportedGeometry`, as they do going
/// the other way.
pub fn to_esri(geometry: &Geometry) -> Result<EsriGeometry> {
    ensure_valid(geometry)?;
    Ok(match geometry {
        Geometry::Point { coordinates } => EsriGeometry::point(coordinates.x, coordinates.y),
        Geometry::MultiPoint { coordinates } => {
            EsriGeometry::MultiPoint { points: coordinates.clone(), spatial_reference: None }
        }
        Geometry::LineString { coordinates } => {
            EsriGeometry::Polyline { paths: vec![coordinates.clone()], spatial_reference: None }
        }
        Geometry::MultiLineString { coordinates } => {
            EsriGeometry::Polyline { paths: coordinates.clone(), spatial_reference: None }
        }
        Geometry::Polygon { coordinates } => {
            let mut rings = Vec::with_capacity(coordinates.len());
            polygon_to_rings(coordinates, &mut rings);
            EsriGeometry::polygon(rings)
        }
        Geometry::MultiPolygon { coordinates } => {
            let mut rings = Vec::new();
            for polygon in coordinates {
                polygon_to_rings(polygon, &mut rings);
            }
            EsriGeometry::polygon(rings)
        }
    })
}

/// Esri geometry to its GeoJSON form
pub fn from_esri(geometry: &EsriGeometry) -> Result<Geometry> {
    match geometry {
        EsriGeometry::Point { x, y, .. } => Ok(Geometry::Point { coordinates: Position::new(*x, *y) }),
        EsriGeometry::MultiPoint { points, .. } => {
            Ok(Geometry::MultiPoint { coordinates: points.clone() })
        }
        EsriGeometry::Polyline { paths, .. } => {
            if let Some(short) = paths.iter().position(|path| path.len() < 2) {
                return Err(GeosiftError::unsupported_geometry(format!(
                    "path {} has fewer than 2 positions",
                    short
                )));
            }
            match paths.as_slice() {
                [] => Err(GeosiftError::unsupported_geometry("polyline has no paths")),
                [single] => Ok(Geometry::LineString { coordinates: single.clone() }),
                _ => Ok(Geometry::MultiLineString { coordinates: paths.clone() }),
            }
        }
        EsriGeometry::Polygon { rings, .. } => rings_to_polygon(rings),
        EsriGeometry::Envelope { xmin, ymin, xmax, ymax, .. } => Ok(envelope_polygon(*xmin, *ymin, *xmax, *ymax)),
    }
}

/// Esri geometry to a GeoJSON geometry of a given kind.
///
/// Single and multi forms of the same family convert into each other; a
/// multi form only collapses when it holds exactly one part.
pub fn from_esri_as(geometry: &EsriGeometry, kind: GeometryType) -> Result<Geometry> {
    let geometry = from_esri(geometry)?;
    let found = geometry.geometry_type();
    if found == kind {
        return Ok(geometry);
    }

    let converted = match (geometry, kind) {
        (Geometry::Point { coordinates }, GeometryType::MultiPoint) => {
            Some(Geometry::MultiPoint { coordinates: vec![coordinates] })
        }
        (Geometry::MultiPoint { coordinates }, GeometryType::Point) => {
            single(coordinates).map(|coordinates| Geometry::Point { coordinates })
        }
        (Geometry::LineString { coordinates }, GeometryType::MultiLineString) => {
            Some(Geometry::MultiLineString { coordinates: vec![coordinates] })
        }
        (Geometry::MultiLineString { coordinates }, GeometryType::LineString) => {
            single(coordinates).map(|coordinates| Geometry::LineString { coordinates })
        }
        (Geometry::Polygon { coordinates }, GeometryType::MultiPolygon) => {
            Some(Geometry::MultiPolygon { coordinates: vec![coordinates] })
        }
        (Geometry::MultiPolygon { coordinates }, GeometryType::Polygon) => {
            single(coordinates).map(|coordinates| Geometry::Polygon { coordinates })
        }
        _ => None,
    };

    converted.ok_or_else(|| {
        GeosiftError::unsupported_geometry(format!("{:?} cannot be read as {:?}", found, kind))
    })
}

fn single<T>(mut parts: Vec<T>) -> Option<T> {
    if parts.len() == 1 {
        parts.pop()
    } else {
        None
    }
}

/// Counter-clockwise closed rectangle
pub fn envelope_polygon(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Geometry {
    Geometry::polygon(vec![vec![[xmin, ymin], [xmax, ymin], [xmax, ymax], [xmin, ymax], [xmin, ymin]]])
}

fn check_ring(index: usize, ring: &[Position]) -> Result<()> {
    if ring.len() < 4 {
        return Err(GeosiftError::unsupported_geometry(format!(
            "ring {} has {} positions, at least 4 are required",
            index,
            ring.len()
        )));
    }
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if !first.same_as(last) {
            return Err(GeosiftError::unsupported_geometry(format!("ring {} is not closed", index)));
        }
    }
    Ok(())
}

fn rings_to_polygon(rings: &[Vec<Position>]) -> Result<Geometry> {
    if rings.is_empty() {
        return Err(GeosiftError::unsupported_geometry("polygon has no rings"));
    }
    for (index, ring) in rings.iter().enumerate() {
        check_ring(index, ring)?;
    }

    // Clockwise rings (and rings of unknown winding) are outer rings
    let (outers, holes): (Vec<&Vec<Position>>, Vec<&Vec<Position>>) =
        rings.iter().partition(|ring| !(signed_area(ring) > 0.0));

    let mut polygons: Vec<Vec<Vec<Position>>> =
        outers.iter().map(|outer| vec![oriented(outer, false)]).collect();

    if polygons.is_empty() {
        // No clockwise ring: every ring stands alone
        polygons = holes.iter().map(|ring| vec![oriented(ring, false)]).collect();
    } else {
        for hole in holes {
            let owner = hole
                .iter()
                .find(|p| p.is_finite())
                .and_then(|probe| outers.iter().position(|outer| point_in_ring(probe, outer)));
            match owner {
                Some(index) => polygons[index].push(oriented(hole, true)),
                None => {
                    debug!("Hole is not inside any outer ring; promoting it to an outer ring");
                    polygons.push(vec![oriented(hole, false)]);
                }
            }
        }
    }

    if polygons.len() == 1 {
        let coordinates = polygons.pop().unwrap_or_default();
        Ok(Geometry::Polygon { coordinates })
    } else {
        Ok(Geometry::MultiPolygon { coordinates: polygons })
    }
}

/// Even-odd ray casting; edges touching a placeholder are skipped.
pub fn point_in_ring(point: &Position, ring: &[Position]) -> bool {
    let mut inside = false;
    for edge in ring.windows(2) {
        let (a, b) = (edge[0], edge[1]);
        if !a.is_finite() || !b.is_finite() {
            continue;
        }
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn ring(coords: &[[f64; 2]]) -> Vec<Position> {
        coords.iter().copied().map(Position::from).collect()
    }

    fn ccw_square(x: f64, y: f64, size: f64) -> Vec<[f64; 2]> {
        vec![[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]
    }

    fn cw_square(x: f64, y: f64, size: f64) -> Vec<[f64; 2]> {
        let mut ring = ccw_square(x, y, size);
        ring.reverse();
        ring
    }

    #[test]
    fn test_signed_area() {
        assert_eq!(signed_area(&ring(&ccw_square(0.0, 0.0, 2.0))), 4.0);
        assert_eq!(signed_area(&ring(&cw_square(0.0, 0.0, 2.0))), -4.0);
        assert!(is_clockwise(&ring(&cw_square(0.0, 0.0, 1.0))));
    }

    #[test]
    fn test_point_to_esri() {
        let esri = to_esri(&Geometry::point(-104.9476, 39.9448)).unwrap();
        assert_eq!(serde_json::to_value(&esri).unwrap(), json!({"x": -104.9476, "y": 39.9448}));
    }

    #[test]
    fn test_outer_ring_is_reversed() {
        let outer = ccw_square(0.0, 0.0, 10.0);
        let esri = to_esri(&Geometry::polygon(vec![outer.clone()])).unwrap();

        let mut expected = ring(&outer);
        expected.reverse();
        assert_eq!(esri.rings().unwrap(), &[expected]);
    }

    #[test]
    fn test_hole_winding() {
        let polygon = Geometry::polygon(vec![ccw_square(0.0, 0.0, 10.0), cw_square(2.0, 2.0, 2.0)]);
        let esri = to_esri(&polygon).unwrap();
        let rings = esri.rings().unwrap();
        assert!(is_clockwise(&rings[0]));
        assert!(!is_clockwise(&rings[1]));

        assert_eq!(from_esri(&esri).unwrap(), polygon);
    }

    #[test]
    fn test_multipolygon_flattens_rings() {
        let multi = Geometry::multi_polygon(vec![
            vec![ccw_square(0.0, 0.0, 10.0), cw_square(2.0, 2.0, 2.0)],
            vec![ccw_square(20.0, 20.0, 5.0)],
        ]);
        let esri = to_esri(&multi).unwrap();
        assert_eq!(esri.rings().unwrap().len(), 3);

        assert_eq!(from_esri(&esri).unwrap(), multi);
    }

    #[test]
    fn test_lines_map_to_paths() {
        let line = Geometry::line_string(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]]);
        let esri = to_esri(&line).unwrap();
        assert_eq!(esri.paths().unwrap().len(), 1);
        assert_eq!(from_esri(&esri).unwrap(), line);

        let multi = Geometry::MultiLineString {
            coordinates: vec![ring(&[[0.0, 0.0], [1.0, 1.0]]), ring(&[[5.0, 5.0], [6.0, 6.0]])],
        };
        assert_eq!(from_esri(&to_esri(&multi).unwrap()).unwrap(), multi);
    }

    #[test]
    fn test_ccw_only_rings_become_separate_polygons() {
        let esri = EsriGeometry::polygon(vec![
            ring(&ccw_square(0.0, 0.0, 1.0)),
            ring(&ccw_square(5.0, 5.0, 1.0)),
        ]);
        match from_esri(&esri).unwrap() {
            Geometry::MultiPolygon { coordinates } => assert_eq!(coordinates.len(), 2),
            other => panic!("Expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_orphan_hole_is_promoted() {
        let esri = EsriGeometry::polygon(vec![
            ring(&cw_square(0.0, 0.0, 1.0)),
            ring(&ccw_square(50.0, 50.0, 1.0)),
        ]);
        match from_esri(&esri).unwrap() {
            Geometry::MultiPolygon { coordinates } => {
                assert_eq!(coordinates.len(), 2);
                assert!(coordinates.iter().all(|polygon| polygon.len() == 1));
                assert!(coordinates.iter().all(|polygon| !is_clockwise(&polygon[0])));
            }
            other => panic!("Expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_single_part_multi_kinds_survive() {
        let multi = Geometry::multi_polygon(vec![vec![ccw_square(0.0, 0.0, 10.0)]]);
        let esri = to_esri(&multi).unwrap();
        assert!(matches!(from_esri(&esri).unwrap(), Geometry::Polygon { .. }));
        assert_eq!(from_esri_as(&esri, GeometryType::MultiPolygon).unwrap(), multi);

        let lines = Geometry::MultiLineString { coordinates: vec![ring(&[[0.0, 0.0], [1.0, 1.0]])] };
        let esri = to_esri(&lines).unwrap();
        assert_eq!(from_esri_as(&esri, GeometryType::MultiLineString).unwrap(), lines);

        let points = Geometry::MultiPoint { coordinates: ring(&[[3.0, 4.0]]) };
        let esri = to_esri(&points).unwrap();
        assert_eq!(from_esri_as(&esri, GeometryType::MultiPoint).unwrap(), points);
        assert_eq!(from_esri_as(&esri, GeometryType::Point).unwrap(), Geometry::point(3.0, 4.0));
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let two = EsriGeometry::polygon(vec![
            ring(&cw_square(0.0, 0.0, 1.0)),
            ring(&cw_square(5.0, 5.0, 1.0)),
        ]);
        let err = from_esri_as(&two, GeometryType::Polygon).unwrap_err();
        assert!(matches!(err, GeosiftError::UnsupportedGeometry { .. }));

        let point = EsriGeometry::point(1.0, 2.0);
        assert!(from_esri_as(&point, GeometryType::LineString).is_err());
    }

    #[test]
    fn test_clockwise_outer_ring_is_normalized() {
        // Already in Esri orientation, so the ring passes through untouched
        let polygon = Geometry::polygon(vec![cw_square(0.0, 0.0, 10.0)]);
        let esri = to_esri(&polygon).unwrap();
        assert_eq!(esri.rings().unwrap(), &[ring(&cw_square(0.0, 0.0, 10.0))]);

        // and comes back in GeoJSON orientation
        let back = from_esri_as(&esri, GeometryType::Polygon).unwrap();
        assert_eq!(back, Geometry::polygon(vec![ccw_square(0.0, 0.0, 10.0)]));
        assert_eq!(from_esri(&to_esri(&back).unwrap()).unwrap(), back);
    }

    #[test]
    fn test_open_feature_ring_fails_to_convert() {
        let open = Geometry::polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]);
        let err = to_esri(&open).unwrap_err();
        assert!(matches!(err, GeosiftError::UnsupportedGeometry { .. }));
    }

    #[test]
    fn test_envelope_to_polygon() {
        let polygon = from_esri(&EsriGeometry::envelope(0.0, 0.0, 2.0, 1.0)).unwrap();
        match &polygon {
            Geometry::Polygon { coordinates } => {
                assert_eq!(coordinates[0].len(), 5);
                assert!(!is_clockwise(&coordinates[0]));
            }
            other => panic!("Expected Polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_open_ring_is_rejected() {
        let esri = EsriGeometry::polygon(vec![ring(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]])]);
        let err = from_esri(&esri).unwrap_err();
        assert!(matches!(err, GeosiftError::UnsupportedGeometry { .. }));

        let short = EsriGeometry::polygon(vec![ring(&[[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]])]);
        assert!(from_esri(&short).is_err());
    }

    #[test]
    fn test_placeholder_ring_is_kept_as_is() {
        let rings = vec![vec![
            Position::placeholder(),
            Position::new(1.0, 0.0),
            Position::new(1.0, 1.0),
            Position::placeholder(),
        ]];
        let polygon = Geometry::Polygon { coordinates: rings.clone() };
        let esri = to_esri(&polygon).unwrap();
        let out = esri.rings().unwrap();
        assert!(out[0][0].same_as(&rings[0][0]));
        assert!(out[0][1].same_as(&rings[0][1]));
    }

    fn square_strategy() -> impl Strategy<Value = (f64, f64, f64)> {
        (-170.0f64..160.0, -80.0f64..70.0, 0.5f64..8.0)
    }

    proptest! {
        #[test]
        fn prop_polygon_round_trip(
            (x, y, size) in square_strategy(),
            hole in proptest::bool::ANY,
            extra in 0usize..4,
        ) {
            // Irregular outer ring: extra vertices along the bottom edge
            let mut outer = vec![[x, y]];
            for i in 1..=extra {
                outer.push([x + size * i as f64 / (extra + 1) as f64, y - size * 0.01]);
            }
            outer.extend([[x + size, y], [x + size, y + size], [x, y + size], [x, y]]);

            let mut rings = vec![outer];
            if hole {
                rings.push(cw_square(x + size / 4.0, y + size / 4.0, size / 4.0));
            }
            let polygon = Geometry::polygon(rings);

            let back = from_esri(&to_esri(&polygon).unwrap()).unwrap();
            prop_assert_eq!(back, polygon);
        }

        #[test]
        fn prop_multipolygon_round_trip(
            parts in proptest::collection::vec(square_strategy(), 1..5),
        ) {
            // Space the parts out so none contains another
            let polygons: Vec<Vec<Vec<[f64; 2]>>> = parts
                .iter()
                .enumerate()
                .map(|(i, (_, y, size))| vec![ccw_square(i as f64 * 20.0 - 170.0, *y, *size)])
                .collect();
            let multi = Geometry::multi_polygon(polygons);

            let back = from_esri_as(&to_esri(&multi).unwrap(), GeometryType::MultiPolygon).unwrap();
            prop_assert_eq!(back, multi);
        }

        #[test]
        fn prop_multilinestring_round_trip(
            paths in proptest::collection::vec(
                proptest::collection::vec((-180.0f64..180.0, -90.0f64..90.0), 2..6),
                1..4,
            ),
        ) {
            let coordinates = paths
                .iter()
                .map(|path| path.iter().map(|&(x, y)| Position::new(x, y)).collect())
                .collect();
            let multi = Geometry::MultiLineString { coordinates };

            let back = from_esri_as(&to_esri(&multi).unwrap(), GeometryType::MultiLineString).unwrap();
            prop_assert_eq!(back, multi);
        }

        #[test]
        fn prop_clockwise_outer_round_trip_is_reoriented(
            (x, y, size) in square_strategy(),
        ) {
            let polygon = Geometry::polygon(vec![cw_square(x, y, size)]);
            let back = from_esri_as(&to_esri(&polygon).unwrap(), GeometryType::Polygon).unwrap();
            prop_assert_eq!(back, Geometry::polygon(vec![ccw_square(x, y, size)]));
        }
    }
}
