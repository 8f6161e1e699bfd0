//! Spatial filtering of features against a query geometry

use crate::convert::{envelope_polygon, from_esri};
use crate::models::{geometry_from_wkt, to_geo_geometry};
use crate::projector::Projector;
use crate::reference;
use crate::transform::TransformProvider;
use crate::validation::ensure_valid;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::{Rect, Relate};
use geosift_core::error::{GeosiftError, Result};
use geosift_core::models::{CanonicalSr, Geometry, QueryGeometry, SpatialReference, SpatialRelation};
use tracing::debug;

/// Answers "does `feature` stand in `relation` to `query`"
pub trait RelationProvider: Send + Sync {
    fn relate(&self, feature: &Geometry, query: &Geometry, relation: SpatialRelation) -> bool;
}

/// DE-9IM relations computed by the `geo` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoRelations;

impl RelationProvider for GeoRelations {
    fn relate(&self, feature: &Geometry, query: &Geometry, relation: SpatialRelation) -> bool {
        let feature = to_geo_geometry(feature);
        let query = to_geo_geometry(query);
        let matrix = feature.relate(&query);

        match relation {
            SpatialRelation::Intersects => matrix.is_intersects(),
            SpatialRelation::Contains => matrix.is_contains(),
            SpatialRelation::Within => matrix.is_within(),
            SpatialRelation::Disjoint => matrix.is_disjoint(),
            SpatialRelation::Touches => matrix.is_touches(),
            SpatialRelation::Overlaps => matrix.is_overlaps(),
            SpatialRelation::Crosses => matrix.is_crosses(),
        }
    }
}

/// Turn any accepted query geometry shape into a geometry
pub fn query_geometry_to_geometry(query: &QueryGeometry) -> Result<Geometry> {
    match query {
        QueryGeometry::GeoJson(geometry) => Ok(geometry.clone()),
        QueryGeometry::Esri(esri) => from_esri(esri),
        QueryGeometry::Bbox(bbox) => bbox_geometry(*bbox),
        QueryGeometry::Text(text) => match parse_bbox_text(text) {
            Some(bbox) => bbox_geometry(bbox),
            None => geometry_from_wkt(text.trim()),
        },
    }
}

/// `"xmin,ymin,xmax,ymax"`
fn parse_bbox_text(text: &str) -> Option<[f64; 4]> {
    let values: Vec<f64> =
        text.split(',').map(|part| part.trim().parse::<f64>()).collect::<std::result::Result<_, _>>().ok()?;
    <[f64; 4]>::try_from(values).ok()
}

fn bbox_geometry([xmin, ymin, xmax, ymax]: [f64; 4]) -> Result<Geometry> {
    if ![xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite()) || xmin > xmax || ymin > ymax {
        return Err(GeosiftError::invalid_option(
            "geometry",
            format!("invalid bounding box [{}, {}, {}, {}]", xmin, ymin, xmax, ymax),
        ));
    }
    Ok(envelope_polygon(xmin, ymin, xmax, ymax))
}

/// Check if two bounding boxes intersect
fn bounding_boxes_intersect(bbox1: &Rect, bbox2: &Rect) -> bool {
    // Two rectangles intersect if they overlap in both x and y dimensions
    let x_overlap = bbox1.min().x <= bbox2.max().x && bbox1.max().x >= bbox2.min().x;
    let y_overlap = bbox1.min().y <= bbox2.max().y && bbox1.max().y >= bbox2.min().y;

    x_overlap && y_overlap
}

/// A query geometry aligned to the data's native reference
#[derive(Debug, Clone)]
pub struct SpatialFilter {
    geometry: Geometry,
    relation: SpatialRelation,
    bbox: Option<Rect>,
}

impl SpatialFilter {
    /// Build a filter, reprojecting the query geometry into `native`.
    ///
    /// The query geometry's own spatial reference wins over `in_sr`; with
    /// neither, the geometry is taken to be in `native` already.
    pub fn prepare(
        query: &QueryGeometry,
        in_sr: Option<&SpatialReference>,
        native: &CanonicalSr,
        relation: SpatialRelation,
        transforms: &dyn TransformProvider,
    ) -> Result<Self> {
        let geometry = query_geometry_to_geometry(query)?;
        ensure_valid(&geometry)?;
        if geometry.has_placeholder() {
            return Err(GeosiftError::unsupported_geometry(
                "query geometry contains null coordinates",
            ));
        }

        let source = match query.spatial_reference().or(in_sr) {
            Some(sr) => reference::resolve(sr)?,
            None => native.clone(),
        };
        let geometry = Projector::new(transforms, &source, native, None)?.project(&geometry)?;
        let bbox = to_geo_geometry(&geometry).bounding_rect();

        debug!(
            "Prepared {:?} filter from {} into {} (bbox: {:?})",
            relation, source, native, bbox
        );

        Ok(Self { geometry, relation, bbox })
    }

    /// Filter for a geometry already in the native reference
    pub fn new(geometry: Geometry, relation: SpatialRelation) -> Self {
        let bbox = to_geo_geometry(&geometry).bounding_rect();
        Self { geometry, relation, bbox }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn relation(&self) -> SpatialRelation {
        self.relation
    }

    /// Test one feature geometry.
    ///
    /// Geometries holding placeholder coordinates never match.
    pub fn matches(&self, feature: &Geometry, relations: &dyn RelationProvider) -> bool {
        if feature.has_placeholder() {
            debug!("Skipping {:?} with null coordinates", feature.geometry_type());
            return false;
        }

        let Some(feature_bbox) = to_geo_geometry(feature).bounding_rect() else {
            return false;
        };
        if let Some(query_bbox) = &self.bbox {
            if !bounding_boxes_intersect(&feature_bbox, query_bbox) {
                return self.relation == SpatialRelation::Disjoint;
            }
        }

        relations.relate(feature, &self.geometry, self.relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::ProjTransforms;
    use serde_json::json;

    fn square(x: f64, y: f64, size: f64) -> Geometry {
        Geometry::polygon(vec![vec![[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]])
    }

    fn filter(query: Geometry, relation: SpatialRelation) -> SpatialFilter {
        SpatialFilter::new(query, relation)
    }

    #[test]
    fn test_intersects() {
        let query = filter(square(0.0, 0.0, 10.0), SpatialRelation::Intersects);
        assert!(query.matches(&Geometry::point(5.0, 5.0), &GeoRelations));
        assert!(query.matches(&square(8.0, 8.0, 5.0), &GeoRelations));
        assert!(!query.matches(&Geometry::point(50.0, 50.0), &GeoRelations));
    }

    #[test]
    fn test_within_and_contains_read_feature_first() {
        let within = filter(square(0.0, 0.0, 10.0), SpatialRelation::Within);
        assert!(within.matches(&square(2.0, 2.0, 2.0), &GeoRelations));
        assert!(!within.matches(&square(8.0, 8.0, 5.0), &GeoRelations));

        let contains = filter(Geometry::point(3.0, 3.0), SpatialRelation::Contains);
        assert!(contains.matches(&square(2.0, 2.0, 2.0), &GeoRelations));
        assert!(!contains.matches(&square(5.0, 5.0, 2.0), &GeoRelations));
    }

    #[test]
    fn test_disjoint_uses_bbox_shortcut() {
        let disjoint = filter(square(0.0, 0.0, 1.0), SpatialRelation::Disjoint);
        assert!(disjoint.matches(&Geometry::point(50.0, 50.0), &GeoRelations));
        assert!(!disjoint.matches(&Geometry::point(0.5, 0.5), &GeoRelations));
    }

    #[test]
    fn test_touches_overlaps_crosses() {
        let touches = filter(square(0.0, 0.0, 1.0), SpatialRelation::Touches);
        assert!(touches.matches(&square(1.0, 0.0, 1.0), &GeoRelations));
        assert!(!touches.matches(&square(0.5, 0.0, 1.0), &GeoRelations));

        let overlaps = filter(square(0.0, 0.0, 2.0), SpatialRelation::Overlaps);
        assert!(overlaps.matches(&square(1.0, 1.0, 2.0), &GeoRelations));
        assert!(!overlaps.matches(&square(0.5, 0.5, 0.5), &GeoRelations));

        let crosses = filter(square(0.0, 0.0, 2.0), SpatialRelation::Crosses);
        let through = Geometry::line_string(vec![[-1.0, 1.0], [3.0, 1.0]]);
        assert!(crosses.matches(&through, &GeoRelations));
    }

    #[test]
    fn test_placeholder_features_never_match() {
        let query = filter(square(-180.0, -90.0, 360.0), SpatialRelation::Disjoint);
        let feature: Geometry =
            serde_json::from_value(json!({"type": "Point", "coordinates": [null, null]})).unwrap();
        assert!(!query.matches(&feature, &GeoRelations));
    }

    #[test]
    fn test_prepare_reprojects_esri_envelope() {
        let query: QueryGeometry = serde_json::from_value(json!({
            "xmin": -20026376.39,
            "ymin": -20048966.1,
            "xmax": 20026376.39,
            "ymax": 20048966.1,
            "spatialReference": {"wkid": 102100}
        }))
        .unwrap();

        let prepared = SpatialFilter::prepare(
            &query,
            None,
            &CanonicalSr::wgs84(),
            SpatialRelation::Intersects,
            &ProjTransforms,
        )
        .unwrap();

        let mut max_x = f64::MIN;
        prepared.geometry().for_each_position(|p| max_x = max_x.max(p.x));
        assert!((max_x - 179.9).abs() < 0.1, "max x {}", max_x);
        assert!(prepared.matches(&Geometry::point(-104.9476, 39.9448), &GeoRelations));
    }

    #[test]
    fn test_prepare_uses_in_sr() {
        let query = QueryGeometry::Bbox([-11700000.0, 4800000.0, -11600000.0, 4900000.0]);
        let in_sr = SpatialReference::wkid(3857);
        let prepared = SpatialFilter::prepare(
            &query,
            Some(&in_sr),
            &CanonicalSr::wgs84(),
            SpatialRelation::Intersects,
            &ProjTransforms,
        )
        .unwrap();
        assert!(prepared.matches(&Geometry::point(-104.9476, 39.9448), &GeoRelations));
        assert!(!prepared.matches(&Geometry::point(0.0, 0.0), &GeoRelations));
    }

    #[test]
    fn test_prepare_unknown_reference_fails() {
        let query = QueryGeometry::Bbox([0.0, 0.0, 1.0, 1.0]);
        let err = SpatialFilter::prepare(
            &query,
            Some(&SpatialReference::wkid(999999)),
            &CanonicalSr::wgs84(),
            SpatialRelation::Intersects,
            &ProjTransforms,
        )
        .unwrap_err();
        assert!(matches!(err, GeosiftError::UnknownSpatialReference { .. }));
    }

    #[test]
    fn test_text_query_geometries() {
        let bbox = query_geometry_to_geometry(&QueryGeometry::Text("0, 0, 2, 1".to_string())).unwrap();
        assert_eq!(
            bbox,
            Geometry::polygon(vec![vec![[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0], [0.0, 0.0]]])
        );

        let wkt = query_geometry_to_geometry(&QueryGeometry::Text(
            "POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))".to_string(),
        ))
        .unwrap();
        assert_eq!(wkt, square(0.0, 0.0, 1.0));

        let err = query_geometry_to_geometry(&QueryGeometry::Bbox([1.0, 0.0, 0.0, 1.0])).unwrap_err();
        assert!(matches!(err, GeosiftError::InvalidOption { .. }));
    }

    #[test]
    fn test_unclosed_query_ring_is_rejected() {
        let query = QueryGeometry::GeoJson(Geometry::polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
        ]]));
        let err = SpatialFilter::prepare(
            &query,
            None,
            &CanonicalSr::wgs84(),
            SpatialRelation::Intersects,
            &ProjTransforms,
        )
        .unwrap_err();
        assert!(matches!(err, GeosiftError::UnsupportedGeometry { .. }));
    }
}
