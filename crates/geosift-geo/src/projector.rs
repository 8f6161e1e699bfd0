//! Geometry projection and coordinate rounding

use crate::reference;
use crate::transform::{CoordinateTransform, ProjTransforms, TransformProvider};
use geosift_core::error::Result;
use geosift_core::models::{CanonicalSr, Geometry, Position, SpatialReference};

/// Reprojects geometries and optionally rounds the output.
///
/// Positions with a non-finite axis are passed through untouched: they are
/// neither transformed nor rounded.
pub struct Projector {
    transform: Option<Box<dyn CoordinateTransform>>,
    precision: Option<u32>,
}

impl std::fmt::Debug for Projector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projector")
            .field("reprojects", &self.transform.is_some())
            .field("precision", &self.precision)
            .finish()
    }
}

impl Projector {
    /// Build a projector from `source` to `target`
    pub fn new(
        provider: &dyn TransformProvider,
        source: &CanonicalSr,
        target: &CanonicalSr,
        precision: Option<u32>,
    ) -> Result<Self> {
        let transform = if source == target {
            None
        } else {
            Some(provider.transform(source, target)?)
        };
        Ok(Self { transform, precision })
    }

    /// A projector that only rounds
    pub fn precision_only(digits: u32) -> Self {
        Self { transform: None, precision: Some(digits) }
    }

    /// True when this projector would return every geometry unchanged
    pub fn is_identity(&self) -> bool {
        self.transform.is_none() && self.precision.is_none()
    }

    pub fn project(&self, geometry: &Geometry) -> Result<Geometry> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_positions(|position| self.project_position(position))
    }

    pub fn project_position(&self, position: Position) -> Result<Position> {
        if !position.is_finite() {
            return Ok(position);
        }

        let (mut x, mut y) = (position.x, position.y);
        if let Some(transform) = &self.transform {
            (x, y) = transform.convert(x, y)?;
        }
        if let Some(digits) = self.precision {
            x = round_to(x, digits);
            y = round_to(y, digits);
        }
        Ok(Position::new(x, y))
    }
}

/// Round half away from zero to `digits` decimal places
pub fn round_to(value: f64, digits: u32) -> f64 {
    // Beyond f64's ~17 significant digits rounding is a no-op
    if digits > 15 {
        return value;
    }
    let factor = 10f64.powi(digits as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Project a WGS 84 geometry into `target` through PROJ
pub fn project(
    geometry: &Geometry,
    target: &SpatialReference,
    precision: Option<u32>,
) -> Result<Geometry> {
    let target = reference::resolve(target)?;
    Projector::new(&ProjTransforms, &CanonicalSr::wgs84(), &target, precision)?.project(geometry)
}
