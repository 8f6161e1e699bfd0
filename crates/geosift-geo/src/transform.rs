//! Coordinate transforms between spatial references
//!
//! [`TransformProvider`] is the seam the projector and spatial filter use to
//! obtain a point transform for a (source, target) pair. [`ProjTransforms`]
//! hands the work to PROJ.

use geosift_core::error::{GeosiftError, Result};
use geosift_core::models::CanonicalSr;
use proj::Proj;

/// Converts one coordinate pair
pub trait CoordinateTransform {
    fn convert(&self, x: f64, y: f64) -> Result<(f64, f64)>;
}

/// Produces transforms between canonical spatial references
pub trait TransformProvider: Send + Sync {
    fn transform(
        &self,
        source: &CanonicalSr,
        target: &CanonicalSr,
    ) -> Result<Box<dyn CoordinateTransform>>;
}

/// Returns the input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl CoordinateTransform for Identity {
    fn convert(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        Ok((x, y))
    }
}

/// Transforms delegated to PROJ.
///
/// Axis order is normalized so geographic references always take and
/// return longitude first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjTransforms;

impl ProjTransforms {
    pub fn new() -> Self {
        Self
    }

    /// PROJ definition string for a canonical reference
    pub fn definition(sr: &CanonicalSr) -> String {
        match sr {
            CanonicalSr::Wkid(wkid) => format!("EPSG:{}", wkid),
            CanonicalSr::Wkt(wkt) => wkt.clone(),
        }
    }

    /// Fails with `UnknownSpatialReference` when PROJ cannot build `sr`
    fn check_known(sr: &CanonicalSr) -> Result<()> {
        Proj::new(&Self::definition(sr))
            .map(|_| ())
            .map_err(|_| GeosiftError::unknown_reference(sr.to_string()))
    }
}

struct ProjTransform {
    proj: Proj,
    source: String,
    target: String,
}

impl CoordinateTransform for ProjTransform {
    fn convert(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (out_x, out_y) = self.proj.convert((x, y)).map_err(|e| GeosiftError::Transform {
            from: self.source.clone(),
            to: self.target.clone(),
            reason: format!("Projection failed: {}", e),
        })?;
        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(GeosiftError::Transform {
                from: self.source.clone(),
                to: self.target.clone(),
                reason: format!("({}, {}) has no finite image", x, y),
            });
        }
        Ok((out_x, out_y))
    }
}

impl TransformProvider for ProjTransforms {
    fn transform(
        &self,
        source: &CanonicalSr,
        target: &CanonicalSr,
    ) -> Result<Box<dyn CoordinateTransform>> {
        if source == target {
            return Ok(Box::new(Identity));
        }

        let from = Self::definition(source);
        let to = Self::definition(target);
        let proj = Proj::new_known_crs(&from, &to, None).map_err(|e| {
            // Separate a definition PROJ never heard of from a pair it cannot join
            if let Err(unknown) = Self::check_known(source).and_then(|_| Self::check_known(target)) {
                return unknown;
            }
            GeosiftError::Transform {
                from: source.to_string(),
                to: target.to_string(),
                reason: format!("Failed to create projection: {}", e),
            }
        })?;

        Ok(Box::new(ProjTransform { proj, source: source.to_string(), target: target.to_string() }))
    }
}
