use geosift_core::error::{GeosiftError, Result};
use geosift_core::models::{Geometry, Position};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    fn absorb(&mut self, prefix: &str, other: ValidationResult) {
        for error in other.errors {
            self.add_error(format!("{}.{}", prefix, error.location), error.reason);
        }
    }
}

/// Validate the structure of a geometry.
///
/// Placeholder positions are structurally fine; only counts and ring
/// closure are checked.
pub fn validate_geometry(geometry: &Geometry) -> ValidationResult {
    match geometry {
        Geometry::Point { .. } | Geometry::MultiPoint { .. } => ValidationResult::valid(),
        Geometry::LineString { coordinates } => validate_line(coordinates),
        Geometry::MultiLineString { coordinates } => {
            let mut result = ValidationResult::valid();
            for (i, line) in coordinates.iter().enumerate() {
                result.absorb(&format!("MultiLineString[{}]", i), validate_line(line));
            }
            result
        }
        Geometry::Polygon { coordinates } => validate_polygon(coordinates),
        Geometry::MultiPolygon { coordinates } => {
            let mut result = ValidationResult::valid();
            for (i, polygon) in coordinates.iter().enumerate() {
                result.absorb(&format!("MultiPolygon[{}]", i), validate_polygon(polygon));
            }
            result
        }
    }
}

fn validate_line(line: &[Position]) -> ValidationResult {
    let mut result = ValidationResult::valid();
    if line.len() < 2 {
        result.add_error(
            "LineString".to_string(),
            format!("LineString must have at least 2 points, found {}", line.len()),
        );
    }
    result
}

fn validate_polygon(rings: &[Vec<Position>]) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if rings.is_empty() {
        result.add_error("Polygon".to_string(), "Polygon must have an exterior ring".to_string());
    }

    for (i, ring) in rings.iter().enumerate() {
        let location = if i == 0 {
            "Polygon exterior".to_string()
        } else {
            format!("Polygon interior[{}]", i - 1)
        };

        if ring.len() < 4 {
            result.add_error(
                location.clone(),
                format!("ring must have at least 4 points, found {}", ring.len()),
            );
        }

        if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
            if !first.same_as(last) {
                result.add_error(location, "ring must be closed (first point == last point)".to_string());
            }
        }
    }

    result
}

/// Fail with `UnsupportedGeometry` when the geometry is malformed
pub fn ensure_valid(geometry: &Geometry) -> Result<()> {
    let validation = validate_geometry(geometry);
    match validation.errors.first() {
        None => Ok(()),
        Some(error) => Err(GeosiftError::unsupported_geometry(format!(
            "{}: {}",
            error.location, error.reason
        ))),
    }
}
