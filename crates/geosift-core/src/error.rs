//! Error types for Geosift

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeosiftError {
    // Query errors
    #[error("Syntax error at position {position} near '{token}': {reason}")]
    QuerySyntax {
        position: usize,
        token: String,
        reason: String,
    },

    #[error("Invalid value for option {option}: {reason}")]
    InvalidOption { option: String, reason: String },

    // Spatial reference errors
    #[error("Unknown spatial reference: {descriptor}")]
    UnknownSpatialReference { descriptor: String },

    #[error("Transform from {from} to {to} failed: {reason}")]
    Transform {
        from: String,
        to: String,
        reason: String,
    },

    // Geometry errors
    #[error("Unsupported geometry: {reason}")]
    UnsupportedGeometry { reason: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GeosiftError {
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        GeosiftError::InvalidOption { option: option.into(), reason: reason.into() }
    }

    pub fn unsupported_geometry(reason: impl Into<String>) -> Self {
        GeosiftError::UnsupportedGeometry { reason: reason.into() }
    }

    pub fn unknown_reference(descriptor: impl Into<String>) -> Self {
        GeosiftError::UnknownSpatialReference { descriptor: descriptor.into() }
    }
}

impl From<serde_json::Error> for GeosiftError {
    fn from(err: serde_json::Error) -> Self {
        GeosiftError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeosiftError>;
