//! Spatial reference descriptors and their canonical form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A spatial reference as a caller expresses it.
///
/// Accepted shapes: a bare numeric identifier (`3857`), an object carrying
/// one of several identifier members (`{"latestWkid": 3857}`), or a string
/// holding either an identifier (`"EPSG:3857"`) or a WKT definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpatialReference {
    Wkid(u32),
    Object(SpatialReferenceObject),
    Text(String),
}

/// The object form of a spatial reference descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialReferenceObject {
    #[serde(rename = "latestWkid", default, skip_serializing_if = "Option::is_none")]
    pub latest_wkid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsg: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkt: Option<String>,
}

impl SpatialReference {
    /// Descriptor for a numeric identifier
    pub fn wkid(wkid: u32) -> Self {
        SpatialReference::Wkid(wkid)
    }

    /// Descriptor for a WKT definition
    pub fn wkt(definition: impl Into<String>) -> Self {
        SpatialReference::Text(definition.into())
    }

    /// Esri-style object descriptor with `latestWkid`
    pub fn latest_wkid(wkid: u32) -> Self {
        SpatialReference::Object(SpatialReferenceObject {
            latest_wkid: Some(wkid),
            ..Default::default()
        })
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpatialReference::Wkid(wkid) => write!(f, "{}", wkid),
            SpatialReference::Object(obj) => {
                write!(f, "{}", serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string()))
            }
            SpatialReference::Text(text) => write!(f, "{}", text),
        }
    }
}

/// The canonical key a descriptor resolves to.
///
/// Two spatial references are the same iff their canonical keys are equal:
/// registry aliases fold onto one identifier, and a WKT definition is its
/// own identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalSr {
    Wkid(u32),
    Wkt(String),
}

impl CanonicalSr {
    /// WGS 84 geographic, the implicit source reference
    pub fn wgs84() -> Self {
        CanonicalSr::Wkid(4326)
    }
}

impl fmt::Display for CanonicalSr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalSr::Wkid(wkid) => write!(f, "EPSG:{}", wkid),
            CanonicalSr::Wkt(text) => {
                let head: String = text.chars().take(48).collect();
                if head.len() < text.len() {
                    write!(f, "WKT {}...", head)
                } else {
                    write!(f, "WKT {}", head)
                }
            }
        }
    }
}
