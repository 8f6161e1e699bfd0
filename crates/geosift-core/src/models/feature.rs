use super::esri::EsriGeometry;
use super::geometry::Geometry;
use crate::error::{GeosiftError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered attribute map (`preserve_order` keeps source order)
pub type Properties = serde_json::Map<String, Value>;

/// GeoJSON feature: a geometry plus its attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    /// Optional feature identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Geometry; None for attribute-only rows
    #[serde(default)]
    pub geometry: Option<Geometry>,

    /// Feature properties
    #[serde(default, deserialize_with = "nullable_properties")]
    pub properties: Properties,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Self { id: None, geometry: Some(geometry), properties }
    }

    /// Create a new feature without geometry
    pub fn without_geometry(properties: Properties) -> Self {
        Self { id: None, geometry: None, properties }
    }

    /// Attribute lookup: exact name first, then a case-insensitive match
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).or_else(|| {
            self.properties
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }
}

fn nullable_properties<'de, D>(deserializer: D) -> std::result::Result<Properties, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Properties>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a GeoJSON FeatureCollection (or a bare array of features)
pub fn parse_features(json: &str) -> Result<Vec<Feature>> {
    let value: Value = serde_json::from_str(json)?;
    let features = match &value {
        Value::Array(_) => value,
        Value::Object(obj) => obj.get("features").cloned().ok_or_else(|| {
            GeosiftError::Serialization("FeatureCollection has no 'features' member".to_string())
        })?,
        _ => {
            return Err(GeosiftError::Serialization(
                "expected a FeatureCollection or an array of features".to_string(),
            ))
        }
    };
    Ok(serde_json::from_value(features)?)
}

/// Esri JSON feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsriFeature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<EsriGeometry>,
    #[serde(default)]
    pub attributes: Properties,
}

/// A query result row in either geometry convention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputFeature {
    GeoJson(Feature),
    Esri(EsriFeature),
}

impl OutputFeature {
    pub fn as_feature(&self) -> Option<&Feature> {
        match self {
            OutputFeature::GeoJson(feature) => Some(feature),
            OutputFeature::Esri(_) => None,
        }
    }

    pub fn as_esri(&self) -> Option<&EsriFeature> {
        match self {
            OutputFeature::Esri(feature) => Some(feature),
            OutputFeature::GeoJson(_) => None,
        }
    }

    /// Attributes regardless of convention
    pub fn attributes(&self) -> &Properties {
        match self {
            OutputFeature::GeoJson(feature) => &feature.properties,
            OutputFeature::Esri(feature) => &feature.attributes,
        }
    }
}
