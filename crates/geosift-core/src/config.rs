use crate::error::{GeosiftError, Result};
use crate::models::SpatialRelation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Set programmatically by the embedding application
    Override,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Override => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the query engine
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Native spatial reference of the data being queried
    pub native_sr: ConfigValue<u32>,
    /// Relation used when a query names none
    pub spatial_rel: ConfigValue<SpatialRelation>,
    /// Upper bound on returned rows, applied after `limit`
    pub max_record_count: ConfigValue<Option<usize>>,
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            native_sr: ConfigValue::new(4326, ConfigSource::Default),
            spatial_rel: ConfigValue::new(SpatialRelation::Intersects, ConfigSource::Default),
            max_record_count: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeosiftError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeosiftError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(native_sr) = file_config.native_sr {
            self.native_sr.update(native_sr, ConfigSource::File);
        }

        if let Some(spatial_rel) = file_config.spatial_rel {
            let relation = spatial_rel.parse().map_err(|_| GeosiftError::ConfigInvalid {
                key: "spatial_rel".to_string(),
                reason: format!("Unknown spatial relation: {}", spatial_rel),
            })?;
            self.spatial_rel.update(relation, ConfigSource::File);
        }

        if let Some(max_record_count) = file_config.max_record_count {
            if max_record_count == 0 {
                return Err(GeosiftError::ConfigInvalid {
                    key: "max_record_count".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            self.max_record_count.update(Some(max_record_count), ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEOSIFT_NATIVE_SR
        if let Ok(sr_str) = env::var("GEOSIFT_NATIVE_SR") {
            match sr_str.trim().parse::<u32>() {
                Ok(sr) => self.native_sr.update(sr, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOSIFT_NATIVE_SR value '{}': expected integer wkid",
                    sr_str
                ),
            }
        }

        // GEOSIFT_SPATIAL_REL
        if let Ok(rel_str) = env::var("GEOSIFT_SPATIAL_REL") {
            match rel_str.parse::<SpatialRelation>() {
                Ok(relation) => self.spatial_rel.update(relation, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOSIFT_SPATIAL_REL value '{}': expected intersects, contains, within, disjoint, touches, overlaps or crosses",
                    rel_str
                ),
            }
        }

        // GEOSIFT_MAX_RECORD_COUNT
        if let Ok(count_str) = env::var("GEOSIFT_MAX_RECORD_COUNT") {
            match count_str.trim().parse::<usize>() {
                Ok(count) if count > 0 => {
                    self.max_record_count.update(Some(count), ConfigSource::Environment)
                }
                _ => tracing::warn!(
                    "Invalid GEOSIFT_MAX_RECORD_COUNT value '{}': expected positive integer",
                    count_str
                ),
            }
        }

        self
    }

    /// Apply programmatic overrides
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(native_sr) = overrides.native_sr {
            self.native_sr.update(native_sr, ConfigSource::Override);
        }

        if let Some(spatial_rel) = overrides.spatial_rel {
            self.spatial_rel.update(spatial_rel, ConfigSource::Override);
        }

        if let Some(max_record_count) = overrides.max_record_count {
            self.max_record_count.update(Some(max_record_count), ConfigSource::Override);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "native_sr".to_string(),
            (format!("EPSG:{}", self.native_sr.value), self.native_sr.source),
        );

        map.insert(
            "spatial_rel".to_string(),
            (self.spatial_rel.value.to_string(), self.spatial_rel.source),
        );

        map.insert(
            "max_record_count".to_string(),
            (
                self.max_record_count
                    .value
                    .map(|count| count.to_string())
                    .unwrap_or_else(|| "unlimited".to_string()),
                self.max_record_count.source,
            ),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    native_sr: Option<u32>,
    spatial_rel: Option<String>,
    max_record_count: Option<usize>,
}

/// Programmatic configuration overrides
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub native_sr: Option<u32>,
    pub spatial_rel: Option<SpatialRelation>,
    pub max_record_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.native_sr.value, 4326);
        assert_eq!(config.native_sr.source, ConfigSource::Default);
        assert_eq!(config.spatial_rel.value, SpatialRelation::Intersects);
        assert_eq!(config.max_record_count.value, None);
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        // File should override default
        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        // Environment should override file
        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);
        assert_eq!(value.source, ConfigSource::Environment);

        // Overrides win over environment
        value.update(400, ConfigSource::Override);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Override);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Override);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
native_sr = 3857
spatial_rel = "esriSpatialRelWithin"
max_record_count = 2000
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.native_sr.value, 3857);
        assert_eq!(config.native_sr.source, ConfigSource::File);
        assert_eq!(config.spatial_rel.value, SpatialRelation::Within);
        assert_eq!(config.max_record_count.value, Some(2000));
    }

    #[test]
    fn test_load_from_file_rejects_unknown_relation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"spatial_rel = "near""#).unwrap();

        let err = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, GeosiftError::ConfigInvalid { ref key, .. } if key == "spatial_rel"));
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        env::set_var("GEOSIFT_NATIVE_SR", "3857");
        env::set_var("GEOSIFT_SPATIAL_REL", "contains");
        env::set_var("GEOSIFT_MAX_RECORD_COUNT", "not-a-number");

        let config = LayeredConfig::with_defaults().load_from_env();

        env::remove_var("GEOSIFT_NATIVE_SR");
        env::remove_var("GEOSIFT_SPATIAL_REL");
        env::remove_var("GEOSIFT_MAX_RECORD_COUNT");

        assert_eq!(config.native_sr.value, 3857);
        assert_eq!(config.native_sr.source, ConfigSource::Environment);
        assert_eq!(config.spatial_rel.value, SpatialRelation::Contains);
        // Invalid values are ignored
        assert_eq!(config.max_record_count.value, None);
        assert_eq!(config.max_record_count.source, ConfigSource::Default);
    }

    #[test]
    fn test_overrides() {
        let mut config = LayeredConfig::with_defaults();

        config.apply_overrides(ConfigOverrides {
            native_sr: Some(32613),
            spatial_rel: None,
            max_record_count: Some(10),
        });

        assert_eq!(config.native_sr.value, 32613);
        assert_eq!(config.native_sr.source, ConfigSource::Override);
        assert_eq!(config.max_record_count.value, Some(10));
        assert_eq!(config.spatial_rel.source, ConfigSource::Default);
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        let (sr_value, sr_source) = &map["native_sr"];
        assert_eq!(sr_value, "EPSG:4326");
        assert_eq!(*sr_source, ConfigSource::Default);

        assert_eq!(map["spatial_rel"].0, "intersects");
        assert_eq!(map["max_record_count"].0, "unlimited");
    }
}
