//! # Pipeline Configuration
//!
//! Configuration for the spatial index and the per-frame batching pipeline.
//! All sections are serde-serialisable and can be loaded from TOML or RON
//! through the [`Config`] trait.

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};

/// Octant ids pack the z lattice coordinate into 10 bits, and the lattice of a
/// region spans `2^(max_octant_depth + 1)` cells per axis.
const MAX_SUPPORTED_DEPTH: u32 = 9;

/// # Spatial Index Configuration
///
/// Region size and octree adaptivity limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Edge length of one cubic region in world units
    pub region_size: f32,
    /// Entity count above which a leaf octant is split
    pub octant_entity_limit: usize,
    /// Deepest level a leaf may be split to (root is depth 0)
    pub max_octant_depth: u32,
}

impl SpatialConfig {
    /// Set the region size
    pub fn with_region_size(mut self, region_size: f32) -> Self {
        self.region_size = region_size;
        self
    }
    
    /// Set the per-leaf entity limit
    pub fn with_octant_entity_limit(mut self, limit: usize) -> Self {
        self.octant_entity_limit = limit;
        self
    }
    
    /// Set the maximum octree depth
    pub fn with_max_octant_depth(mut self, depth: u32) -> Self {
        self.max_octant_depth = depth;
        self
    }
    
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.region_size.is_finite() || self.region_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "region_size must be positive and finite, got {}",
                self.region_size
            )));
        }
        
        if self.octant_entity_limit == 0 {
            return Err(ConfigError::Invalid("octant_entity_limit must be at least 1".to_string()));
        }
        
        if self.max_octant_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "max_octant_depth {} exceeds the supported maximum of {}",
                self.max_octant_depth, MAX_SUPPORTED_DEPTH
            )));
        }
        
        Ok(())
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            region_size: 128.0,
            octant_entity_limit: 128,
            max_octant_depth: 4,
        }
    }
}

/// # Batching Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Capacity the first rented sort-key buffer is created with
    pub initial_key_capacity: usize,
    /// Emit a per-frame statistics line at debug level
    pub log_frame_stats: bool,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            initial_key_capacity: 1024,
            log_frame_stats: false,
        }
    }
}

/// # Pipeline Configuration
///
/// Top-level configuration combining all sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Default log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Spatial index settings
    pub spatial: SpatialConfig,
    /// Batching settings
    pub batching: BatchingConfig,
}

impl PipelineConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.spatial.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            spatial: SpatialConfig::default(),
            batching: BatchingConfig::default(),
        }
    }
}

impl Config for PipelineConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.spatial.region_size, 128.0);
    }

    #[test]
    fn test_rejects_unsupported_depth() {
        let spatial = SpatialConfig::default().with_max_octant_depth(10);
        assert!(matches!(spatial.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_non_positive_region() {
        let spatial = SpatialConfig::default().with_region_size(0.0);
        assert!(spatial.validate().is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let text = "log_level = \"debug\"\n[spatial]\noctant_entity_limit = 16\n";
        let config = PipelineConfig::from_str_with_format(text, "pipeline.toml").unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.spatial.octant_entity_limit, 16);
        assert_eq!(config.spatial.max_octant_depth, 4);
        assert_eq!(config.batching, BatchingConfig::default());
    }

    #[test]
    fn test_ron_round_trip_through_text() {
        let config = PipelineConfig::default();
        let text = ron::ser::to_string_pretty(&config, Default::default()).unwrap();
        let parsed = PipelineConfig::from_str_with_format(&text, "pipeline.ron").unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = PipelineConfig::from_str_with_format("", "pipeline.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
