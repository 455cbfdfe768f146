//! # Core Module
//!
//! Shared configuration for the spatial index and the batching pipeline.

pub mod config;

pub use config::{
    BatchingConfig,
    Config,
    ConfigError,
    PipelineConfig,
    SpatialConfig,
};
