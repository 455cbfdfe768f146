//! # Frame Pipeline
//!
//! [`FrameContext`] bundles the persistent state of the pipeline and runs one
//! frame in strict phase order:
//!
//! 1. drain scene events and update the spatial index (structural barrier)
//! 2. walk every region tree
//! 3. merge, sort and partition keys by shader
//! 4. compress each shader range into the render list
//!
//! Nothing here is global; callers own the context and pass the scene and
//! asset layers in explicitly.

use crate::assets::AssetResolver;
use crate::core::config::{ConfigError, PipelineConfig};
use crate::render::batching::{BatchCoordinator, BatchError, FrameStats};
use crate::render::RenderList;
use crate::scene::{RenderableSource, SceneEvent};
use crate::spatial::{IndexUpdateStats, SpatialError, SpatialIndex};

/// Result type for frame execution
pub type FrameResult<T> = Result<T, FrameError>;

/// Errors that abort a frame
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Spatial index bookkeeping is inconsistent
    #[error("Spatial index error: {0}")]
    Spatial(#[from] SpatialError),
    
    /// Sorted keys no longer match the walk output
    #[error("Batching error: {0}")]
    Batch(#[from] BatchError),
}

/// Persistent pipeline state threaded through every frame
pub struct FrameContext {
    spatial: SpatialIndex,
    coordinator: BatchCoordinator,
    render_list: RenderList,
    event_scratch: Vec<SceneEvent>,
    last_index_stats: IndexUpdateStats,
}

impl FrameContext {
    /// Build the pipeline from a validated configuration
    pub fn new(config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        
        Ok(Self {
            spatial: SpatialIndex::new(config.spatial.clone())?,
            coordinator: BatchCoordinator::new(config.batching.clone()),
            render_list: RenderList::new(),
            event_scratch: Vec::new(),
            last_index_stats: IndexUpdateStats::default(),
        })
    }
    
    /// Run one frame and return its render list
    pub fn run_frame<S, A>(&mut self, scene: &mut S, assets: &A) -> FrameResult<&RenderList>
    where
        S: RenderableSource + ?Sized,
        A: AssetResolver + ?Sized,
    {
        self.event_scratch.clear();
        scene.drain_events_into(&mut self.event_scratch);
        for event in self.event_scratch.drain(..) {
            self.spatial.notify(event);
        }
        
        self.last_index_stats = self.spatial.update(&*scene)?;
        self.coordinator
            .batch_world(&self.spatial, &*scene, assets, &mut self.render_list)?;
        
        Ok(&self.render_list)
    }
    
    /// Spatial index
    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }
    
    /// Spatial index, for callers that feed it directly instead of through scene events
    pub fn spatial_mut(&mut self) -> &mut SpatialIndex {
        &mut self.spatial
    }
    
    /// Render list of the last frame
    pub fn render_list(&self) -> &RenderList {
        &self.render_list
    }
    
    /// Batching statistics of the last frame
    pub fn frame_stats(&self) -> &FrameStats {
        self.coordinator.stats()
    }
    
    /// Index update counters of the last frame
    pub fn index_stats(&self) -> &IndexUpdateStats {
        &self.last_index_stats
    }
}
