//! Frame-level merge, sort, partition and compression

use std::ops::Range;

use crate::assets::AssetResolver;
use crate::core::config::BatchingConfig;
use crate::foundation::memory::VecPool;
use crate::foundation::time::Stopwatch;
use crate::render::RenderList;
use crate::scene::RenderableSource;
use crate::spatial::SpatialIndex;
use super::region_batcher::{RegionBatcher, WalkStats};
use super::sort_key::SortKey;
use super::{BatchError, BatchResult};

/// Contiguous range of the sorted key buffer belonging to one shader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderRange {
    /// Dense shader id shared by every key in the range
    pub shader_id: u32,
    /// Index range into the sorted key buffer
    pub range: Range<usize>,
}

/// Statistics from one batching pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Region trees walked
    pub regions_walked: usize,
    /// Summed walk counters of every region
    pub walk: WalkStats,
    /// Distinct shaders drawn
    pub shader_ranges: usize,
    /// Instanced draw calls emitted
    pub segments: usize,
    /// Instances emitted
    pub flags: usize,
    /// Time spent walking regions, in microseconds
    pub walk_us: u64,
    /// Time spent merging and sorting keys, in microseconds
    pub sort_us: u64,
    /// Time spent compressing shader ranges, in microseconds
    pub compress_us: u64,
}

/// Split a sorted key buffer into one range per shader
///
/// Writes into `ranges` (cleared first) so the caller can reuse it.
pub fn partition_by_shader(keys: &[SortKey], ranges: &mut Vec<ShaderRange>) {
    ranges.clear();
    
    let Some(first) = keys.first() else {
        return;
    };
    
    let mut boundary = 0;
    let mut shader_id = first.shader_id();
    for (index, key) in keys.iter().enumerate().skip(1) {
        if key.shader_id() != shader_id {
            ranges.push(ShaderRange { shader_id, range: boundary..index });
            boundary = index;
            shader_id = key.shader_id();
        }
    }
    ranges.push(ShaderRange { shader_id, range: boundary..keys.len() });
}

/// Drives the per-frame batching pass over every region
pub struct BatchCoordinator {
    config: BatchingConfig,
    /// One batcher per region, indexed by region creation order
    batchers: Vec<RegionBatcher>,
    key_pool: VecPool<SortKey>,
    shader_ranges: Vec<ShaderRange>,
    stats: FrameStats,
}

impl BatchCoordinator {
    /// Create a coordinator with no batchers yet
    pub fn new(config: BatchingConfig) -> Self {
        let key_pool = VecPool::new(config.initial_key_capacity);
        Self {
            config,
            batchers: Vec::new(),
            key_pool,
            shader_ranges: Vec::new(),
            stats: FrameStats::default(),
        }
    }
    
    /// Statistics of the last pass
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }
    
    /// Region batchers, indexed by partition
    pub fn batchers(&self) -> &[RegionBatcher] {
        &self.batchers
    }
    
    /// Shader ranges found by the last pass
    pub fn shader_ranges(&self) -> &[ShaderRange] {
        &self.shader_ranges
    }
    
    /// Batch every object in `spatial` into `render_list`
    ///
    /// The index must be fully updated for the frame before this is called.
    pub fn batch_world<S, A>(
        &mut self,
        spatial: &SpatialIndex,
        scene: &S,
        assets: &A,
        render_list: &mut RenderList,
    ) -> BatchResult<FrameStats>
    where
        S: RenderableSource + ?Sized,
        A: AssetResolver + ?Sized,
    {
        render_list.clear_frame_data();
        self.stats = FrameStats::default();
        
        // Walk
        let walk_timer = Stopwatch::start_new();
        for batcher in &mut self.batchers {
            batcher.clear_frame_data();
        }
        while self.batchers.len() < spatial.region_count() {
            let partition = self.batchers.len() as u32;
            self.batchers.push(RegionBatcher::new(partition));
        }
        for (batcher, tree) in self.batchers.iter_mut().zip(spatial.regions()) {
            batcher.execute(tree, scene, assets, render_list.interner_mut());
            self.stats.walk.add(batcher.stats());
            self.stats.regions_walked += 1;
        }
        self.stats.walk_us = walk_timer.elapsed_us();
        
        // Merge and sort
        let sort_timer = Stopwatch::start_new();
        let total: usize = self.batchers.iter().map(|batcher| batcher.keys().len()).sum();
        let mut keys = self.key_pool.rent(total);
        for batcher in &self.batchers {
            keys.extend_from_slice(batcher.keys());
        }
        keys.sort_unstable();
        partition_by_shader(&keys, &mut self.shader_ranges);
        self.stats.sort_us = sort_timer.elapsed_us();
        
        // Compress
        let compress_timer = Stopwatch::start_new();
        let compressed = self.compress(&keys, render_list);
        self.key_pool.give_back(keys);
        compressed?;
        self.stats.compress_us = compress_timer.elapsed_us();
        
        self.stats.shader_ranges = self.shader_ranges.len();
        self.stats.segments = render_list.segment_count();
        self.stats.flags = render_list.flag_count();
        
        if self.config.log_frame_stats {
            log::debug!(
                "Batched {} regions: {} objects, {} instances in {} draws over {} shaders (walk {}us, sort {}us, compress {}us)",
                self.stats.regions_walked,
                self.stats.walk.visited,
                self.stats.flags,
                self.stats.segments,
                self.stats.shader_ranges,
                self.stats.walk_us,
                self.stats.sort_us,
                self.stats.compress_us,
            );
        }
        
        Ok(self.stats)
    }
    
    fn compress(&self, keys: &[SortKey], render_list: &mut RenderList) -> BatchResult<()> {
        for shader_range in &self.shader_ranges {
            let shader = render_list
                .interner()
                .shaders
                .resolve(shader_range.shader_id)
                .ok_or(BatchError::UnknownShader(shader_range.shader_id))?;
            
            render_list
                .begin_shader(shader)
                .execute(&keys[shader_range.range.clone()], &self.batchers)?;
        }
        Ok(())
    }
}

impl Default for BatchCoordinator {
    fn default() -> Self {
        Self::new(BatchingConfig::default())
    }
}
