//! # Render Batching
//!
//! Turns the contents of the spatial index into a [`RenderList`] once per frame.
//!
//! ## Architecture
//!
//! - **RegionBatcher**: walks one region tree and captures a sort key plus an
//!   entity snapshot per renderable object, into buffers it owns exclusively
//! - **BatchCoordinator**: merges every batcher's keys, sorts them, and splits
//!   the sorted buffer into one range per shader
//! - **ShaderBatch**: run-length compresses one shader range into render
//!   segments (one instanced draw each) and per-instance render flags
//!
//! Walks share no mutable state except the resource interner, so the walk
//! phase can fan out over regions. Merging, sorting and compression wait for
//! every walk to finish.
//!
//! [`RenderList`]: crate::render::RenderList

mod coordinator;
mod region_batcher;
mod shader_batch;
mod sort_key;

pub use coordinator::{BatchCoordinator, FrameStats, ShaderRange, partition_by_shader};
pub use region_batcher::{EntitySnapshot, RegionBatcher, WalkStats};
pub use shader_batch::{RenderFlag, RenderSegment, ShaderBatch};
pub use sort_key::SortKey;

/// Result type for batching operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that can occur while compressing sorted keys
///
/// Both indicate a sort key that no longer matches the frame's walk output,
/// which cannot happen when keys and snapshots come from the same frame.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A key's locator points past the snapshots of its batcher
    #[error("No snapshot at partition {partition}, index {index}")]
    MissingSnapshot {
        /// Batcher the key came from
        partition: u32,
        /// Snapshot index within that batcher
        index: u32,
    },
    
    /// A key's shader id was never interned this frame
    #[error("Unknown shader id {0}")]
    UnknownShader(u32),
}
