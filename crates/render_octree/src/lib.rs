//! # Render Octree
//!
//! A dynamic spatial index of renderable objects plus the per-frame pipeline
//! that turns it into instanced, shader-grouped draw lists.
//!
//! ## Features
//!
//! - **Region Octrees**: world space split into fixed-size regions, each an
//!   adaptive octree that splits and merges as objects move
//! - **Incremental Updates**: insert, remove and move touch one path of one tree
//! - **Sort-Key Batching**: one packed key per object orders the frame by
//!   shader, mesh and material
//! - **Instanced Output**: one draw per run of identical mesh and material,
//!   with GPU-ready per-instance records
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_octree::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut assets = MaterialLibrary::new();
//!     let shader = assets.register_shader("lit");
//!     let material = assets.register_material("rock", Some(shader));
//!
//!     let mut scene = SceneObjects::new();
//!     let mesh = MeshRef::whole(MeshSourceRef(0));
//!     scene.spawn(Some(mesh), Some(material), &Transform::from_position(Vec3::new(1.0, 2.0, 3.0)), 0.5);
//!
//!     let mut frame = FrameContext::new(&PipelineConfig::default())?;
//!     let list = frame.run_frame(&mut scene, &assets)?;
//!     for batch in list.shader_batches() {
//!         for segment in batch.segments() {
//!             // draw segment.instance_count() instances of segment.mesh
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod config;
pub mod foundation;
pub mod assets;
pub mod scene;
pub mod spatial;
pub mod render;
pub mod pipeline;

pub use pipeline::{FrameContext, FrameError, FrameResult};

/// Common imports for pipeline users
pub mod prelude {
    pub use crate::{
        FrameContext, FrameError, FrameResult,
        assets::{AssetResolver, MaterialLibrary, MaterialRef, MeshRef, MeshSourceRef, ShaderRef},
        core::config::{BatchingConfig, Config, PipelineConfig, SpatialConfig},
        foundation::math::{Mat4, Transform, Vec3},
        render::{
            RenderList,
            batching::{FrameStats, RenderFlag, RenderSegment, ShaderBatch},
        },
        scene::{ObjectHandle, RenderableSource, SceneEvent, SceneObjects},
        spatial::{AABB, MoveOutcome, RegionAddress, SpatialError, SpatialIndex},
    };
}
