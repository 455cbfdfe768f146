//! Scene objects as seen by the spatial index and the batcher
//!
//! Entity storage belongs to the scene layer. The pipeline reads objects
//! through [`RenderableSource`] and is told about objects gaining or losing
//! renderable bounds through [`SceneEvent`]s.
//!
//! ```text
//! Scene layer (objects, transforms, bounds)
//!      ↓ events + reads
//! SpatialIndex → BatchCoordinator → RenderList
//! ```

mod scene_objects;

pub use scene_objects::{SceneObject, SceneObjects};

use crate::assets::{MaterialRef, MeshRef};
use crate::foundation::math::Mat4;
use crate::spatial::AABB;

slotmap::new_key_type! {
    /// Handle to a renderable scene object
    pub struct ObjectHandle;
}

/// Structural notification from the scene layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// The object now has renderable bounds and should be indexed
    BoundsGained(ObjectHandle),
    /// The object lost its renderable bounds (or was destroyed)
    BoundsLost(ObjectHandle),
}

/// Read access to renderable objects, provided by the scene layer
pub trait RenderableSource {
    /// Current world-space bounds, `None` if the object has none (or is gone)
    fn world_bounds(&self, object: ObjectHandle) -> Option<AABB>;
    
    /// Whether the bounds were written during the current frame
    fn bounds_changed_this_frame(&self, object: ObjectHandle) -> bool;
    
    /// Mesh to draw, `None` if unassigned or unresolved
    fn mesh(&self, object: ObjectHandle) -> Option<MeshRef>;
    
    /// Material to draw with, `None` to use the default material
    fn material(&self, object: ObjectHandle) -> Option<MaterialRef>;
    
    /// World transform of the object
    fn world_matrix(&self, object: ObjectHandle) -> Mat4;
    
    /// Move all queued structural events into `events`
    fn drain_events_into(&mut self, events: &mut Vec<SceneEvent>);
}
