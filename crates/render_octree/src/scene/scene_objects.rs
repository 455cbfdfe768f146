//! In-memory scene object store
//!
//! A minimal scene layer: a slot map of objects with transforms, bounds and
//! render references, plus the event queue the spatial index consumes.

use slotmap::SlotMap;

use crate::assets::{MaterialRef, MeshRef};
use crate::foundation::math::{Mat4, Transform, Vec3};
use crate::spatial::AABB;
use super::{ObjectHandle, RenderableSource, SceneEvent};

/// One renderable object
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// World transform
    pub world_matrix: Mat4,
    /// Renderable world bounds, if any
    pub bounds: Option<AABB>,
    /// Mesh to draw
    pub mesh: Option<MeshRef>,
    /// Material to draw with
    pub material: Option<MaterialRef>,
    /// Frame the bounds were last written in
    bounds_frame: u64,
}

/// Slot-map backed scene store implementing [`RenderableSource`]
pub struct SceneObjects {
    objects: SlotMap<ObjectHandle, SceneObject>,
    events: Vec<SceneEvent>,
    frame_index: u64,
}

impl SceneObjects {
    /// Create an empty scene
    pub fn new() -> Self {
        Self {
            objects: SlotMap::with_key(),
            events: Vec::new(),
            frame_index: 0,
        }
    }
    
    /// Advance the frame counter; bounds written afterwards count as changed this frame
    pub fn begin_frame(&mut self) {
        self.frame_index += 1;
    }
    
    /// Current frame counter
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
    
    /// Create an object placed by `transform`, with a cubic bounding box of
    /// `half_extent` around its position
    pub fn spawn(
        &mut self,
        mesh: Option<MeshRef>,
        material: Option<MaterialRef>,
        transform: &Transform,
        half_extent: f32,
    ) -> ObjectHandle {
        let handle = self.spawn_unbounded(mesh, material, transform);
        self.set_bounds(handle, Some(Self::cube_bounds(transform.position, half_extent)));
        handle
    }
    
    /// Create an object without renderable bounds
    pub fn spawn_unbounded(
        &mut self,
        mesh: Option<MeshRef>,
        material: Option<MaterialRef>,
        transform: &Transform,
    ) -> ObjectHandle {
        self.objects.insert(SceneObject {
            world_matrix: transform.to_matrix(),
            bounds: None,
            mesh,
            material,
            bounds_frame: self.frame_index,
        })
    }
    
    /// Update transform and bounds together
    pub fn set_transform(&mut self, handle: ObjectHandle, transform: &Transform, half_extent: f32) -> bool {
        let Some(object) = self.objects.get_mut(handle) else {
            return false;
        };
        object.world_matrix = transform.to_matrix();
        self.set_bounds(handle, Some(Self::cube_bounds(transform.position, half_extent)))
    }
    
    /// Write the renderable bounds of an object, queueing gained/lost events
    pub fn set_bounds(&mut self, handle: ObjectHandle, bounds: Option<AABB>) -> bool {
        let Some(object) = self.objects.get_mut(handle) else {
            return false;
        };
        
        match (object.bounds.is_some(), bounds.is_some()) {
            (false, true) => self.events.push(SceneEvent::BoundsGained(handle)),
            (true, false) => self.events.push(SceneEvent::BoundsLost(handle)),
            _ => {}
        }
        
        object.bounds = bounds;
        object.bounds_frame = self.frame_index;
        true
    }
    
    /// Change the material of an object
    pub fn set_material(&mut self, handle: ObjectHandle, material: Option<MaterialRef>) -> bool {
        self.objects.get_mut(handle).map(|object| object.material = material).is_some()
    }
    
    /// Change the mesh of an object
    pub fn set_mesh(&mut self, handle: ObjectHandle, mesh: Option<MeshRef>) -> bool {
        self.objects.get_mut(handle).map(|object| object.mesh = mesh).is_some()
    }
    
    /// Destroy an object, queueing a lost-bounds event if it was indexed
    pub fn destroy(&mut self, handle: ObjectHandle) -> Option<SceneObject> {
        let object = self.objects.remove(handle)?;
        if object.bounds.is_some() {
            self.events.push(SceneEvent::BoundsLost(handle));
        }
        Some(object)
    }
    
    /// Look up an object
    pub fn get(&self, handle: ObjectHandle) -> Option<&SceneObject> {
        self.objects.get(handle)
    }
    
    /// Iterate over all objects
    pub fn iter(&self) -> impl Iterator<Item = (ObjectHandle, &SceneObject)> {
        self.objects.iter()
    }
    
    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }
    
    /// Check if the scene has no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
    
    /// Number of queued structural events
    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }
    
    fn cube_bounds(center: Vec3, half_extent: f32) -> AABB {
        AABB::from_center_extents(center, Vec3::new(half_extent, half_extent, half_extent))
    }
}

impl Default for SceneObjects {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderableSource for SceneObjects {
    fn world_bounds(&self, object: ObjectHandle) -> Option<AABB> {
        self.objects.get(object)?.bounds
    }
    
    fn bounds_changed_this_frame(&self, object: ObjectHandle) -> bool {
        self.objects
            .get(object)
            .is_some_and(|o| o.bounds_frame == self.frame_index)
    }
    
    fn mesh(&self, object: ObjectHandle) -> Option<MeshRef> {
        self.objects.get(object)?.mesh
    }
    
    fn material(&self, object: ObjectHandle) -> Option<MaterialRef> {
        self.objects.get(object)?.material
    }
    
    fn world_matrix(&self, object: ObjectHandle) -> Mat4 {
        self.objects
            .get(object)
            .map_or_else(Mat4::identity, |o| o.world_matrix)
    }
    
    fn drain_events_into(&mut self, events: &mut Vec<SceneEvent>) {
        events.append(&mut self.events);
    }
}
