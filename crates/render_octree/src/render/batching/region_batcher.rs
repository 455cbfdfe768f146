//! Per-region walk producing sort keys and entity snapshots

use std::collections::VecDeque;

use crate::assets::{AssetResolver, MaterialRef, MeshRef, ShaderRef};
use crate::foundation::math::Mat4;
use crate::render::ResourceInterner;
use crate::scene::{ObjectHandle, RenderableSource};
use crate::spatial::{OctantId, OctantPayload, RegionTree};
use super::sort_key::SortKey;

/// Render state of one object, captured at walk time
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    /// Material after default fallback
    pub material: MaterialRef,
    /// Mesh to draw
    pub mesh: MeshRef,
    /// World transform
    pub world_matrix: Mat4,
}

/// Counters from one region walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Objects found in the region's leaves
    pub visited: usize,
    /// Objects skipped because they have no mesh
    pub skipped_no_mesh: usize,
    /// Objects skipped because not even the default material has a shader
    pub skipped_no_shader: usize,
    /// Objects skipped because an interned id overflowed its sort key field
    pub skipped_key_overflow: usize,
    /// Objects drawn with the default material
    pub material_fallbacks: usize,
}

impl WalkStats {
    /// Accumulate another walk's counters
    pub fn add(&mut self, other: &Self) {
        self.visited += other.visited;
        self.skipped_no_mesh += other.skipped_no_mesh;
        self.skipped_no_shader += other.skipped_no_shader;
        self.skipped_key_overflow += other.skipped_key_overflow;
        self.material_fallbacks += other.material_fallbacks;
    }
    
    /// Objects that produced a key
    pub fn batched(&self) -> usize {
        self.visited - self.skipped_no_mesh - self.skipped_no_shader - self.skipped_key_overflow
    }
}

/// Walks one region tree per frame
///
/// Every output buffer is owned by the batcher, so batchers of different
/// regions never write to shared memory.
pub struct RegionBatcher {
    partition: u32,
    queue: VecDeque<OctantId>,
    keys: Vec<SortKey>,
    snapshots: Vec<EntitySnapshot>,
    stats: WalkStats,
}

impl RegionBatcher {
    /// Create a batcher whose keys carry `partition` in their locator
    pub fn new(partition: u32) -> Self {
        Self {
            partition,
            queue: VecDeque::new(),
            keys: Vec::new(),
            snapshots: Vec::new(),
            stats: WalkStats::default(),
        }
    }
    
    /// Partition index of this batcher
    pub fn partition(&self) -> u32 {
        self.partition
    }
    
    /// Keys produced by the last walk
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }
    
    /// Snapshots produced by the last walk, indexed by a key's data index
    pub fn snapshots(&self) -> &[EntitySnapshot] {
        &self.snapshots
    }
    
    /// Snapshot addressed by a key's data index
    pub fn snapshot(&self, data_index: u32) -> Option<&EntitySnapshot> {
        self.snapshots.get(data_index as usize)
    }
    
    /// Counters from the last walk
    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }
    
    /// Reset the output buffers, keeping their capacity
    pub fn clear_frame_data(&mut self) {
        self.queue.clear();
        self.keys.clear();
        self.snapshots.clear();
        self.stats = WalkStats::default();
    }
    
    /// Breadth-first walk of `tree`, appending one key and one snapshot per
    /// drawable object
    pub fn execute<S, A>(
        &mut self,
        tree: &RegionTree,
        scene: &S,
        assets: &A,
        interner: &mut ResourceInterner,
    ) where
        S: RenderableSource + ?Sized,
        A: AssetResolver + ?Sized,
    {
        self.clear_frame_data();
        self.queue.push_back(tree.root_id());
        
        while let Some(id) = self.queue.pop_front() {
            let Some(octant) = tree.octant(id) else {
                log::error!("Octant {} of region {:?} is linked but not registered", id, tree.address());
                continue;
            };
            
            match octant.payload() {
                OctantPayload::Internal { children } => self.queue.extend(children.iter().copied()),
                OctantPayload::Leaf { entities } => {
                    for &object in entities {
                        self.visit(object, scene, assets, interner);
                    }
                }
            }
        }
    }
    
    #[cfg(test)]
    pub(crate) fn push_for_test(&mut self, snapshot: EntitySnapshot) {
        self.snapshots.push(snapshot);
    }
    
    fn visit<S, A>(&mut self, object: ObjectHandle, scene: &S, assets: &A, interner: &mut ResourceInterner)
    where
        S: RenderableSource + ?Sized,
        A: AssetResolver + ?Sized,
    {
        self.stats.visited += 1;
        
        let Some(mesh) = scene.mesh(object) else {
            log::warn!("Skipping object {:?}: no mesh", object);
            self.stats.skipped_no_mesh += 1;
            return;
        };
        
        let Some((material, shader)) = self.resolve_material(object, scene, assets) else {
            self.stats.skipped_no_shader += 1;
            return;
        };
        
        let shader_id = interner.shaders.intern(shader);
        let mesh_id = interner.meshes.intern(mesh.source);
        let material_id = interner.materials.intern(material);
        let data_index = self.snapshots.len() as u32;
        
        let Some(key) = SortKey::try_new(
            shader_id,
            mesh_id,
            material_id,
            u32::from(mesh.submesh),
            self.partition,
            data_index,
        ) else {
            log::warn!(
                "Skipping object {:?}: ids (shader {}, mesh {}, material {}, submesh {}) overflow the sort key",
                object, shader_id, mesh_id, material_id, mesh.submesh
            );
            self.stats.skipped_key_overflow += 1;
            return;
        };
        
        self.keys.push(key);
        self.snapshots.push(EntitySnapshot {
            material,
            mesh,
            world_matrix: scene.world_matrix(object),
        });
    }
    
    fn resolve_material<S, A>(&mut self, object: ObjectHandle, scene: &S, assets: &A) -> Option<(MaterialRef, ShaderRef)>
    where
        S: RenderableSource + ?Sized,
        A: AssetResolver + ?Sized,
    {
        let requested = scene
            .material(object)
            .and_then(|material| assets.shader_of(material).map(|shader| (material, shader)));
        if requested.is_some() {
            return requested;
        }
        
        let fallback = assets.default_material();
        match assets.shader_of(fallback) {
            Some(shader) => {
                self.stats.material_fallbacks += 1;
                Some((fallback, shader))
            }
            None => {
                log::warn!("Skipping object {:?}: default material {:?} has no shader", object, fallback);
                None
            }
        }
    }
}
