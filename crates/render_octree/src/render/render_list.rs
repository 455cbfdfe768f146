//! The finished per-frame draw list
//!
//! A [`RenderList`] is the only output of the batching pipeline: an ordered
//! sequence of shader batches, each holding instanced draw ranges and the
//! instance records they index. The dense ids in sort keys and render flags
//! resolve through the list's [`ResourceInterner`].

use std::collections::HashMap;

use crate::assets::{MaterialRef, MeshSourceRef, ShaderRef};
use crate::foundation::collections::Interner;
use super::batching::ShaderBatch;

/// Dense id tables for the resources seen during one frame
///
/// Ids are assigned in first-seen order and reset every frame.
#[derive(Debug, Default)]
pub struct ResourceInterner {
    /// Shader ids
    pub shaders: Interner<ShaderRef>,
    /// Mesh source ids
    pub meshes: Interner<MeshSourceRef>,
    /// Material ids, the values carried by render flags
    pub materials: Interner<MaterialRef>,
}

impl ResourceInterner {
    /// Forget every id, keeping allocations
    pub fn clear(&mut self) {
        self.shaders.clear();
        self.meshes.clear();
        self.materials.clear();
    }
}

/// Draw list for one frame, ordered by shader
#[derive(Debug, Default)]
pub struct RenderList {
    interner: ResourceInterner,
    /// One batch per shader ever drawn; buffers are reused across frames
    batches: HashMap<ShaderRef, ShaderBatch>,
    /// Shaders drawn this frame, in sort order
    active: Vec<ShaderRef>,
}

impl RenderList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Shader batches drawn this frame, in sort order
    pub fn shader_batches(&self) -> impl Iterator<Item = &ShaderBatch> {
        self.active.iter().filter_map(|shader| self.batches.get(shader))
    }
    
    /// Batch of one shader, if it was drawn this frame
    pub fn shader_batch(&self, shader: ShaderRef) -> Option<&ShaderBatch> {
        if self.active.contains(&shader) {
            self.batches.get(&shader)
        } else {
            None
        }
    }
    
    /// Number of shaders drawn this frame
    pub fn shader_count(&self) -> usize {
        self.active.len()
    }
    
    /// Total instanced draw calls this frame
    pub fn segment_count(&self) -> usize {
        self.shader_batches().map(|batch| batch.segments().len()).sum()
    }
    
    /// Total instances this frame
    pub fn flag_count(&self) -> usize {
        self.shader_batches().map(|batch| batch.flags().len()).sum()
    }
    
    /// Check if nothing is drawn this frame
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
    
    /// Dense id tables of this frame
    pub fn interner(&self) -> &ResourceInterner {
        &self.interner
    }
    
    /// Resolve a render flag's material index
    pub fn material_for_index(&self, material_index: u32) -> Option<MaterialRef> {
        self.interner.materials.resolve(material_index)
    }
    
    pub(crate) fn interner_mut(&mut self) -> &mut ResourceInterner {
        &mut self.interner
    }
    
    /// Drop this frame's contents, keeping every buffer
    pub fn clear_frame_data(&mut self) {
        self.interner.clear();
        for shader in self.active.drain(..) {
            if let Some(batch) = self.batches.get_mut(&shader) {
                batch.clear();
            }
        }
    }
    
    /// Activate the batch of `shader` for this frame and return it, empty
    pub(crate) fn begin_shader(&mut self, shader: ShaderRef) -> &mut ShaderBatch {
        self.active.push(shader);
        let batch = self.batches.entry(shader).or_insert_with(|| ShaderBatch::new(shader));
        batch.clear();
        batch
    }
}
