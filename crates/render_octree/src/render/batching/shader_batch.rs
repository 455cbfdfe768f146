//! Per-shader run-length compression of sorted keys

use bytemuck::{Pod, Zeroable};

use crate::assets::{MaterialRef, MeshRef, ShaderRef};
use crate::foundation::math::{mat4_to_cols, Mat4};
use super::region_batcher::{EntitySnapshot, RegionBatcher};
use super::sort_key::SortKey;
use super::{BatchError, BatchResult};

/// One contiguous run of instances sharing mesh and material
///
/// Covers `flags[start_index..end_index]` of its shader batch; one instanced
/// draw call each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSegment {
    /// Material of every instance in the run
    pub material: MaterialRef,
    /// Mesh of every instance in the run
    pub mesh: MeshRef,
    /// First flag index (inclusive)
    pub start_index: u32,
    /// Last flag index (exclusive)
    pub end_index: u32,
}

impl RenderSegment {
    /// Number of instances drawn by this segment
    pub fn instance_count(&self) -> u32 {
        self.end_index - self.start_index
    }
}

/// Per-instance record uploaded to the GPU
///
/// Layout matches a std430 struct `{ mat4 model; uint material; }` padded to
/// 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RenderFlag {
    /// Column-major world matrix
    pub world_matrix: [[f32; 4]; 4],
    /// Dense material id for this frame
    pub material_index: u32,
    _padding: [u32; 3],
}

impl RenderFlag {
    /// Build a flag from a world matrix and dense material id
    pub fn new(world_matrix: &Mat4, material_index: u32) -> Self {
        Self {
            world_matrix: mat4_to_cols(world_matrix),
            material_index,
            _padding: [0; 3],
        }
    }
}

/// Draw data for one shader in one frame
#[derive(Debug)]
pub struct ShaderBatch {
    shader: ShaderRef,
    segments: Vec<RenderSegment>,
    flags: Vec<RenderFlag>,
}

impl ShaderBatch {
    /// Create an empty batch for `shader`
    pub fn new(shader: ShaderRef) -> Self {
        Self {
            shader,
            segments: Vec::new(),
            flags: Vec::new(),
        }
    }
    
    /// Shader every segment is drawn with
    pub fn shader(&self) -> ShaderRef {
        self.shader
    }
    
    /// Instanced draw ranges, in sort order
    pub fn segments(&self) -> &[RenderSegment] {
        &self.segments
    }
    
    /// Per-instance records, in the order the segments index them
    pub fn flags(&self) -> &[RenderFlag] {
        &self.flags
    }
    
    /// Flags as raw bytes for an instance buffer upload
    pub fn flag_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.flags)
    }
    
    /// Reset segments and flags, keeping their capacity
    pub fn clear(&mut self) {
        self.segments.clear();
        self.flags.clear();
    }
    
    /// Compress the sorted keys of this shader into segments and flags
    ///
    /// `keys` must all carry this batch's shader and be sorted; their locators
    /// address snapshots in `batchers`.
    pub fn execute(&mut self, keys: &[SortKey], batchers: &[RegionBatcher]) -> BatchResult<()> {
        self.clear();
        
        let Some(first) = keys.first() else {
            return Ok(());
        };
        
        if keys.len() == 1 {
            let snapshot = Self::snapshot_for(first, batchers)?;
            self.segments.push(RenderSegment {
                material: snapshot.material,
                mesh: snapshot.mesh,
                start_index: 0,
                end_index: 1,
            });
            self.flags.push(RenderFlag::new(&snapshot.world_matrix, first.material_id()));
            return Ok(());
        }
        
        self.flags.reserve(keys.len());
        let mut group_key = first;
        let mut group_snapshot = Self::snapshot_for(first, batchers)?;
        let mut group_start = 0u32;
        
        for (index, key) in keys.iter().enumerate() {
            let index = index as u32;
            let snapshot = Self::snapshot_for(key, batchers)?;
            
            if !key.same_group(group_key) {
                self.segments.push(RenderSegment {
                    material: group_snapshot.material,
                    mesh: group_snapshot.mesh,
                    start_index: group_start,
                    end_index: index,
                });
                group_key = key;
                group_snapshot = snapshot;
                group_start = index;
            }
            
            self.flags.push(RenderFlag::new(&snapshot.world_matrix, key.material_id()));
        }
        
        self.segments.push(RenderSegment {
            material: group_snapshot.material,
            mesh: group_snapshot.mesh,
            start_index: group_start,
            end_index: keys.len() as u32,
        });
        
        Ok(())
    }
    
    fn snapshot_for<'a>(key: &SortKey, batchers: &'a [RegionBatcher]) -> BatchResult<&'a EntitySnapshot> {
        batchers
            .get(key.partition() as usize)
            .and_then(|batcher| batcher.snapshot(key.data_index()))
            .ok_or(BatchError::MissingSnapshot {
                partition: key.partition(),
                index: key.data_index(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MeshSourceRef;
    use crate::foundation::math::{Transform, Vec3};
    use approx::assert_relative_eq;

    fn batcher_with(entries: &[(MaterialRef, u32, f32)]) -> (RegionBatcher, Vec<SortKey>) {
        let mut batcher = RegionBatcher::new(0);
        let mut keys = Vec::new();
        for (index, &(material, material_id, x)) in entries.iter().enumerate() {
            batcher.push_for_test(EntitySnapshot {
                material,
                mesh: MeshRef::whole(MeshSourceRef(1)),
                world_matrix: Transform::from_position(Vec3::new(x, 0.0, 0.0)).to_matrix(),
            });
            keys.push(SortKey::try_new(0, 0, material_id, 0, 0, index as u32).unwrap());
        }
        keys.sort_unstable();
        (batcher, keys)
    }

    #[test]
    fn test_single_key_emits_one_segment() {
        let (batcher, keys) = batcher_with(&[(MaterialRef(7), 0, 1.0)]);
        let mut batch = ShaderBatch::new(ShaderRef(0));
        batch.execute(&keys, std::slice::from_ref(&batcher)).unwrap();

        assert_eq!(batch.segments().len(), 1);
        assert_eq!(batch.segments()[0].instance_count(), 1);
        assert_eq!(batch.flags().len(), 1);
    }

    #[test]
    fn test_runs_are_compressed_and_cover_the_range() {
        let (batcher, keys) = batcher_with(&[
            (MaterialRef(1), 0, 1.0),
            (MaterialRef(2), 1, 2.0),
            (MaterialRef(1), 0, 3.0),
            (MaterialRef(3), 2, 4.0),
            (MaterialRef(2), 1, 5.0),
        ]);
        let mut batch = ShaderBatch::new(ShaderRef(0));
        batch.execute(&keys, std::slice::from_ref(&batcher)).unwrap();

        let ranges: Vec<_> = batch
            .segments()
            .iter()
            .map(|segment| (segment.material, segment.start_index, segment.end_index))
            .collect();
        assert_eq!(
            ranges,
            vec![(MaterialRef(1), 0, 2), (MaterialRef(2), 2, 4), (MaterialRef(3), 4, 5)]
        );
        assert_eq!(batch.flags().len(), 5);

        for (flag, expected_x) in batch.flags().iter().zip([1.0, 3.0, 2.0, 5.0, 4.0]) {
            assert_relative_eq!(flag.world_matrix[3][0], expected_x);
        }
        assert_eq!(batch.flags()[2].material_index, 1);
    }

    #[test]
    fn test_empty_range_emits_nothing() {
        let mut batch = ShaderBatch::new(ShaderRef(0));
        batch.execute(&[], &[]).unwrap();
        assert!(batch.segments().is_empty());
        assert!(batch.flags().is_empty());
    }

    #[test]
    fn test_dangling_locator_is_an_error() {
        let key = SortKey::try_new(0, 0, 0, 0, 5, 0).unwrap();
        let mut batch = ShaderBatch::new(ShaderRef(0));
        let result = batch.execute(&[key], &[]);
        assert!(matches!(result, Err(BatchError::MissingSnapshot { partition: 5, index: 0 })));
    }

    #[test]
    fn test_flag_is_gpu_sized() {
        assert_eq!(std::mem::size_of::<RenderFlag>(), 80);
        let batch = ShaderBatch::new(ShaderRef(0));
        assert!(batch.flag_bytes().is_empty());
    }
}
