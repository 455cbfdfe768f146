//! Octants: the nodes of a region octree
//!
//! Octants never hold references to each other. Parent and child links are
//! octant ids, resolved through the owning [`RegionTree`](super::RegionTree)'s
//! id lookup table, because split and merge destroy and recreate nodes.

use slotmap::SecondaryMap;

use crate::foundation::math::Vec3;
use crate::scene::ObjectHandle;
use super::bounds::AABB;
use super::region::RegionAddress;

/// Identifier of an octant within its region
pub type OctantId = i32;

/// Records which region and octant currently own an object
///
/// This is the only state needed to remove an object without searching the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OctantTag {
    /// Region whose tree holds the object
    pub region: RegionAddress,
    /// Leaf octant listing the object
    pub octant_id: OctantId,
}

/// Tracking record for one object in the spatial index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Current owner of the object
    pub tag: OctantTag,
    /// Bounds the object was last placed with
    pub bounds: AABB,
}

/// Placement table shared by all region trees of one index
pub(crate) type Placements = SecondaryMap<ObjectHandle, Placement>;

/// Leaf-or-internal shape of an octant
#[derive(Debug, Clone, PartialEq)]
pub enum OctantPayload {
    /// Octant that owns objects directly
    Leaf {
        /// Owned objects in encounter order
        entities: Vec<ObjectHandle>,
    },
    /// Octant subdivided into exactly eight children
    Internal {
        /// Child ids, indexed by [`Octant::child_index_for`]
        children: [OctantId; 8],
    },
}

/// Single node in a region octree
#[derive(Debug, Clone)]
pub struct Octant {
    bounds: AABB,
    id: OctantId,
    /// Integer center coordinate the id is packed from
    lattice: [i32; 3],
    parent: Option<OctantId>,
    depth: u32,
    payload: OctantPayload,
}

impl Octant {
    /// Create the root leaf of a region tree of depth `max_depth`
    ///
    /// Lattice coordinates count cells of `region_size / 2^(max_depth + 1)`
    /// from the region minimum, so the root center sits at `2^max_depth` on
    /// every axis.
    pub(crate) fn root(bounds: AABB, max_depth: u32) -> Self {
        let center = 1 << max_depth;
        Self::new(None, 0, bounds, [center; 3])
    }
    
    /// Create an empty leaf whose center lies on `lattice`
    pub(crate) fn new(parent: Option<OctantId>, depth: u32, bounds: AABB, lattice: [i32; 3]) -> Self {
        Self {
            bounds,
            id: craft_id(lattice[0], lattice[1], lattice[2]),
            lattice,
            parent,
            depth,
            payload: OctantPayload::Leaf { entities: Vec::new() },
        }
    }
    
    /// World-space bounds
    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }
    
    /// Octant id, unique within its region
    pub fn id(&self) -> OctantId {
        self.id
    }
    
    /// Integer lattice coordinate of the center
    pub fn lattice(&self) -> [i32; 3] {
        self.lattice
    }
    
    /// Id of the parent octant, `None` for the region root
    pub fn parent(&self) -> Option<OctantId> {
        self.parent
    }
    
    /// Depth in the tree (0 = root)
    pub fn depth(&self) -> u32 {
        self.depth
    }
    
    /// Leaf or internal payload
    pub fn payload(&self) -> &OctantPayload {
        &self.payload
    }
    
    /// Check if this octant is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self.payload, OctantPayload::Leaf { .. })
    }
    
    /// Objects owned by this octant; always empty for internal octants
    pub fn entities(&self) -> &[ObjectHandle] {
        match &self.payload {
            OctantPayload::Leaf { entities } => entities,
            OctantPayload::Internal { .. } => &[],
        }
    }
    
    /// Child ids of an internal octant
    pub fn children(&self) -> Option<&[OctantId; 8]> {
        match &self.payload {
            OctantPayload::Leaf { .. } => None,
            OctantPayload::Internal { children } => Some(children),
        }
    }
    
    /// Number of objects owned directly
    pub fn entity_count(&self) -> usize {
        self.entities().len()
    }
    
    /// Get the child index (0-7) for a position within this octant's bounds
    pub fn child_index_for(&self, position: Vec3) -> usize {
        let center = self.bounds.center();
        let x_bit = usize::from(position.x >= center.x);
        let y_bit = usize::from(position.y >= center.y);
        let z_bit = usize::from(position.z >= center.z);
        
        // Child layout:
        // 0: -X, -Y, -Z (bottom-left-back)
        // 1: +X, -Y, -Z (bottom-right-back)
        // 2: -X, +Y, -Z (top-left-back)
        // 3: +X, +Y, -Z (top-right-back)
        // 4: -X, -Y, +Z (bottom-left-front)
        // 5: +X, -Y, +Z (bottom-right-front)
        // 6: -X, +Y, +Z (top-left-front)
        // 7: +X, +Y, +Z (top-right-front)
        (z_bit << 2) | (y_bit << 1) | x_bit
    }
    
    /// Bounds of the child at `index`, halving each axis
    pub fn child_bounds(&self, index: usize) -> AABB {
        let half = self.bounds.size() * 0.5;
        let offset = Vec3::new(
            if index & 1 != 0 { half.x } else { 0.0 },
            if index & 2 != 0 { half.y } else { 0.0 },
            if index & 4 != 0 { half.z } else { 0.0 },
        );
        let min = self.bounds.min + offset;
        AABB::new(min, min + half)
    }
    
    /// Lattice coordinate of the child at `index` in a tree of depth `max_depth`
    ///
    /// Children sit half a child edge away from the parent center. `None` once
    /// the child would be deeper than `max_depth`.
    pub fn child_lattice(&self, index: usize, max_depth: u32) -> Option<[i32; 3]> {
        let shift = max_depth.checked_sub(self.depth + 1)?;
        let step = 1 << shift;
        let offset = |bit: usize| if index & bit != 0 { step } else { -step };
        Some([
            self.lattice[0] + offset(1),
            self.lattice[1] + offset(2),
            self.lattice[2] + offset(4),
        ])
    }
    
    /// Add an object to a leaf; returns false if already present or not a leaf
    pub(crate) fn emplace_entity(&mut self, object: ObjectHandle) -> bool {
        match &mut self.payload {
            OctantPayload::Leaf { entities } if !entities.contains(&object) => {
                entities.push(object);
                true
            }
            _ => false,
        }
    }
    
    /// Remove an object from a leaf, keeping the order of the others
    pub(crate) fn remove_entity(&mut self, object: ObjectHandle) -> bool {
        if let OctantPayload::Leaf { entities } = &mut self.payload {
            if let Some(index) = entities.iter().position(|e| *e == object) {
                entities.remove(index);
                return true;
            }
        }
        false
    }
    
    /// Swap in a new payload, returning the old one
    pub(crate) fn replace_payload(&mut self, payload: OctantPayload) -> OctantPayload {
        std::mem::replace(&mut self.payload, payload)
    }
}

/// Interleave a lattice point into an octant id
pub const fn craft_id(x: i32, y: i32, z: i32) -> OctantId {
    x << 21 | y << 10 | z
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use slotmap::SlotMap;

    fn root() -> Octant {
        let bounds = AABB::new(Vec3::zeros(), Vec3::new(128.0, 128.0, 128.0));
        Octant::root(bounds, 4)
    }

    /// Build every octant of a fully subdivided tree of depth `max_depth`
    fn full_tree(root: Octant, max_depth: u32) -> Vec<Octant> {
        let mut all = Vec::new();
        let mut frontier = vec![root];
        while let Some(octant) = frontier.pop() {
            for index in 0..8 {
                if let Some(lattice) = octant.child_lattice(index, max_depth) {
                    frontier.push(Octant::new(
                        Some(octant.id()),
                        octant.depth() + 1,
                        octant.child_bounds(index),
                        lattice,
                    ));
                }
            }
            all.push(octant);
        }
        all
    }

    #[test]
    fn test_root_id_from_center() {
        assert_eq!(root().id(), craft_id(16, 16, 16));
        assert_eq!(root().lattice(), [16, 16, 16]);
    }

    #[test]
    fn test_child_bounds_match_child_index() {
        let octant = root();
        for index in 0..8 {
            let child = octant.child_bounds(index);
            assert_relative_eq!(child.size(), Vec3::new(64.0, 64.0, 64.0));
            assert_eq!(octant.child_index_for(child.center()), index);
        }
        assert_relative_eq!(octant.child_bounds(5).min, Vec3::new(64.0, 0.0, 64.0));
    }

    #[test]
    fn test_ids_unique_across_depths() {
        let all = full_tree(root(), 4);
        let ids: std::collections::HashSet<_> = all.iter().map(Octant::id).collect();
        assert_eq!(all.len(), 1 + 8 + 64 + 512 + 4096);
        assert_eq!(ids.len(), all.len());
        assert!(all.iter().all(|octant| octant.depth() <= 4));
    }

    #[test]
    fn test_ids_unique_for_awkward_region_sizes() {
        let cases = [
            (0.1, Vec3::new(0.7, 0.7, 0.7)),
            (0.3, Vec3::new(2.1, 0.9, 0.3)),
            (100.0, Vec3::new(-9.0e5, 3.0e5, 0.0)),
        ];
        for (region_size, origin) in cases {
            let bounds = AABB::new(origin, origin + Vec3::new(region_size, region_size, region_size));
            let all = full_tree(Octant::root(bounds, 4), 4);
            let ids: std::collections::HashSet<_> = all.iter().map(Octant::id).collect();
            assert_eq!(ids.len(), 4681, "region size {region_size}");
        }
    }

    #[test]
    fn test_child_lattice_stops_at_max_depth() {
        let octant = root();
        assert_eq!(octant.child_lattice(7, 4), Some([24, 24, 24]));
        assert_eq!(octant.child_lattice(0, 4), Some([8, 8, 8]));
        let leaf = Octant::new(None, 4, octant.child_bounds(0), [1, 1, 1]);
        assert_eq!(leaf.child_lattice(0, 4), None);
    }

    #[test]
    fn test_leaf_entity_bookkeeping() {
        let mut handles: SlotMap<ObjectHandle, ()> = SlotMap::with_key();
        let a = handles.insert(());
        let b = handles.insert(());
        let c = handles.insert(());

        let mut octant = root();
        assert!(octant.emplace_entity(a));
        assert!(octant.emplace_entity(b));
        assert!(octant.emplace_entity(c));
        assert!(!octant.emplace_entity(b));
        assert_eq!(octant.entity_count(), 3);

        assert!(octant.remove_entity(a));
        assert!(!octant.remove_entity(a));
        assert_eq!(octant.entities(), &[b, c]);
    }
}
