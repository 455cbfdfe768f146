//! Region octree
//!
//! One adaptive octree per region. Leaves split when they would exceed the
//! entity limit and merge back once the eight siblings together drop to the
//! limit. All structural edits go through the id lookup table, which holds
//! exactly the reachable octants.

use std::collections::{HashMap, VecDeque};

use crate::core::config::SpatialConfig;
use crate::foundation::math::Vec3;
use crate::scene::ObjectHandle;
use super::bounds::AABB;
use super::error::{SpatialError, SpatialResult};
use super::octant::{Octant, OctantId, OctantPayload, OctantTag, Placement, Placements};
use super::region::RegionAddress;

/// How a move was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The object still maps to the same octant; only its bounds were updated
    Unchanged,
    /// Old and new octant share a parent; moved without split/merge checks
    WithinParent,
    /// Removed and re-emplaced from the root of the same region
    Reinserted,
    /// Removed from one region tree and emplaced in another
    CrossRegion,
}

/// Octree covering one region of world space
#[derive(Debug, Clone)]
pub struct RegionTree {
    world_bounds: AABB,
    address: RegionAddress,
    root_id: OctantId,
    octants: HashMap<OctantId, Octant>,
    entity_limit: usize,
    max_depth: u32,
}

impl RegionTree {
    /// Create a tree with a single empty root leaf
    ///
    /// `config` must have passed [`SpatialConfig::validate`].
    pub(crate) fn new(address: RegionAddress, config: &SpatialConfig) -> Self {
        let world_bounds = address.bounds(config.region_size);
        let root = Octant::root(world_bounds, config.max_octant_depth);
        let root_id = root.id();
        
        let mut octants = HashMap::new();
        octants.insert(root_id, root);
        
        Self {
            world_bounds,
            address,
            root_id,
            octants,
            entity_limit: config.octant_entity_limit,
            max_depth: config.max_octant_depth,
        }
    }
    
    /// Address of the region this tree covers
    pub fn address(&self) -> RegionAddress {
        self.address
    }
    
    /// World-space bounds of the region
    pub fn world_bounds(&self) -> &AABB {
        &self.world_bounds
    }
    
    /// Id of the root octant
    pub fn root_id(&self) -> OctantId {
        self.root_id
    }
    
    /// Look up an octant by id
    pub fn octant(&self, id: OctantId) -> Option<&Octant> {
        self.octants.get(&id)
    }
    
    /// All live octants, in no particular order
    pub fn octants(&self) -> impl Iterator<Item = &Octant> {
        self.octants.values()
    }
    
    /// Number of live octants
    pub fn octant_count(&self) -> usize {
        self.octants.len()
    }
    
    /// Total number of objects owned by the tree's leaves
    pub fn entity_count(&self) -> usize {
        self.octants.values().map(Octant::entity_count).sum()
    }
    
    /// Check if no leaf owns an object
    pub fn is_empty(&self) -> bool {
        self.octants.values().all(|octant| octant.entity_count() == 0)
    }
    
    /// Count octants reachable from the root by following child links
    pub fn reachable_octant_count(&self) -> usize {
        let mut queue = VecDeque::from([self.root_id]);
        let mut count = 0;
        
        while let Some(id) = queue.pop_front() {
            let Some(octant) = self.octants.get(&id) else { continue };
            count += 1;
            if let Some(children) = octant.children() {
                queue.extend(children.iter().copied());
            }
        }
        
        count
    }
    
    /// Descend from `start` to the leaf whose bounds contain `point`
    pub fn find_leaf(&self, point: Vec3, start: OctantId) -> SpatialResult<OctantId> {
        let mut current = self.octant_or_err(start)?;
        while let Some(children) = current.children() {
            let child = children[current.child_index_for(point)];
            current = self.octant_or_err(child)?;
        }
        Ok(current.id())
    }
    
    /// Place an object in the leaf its center maps to, descending from `start`
    ///
    /// A leaf that would exceed the entity limit is split first (unless it is
    /// already at the maximum depth) and the descent repeats from it.
    pub(crate) fn emplace(
        &mut self,
        object: ObjectHandle,
        bounds: AABB,
        start: OctantId,
        placements: &mut Placements,
    ) -> SpatialResult<OctantId> {
        let center = bounds.center();
        let mut descend_from = start;
        
        loop {
            let leaf_id = self.find_leaf(center, descend_from)?;
            let leaf = self.octant_or_err(leaf_id)?;
            
            let overflows = !leaf.entities().contains(&object)
                && leaf.entity_count() + 1 > self.entity_limit
                && leaf.depth() < self.max_depth;
            
            if overflows {
                self.split(leaf_id, placements)?;
                descend_from = leaf_id;
                continue;
            }
            
            self.octant_mut_or_err(leaf_id)?.emplace_entity(object);
            placements.insert(object, Placement {
                tag: OctantTag { region: self.address, octant_id: leaf_id },
                bounds,
            });
            return Ok(leaf_id);
        }
    }
    
    /// Remove an object from the leaf its tag names, merging siblings if they fit
    pub(crate) fn remove(
        &mut self,
        object: ObjectHandle,
        octant_id: OctantId,
        placements: &mut Placements,
    ) -> SpatialResult<()> {
        let region = self.address;
        let octant = self.octant_mut_or_err(octant_id)?;
        
        if !octant.remove_entity(object) {
            log::error!("Object {:?} missing from octant {} in region {:?}", object, octant_id, region);
            return Err(SpatialError::NotInOctant { object, region, octant_id });
        }
        
        let parent = octant.parent();
        if let Some(parent) = parent {
            self.collapse_from(parent, placements)?;
        }
        
        Ok(())
    }
    
    /// Move an object to new bounds inside this region
    pub(crate) fn move_within(
        &mut self,
        object: ObjectHandle,
        bounds: AABB,
        octant_id: OctantId,
        placements: &mut Placements,
    ) -> SpatialResult<MoveOutcome> {
        let old_parent = self.octant_or_err(octant_id)?.parent();
        let target = self.find_leaf(bounds.center(), self.root_id)?;
        
        if target == octant_id {
            if let Some(placement) = placements.get_mut(object) {
                placement.bounds = bounds;
            }
            return Ok(MoveOutcome::Unchanged);
        }
        
        let target_parent = self.octant_or_err(target)?.parent();
        if old_parent.is_some() && old_parent == target_parent {
            let region = self.address;
            if !self.octant_mut_or_err(octant_id)?.remove_entity(object) {
                log::error!("Object {:?} missing from octant {} in region {:?}", object, octant_id, region);
                return Err(SpatialError::NotInOctant { object, region, octant_id });
            }
            self.octant_mut_or_err(target)?.emplace_entity(object);
            placements.insert(object, Placement {
                tag: OctantTag { region, octant_id: target },
                bounds,
            });
            return Ok(MoveOutcome::WithinParent);
        }
        
        self.remove(object, octant_id, placements)?;
        self.emplace(object, bounds, self.root_id, placements)?;
        Ok(MoveOutcome::Reinserted)
    }
    
    /// Subdivide a leaf into eight children and redistribute its objects
    fn split(&mut self, octant_id: OctantId, placements: &mut Placements) -> SpatialResult<()> {
        let octant = self.octant_or_err(octant_id)?;
        if !octant.is_leaf() {
            return Ok(());
        }
        
        let depth = octant.depth() + 1;
        let mut children = Vec::with_capacity(8);
        for index in 0..8 {
            let Some(lattice) = octant.child_lattice(index, self.max_depth) else {
                return Ok(());
            };
            children.push(Octant::new(Some(octant_id), depth, octant.child_bounds(index), lattice));
        }
        
        let mut child_ids = [0; 8];
        for (slot, child) in child_ids.iter_mut().zip(children) {
            let child_id = child.id();
            if self.octants.contains_key(&child_id) {
                log::error!("Split of octant {} in region {:?} collides on id {}", octant_id, self.address, child_id);
                return Err(SpatialError::DuplicateOctant { region: self.address, octant_id: child_id });
            }
            *slot = child_id;
            self.octants.insert(child_id, child);
        }
        
        let evicted = match self
            .octant_mut_or_err(octant_id)?
            .replace_payload(OctantPayload::Internal { children: child_ids })
        {
            OctantPayload::Leaf { entities } => entities,
            OctantPayload::Internal { .. } => Vec::new(),
        };
        
        log::debug!(
            "Split octant {} in region {:?}: {} objects into depth {}",
            octant_id, self.address, evicted.len(), depth
        );
        
        for object in evicted {
            let bounds = placements
                .get(object)
                .map(|placement| placement.bounds)
                .ok_or(SpatialError::UntrackedObject(object))?;
            self.emplace(object, bounds, octant_id, placements)?;
        }
        
        Ok(())
    }
    
    /// Merge upwards from `start` while each candidate's children fit in one leaf
    fn collapse_from(&mut self, start: OctantId, placements: &mut Placements) -> SpatialResult<()> {
        let mut candidate = Some(start);
        
        while let Some(id) = candidate {
            if !self.can_merge(id)? {
                break;
            }
            self.merge(id, placements)?;
            candidate = self.octant_or_err(id)?.parent();
        }
        
        Ok(())
    }
    
    fn can_merge(&self, id: OctantId) -> SpatialResult<bool> {
        let Some(children) = self.octant_or_err(id)?.children() else {
            return Ok(false);
        };
        
        let mut total = 0;
        for &child_id in children {
            let child = self.octant_or_err(child_id)?;
            if !child.is_leaf() {
                return Ok(false);
            }
            total += child.entity_count();
            if total > self.entity_limit {
                return Ok(false);
            }
        }
        
        Ok(true)
    }
    
    /// Fold all children of an internal octant back into it
    fn merge(&mut self, id: OctantId, placements: &mut Placements) -> SpatialResult<()> {
        let Some(children) = self.octant_or_err(id)?.children().copied() else {
            return Ok(());
        };
        
        let mut merged = Vec::new();
        for child_id in children {
            let region = self.address;
            let child = self
                .octants
                .remove(&child_id)
                .ok_or_else(|| missing_octant(region, child_id))?;
            merged.extend_from_slice(child.entities());
        }
        
        for &object in &merged {
            if let Some(placement) = placements.get_mut(object) {
                placement.tag.octant_id = id;
            }
        }
        
        log::debug!("Merged children of octant {} in region {:?}: {} objects", id, self.address, merged.len());
        
        self.octant_mut_or_err(id)?.replace_payload(OctantPayload::Leaf { entities: merged });
        Ok(())
    }
    
    fn octant_or_err(&self, id: OctantId) -> SpatialResult<&Octant> {
        let region = self.address;
        self.octants.get(&id).ok_or_else(|| missing_octant(region, id))
    }
    
    fn octant_mut_or_err(&mut self, id: OctantId) -> SpatialResult<&mut Octant> {
        let region = self.address;
        self.octants.get_mut(&id).ok_or_else(|| missing_octant(region, id))
    }
}

fn missing_octant(region: RegionAddress, octant_id: OctantId) -> SpatialError {
    log::error!("Octant {} is not registered in region {:?}", octant_id, region);
    SpatialError::MissingOctant { region, octant_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::collections::HashSet;

    struct Harness {
        tree: RegionTree,
        handles: SlotMap<ObjectHandle, ()>,
        placements: Placements,
    }

    impl Harness {
        fn new(config: &SpatialConfig) -> Self {
            Self::at(RegionAddress::new(0, 0, 0), config)
        }

        fn at(address: RegionAddress, config: &SpatialConfig) -> Self {
            Self {
                tree: RegionTree::new(address, config),
                handles: SlotMap::with_key(),
                placements: Placements::new(),
            }
        }

        fn insert_at(&mut self, position: Vec3) -> ObjectHandle {
            let object = self.handles.insert(());
            let bounds = AABB::from_center_extents(position, Vec3::new(0.5, 0.5, 0.5));
            let root = self.tree.root_id();
            self.tree.emplace(object, bounds, root, &mut self.placements).unwrap();
            object
        }

        fn remove(&mut self, object: ObjectHandle) {
            let tag = self.placements[object].tag;
            self.tree.remove(object, tag.octant_id, &mut self.placements).unwrap();
            self.placements.remove(object);
        }

        fn all_leaf_entities(&self) -> Vec<ObjectHandle> {
            self.tree.octants().flat_map(|o| o.entities().iter().copied()).collect()
        }
    }

    /// Check ids, parent links and reachability of every registered octant
    fn assert_tree_consistent(tree: &RegionTree) {
        assert_eq!(tree.reachable_octant_count(), tree.octant_count());
        let ids: HashSet<_> = tree.octants().map(Octant::id).collect();
        assert_eq!(ids.len(), tree.octant_count());
        for octant in tree.octants() {
            assert_eq!(tree.octant(octant.id()).unwrap().lattice(), octant.lattice());
            if let Some(children) = octant.children() {
                for &child in children {
                    assert_eq!(tree.octant(child).unwrap().parent(), Some(octant.id()));
                }
            }
        }
    }

    /// Deterministic scatter of `count` points inside `bounds`
    fn scatter(bounds: &AABB, count: usize) -> Vec<Vec3> {
        let size = bounds.size();
        (0..count)
            .map(|i| {
                let t = i as f32;
                let fraction = |k: f32| (t * k).fract() * 0.98 + 0.01;
                bounds.min + Vec3::new(size.x * fraction(0.618_034), size.y * fraction(0.414_214), size.z * fraction(0.732_051))
            })
            .collect()
    }

    /// Positions cycling through the eight root children
    fn spread_position(i: usize) -> Vec3 {
        let child = i % 8;
        let jitter = (i / 8) as f32 * 0.25;
        Vec3::new(
            if child & 1 != 0 { 96.0 } else { 32.0 } + jitter,
            if child & 2 != 0 { 96.0 } else { 32.0 } + jitter,
            if child & 4 != 0 { 96.0 } else { 32.0 } + jitter,
        )
    }

    #[test]
    fn test_split_then_merge_round_trip() {
        let config = SpatialConfig::default();
        let limit = config.octant_entity_limit;
        let mut harness = Harness::new(&config);

        let objects: Vec<_> = (0..limit).map(|i| harness.insert_at(spread_position(i))).collect();
        assert_eq!(harness.tree.octant_count(), 1);

        let overflow = harness.insert_at(spread_position(limit));
        assert_eq!(harness.tree.octant_count(), 9, "exactly one split");

        let leaves = harness.all_leaf_entities();
        let unique: HashSet<_> = leaves.iter().copied().collect();
        assert_eq!(leaves.len(), limit + 1);
        assert_eq!(unique.len(), limit + 1);
        let root = harness.tree.octant(harness.tree.root_id()).unwrap();
        assert!(!root.is_leaf());
        assert!(root.entities().is_empty());

        harness.remove(objects[3]);
        assert_eq!(harness.tree.octant_count(), 1, "exactly one merge");

        let root_id = harness.tree.root_id();
        let root = harness.tree.octant(root_id).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.entity_count(), limit);
        assert!(root.entities().contains(&overflow));
        assert!(!root.entities().contains(&objects[3]));
        for &object in root.entities() {
            assert_eq!(harness.placements[object].tag.octant_id, root_id);
        }
    }

    #[test]
    fn test_placement_contains_object_center() {
        let config = SpatialConfig::default().with_octant_entity_limit(4);
        let mut harness = Harness::new(&config);

        for i in 0..200 {
            let t = i as f32;
            harness.insert_at(Vec3::new((t * 7.3) % 128.0, (t * 3.1) % 128.0, (t * 11.7) % 128.0));
        }

        assert_eq!(harness.tree.reachable_octant_count(), harness.tree.octant_count());
        for (object, placement) in &harness.placements {
            let octant = harness.tree.octant(placement.tag.octant_id).unwrap();
            assert!(octant.is_leaf());
            assert!(octant.entities().contains(&object));
            assert!(octant.bounds().contains_point(placement.bounds.center()));
        }
    }

    #[test]
    fn test_depth_limit_makes_leaf_limit_soft() {
        let config = SpatialConfig::default()
            .with_octant_entity_limit(2)
            .with_max_octant_depth(1);
        let mut harness = Harness::new(&config);

        for _ in 0..10 {
            harness.insert_at(Vec3::new(10.0, 10.0, 10.0));
        }

        assert_eq!(harness.tree.octant_count(), 9);
        let deepest = harness.tree.octants().map(Octant::entity_count).max().unwrap();
        assert_eq!(deepest, 10);
    }

    #[test]
    fn test_merge_cascades_to_root() {
        let config = SpatialConfig::default().with_octant_entity_limit(2);
        let mut harness = Harness::new(&config);

        let a = harness.insert_at(Vec3::new(1.0, 1.0, 1.0));
        harness.insert_at(Vec3::new(2.0, 2.0, 2.0));
        harness.insert_at(Vec3::new(3.0, 3.0, 3.0));

        let placement = harness.placements[a];
        let deepest = harness.tree.octant(placement.tag.octant_id).unwrap();
        assert_eq!(deepest.depth(), config.max_octant_depth);
        assert_eq!(deepest.entity_count(), 3);
        assert_eq!(harness.tree.octant_count(), 1 + 8 * 4);

        harness.remove(a);
        assert_eq!(harness.tree.octant_count(), 1);
        assert_eq!(harness.tree.entity_count(), 2);
    }

    #[test]
    fn test_move_with_same_bounds_is_noop() {
        let config = SpatialConfig::default();
        let mut harness = Harness::new(&config);
        let object = harness.insert_at(Vec3::new(40.0, 40.0, 40.0));
        let before = harness.placements[object];

        let outcome = harness
            .tree
            .move_within(object, before.bounds, before.tag.octant_id, &mut harness.placements)
            .unwrap();

        assert_eq!(outcome, MoveOutcome::Unchanged);
        assert_eq!(harness.placements[object], before);
        assert_eq!(harness.tree.octant(before.tag.octant_id).unwrap().entities(), &[object]);
    }

    #[test]
    fn test_move_between_siblings_skips_restructuring() {
        let config = SpatialConfig::default().with_octant_entity_limit(4);
        let mut harness = Harness::new(&config);
        let objects: Vec<_> = (0..5).map(|i| harness.insert_at(spread_position(i))).collect();
        assert_eq!(harness.tree.octant_count(), 9);

        let mover = objects[0];
        let from = harness.placements[mover].tag.octant_id;
        let target = AABB::from_center_extents(Vec3::new(100.0, 100.0, 100.0), Vec3::new(0.5, 0.5, 0.5));

        let outcome = harness.tree.move_within(mover, target, from, &mut harness.placements).unwrap();

        assert_eq!(outcome, MoveOutcome::WithinParent);
        let to = harness.placements[mover].tag.octant_id;
        assert_ne!(to, from);
        assert!(harness.tree.octant(to).unwrap().entities().contains(&mover));
        assert!(!harness.tree.octant(from).unwrap().entities().contains(&mover));
        assert_eq!(harness.tree.octant_count(), 9);
    }

    #[test]
    fn test_stale_tag_is_reported() {
        let config = SpatialConfig::default();
        let mut harness = Harness::new(&config);
        let object = harness.insert_at(Vec3::new(5.0, 5.0, 5.0));

        let missing = harness.tree.remove(object, -1, &mut harness.placements);
        assert!(matches!(missing, Err(SpatialError::MissingOctant { octant_id: -1, .. })));

        let root = harness.tree.root_id();
        harness.tree.remove(object, root, &mut harness.placements).unwrap();
        let absent = harness.tree.remove(object, root, &mut harness.placements);
        assert!(matches!(absent, Err(SpatialError::NotInOctant { .. })));
    }

    #[test]
    fn test_tiny_region_far_from_origin_stays_consistent() {
        let config = SpatialConfig::default()
            .with_region_size(0.1)
            .with_octant_entity_limit(1);
        let mut harness = Harness::at(RegionAddress::new(7, 7, 7), &config);
        let bounds = *harness.tree.world_bounds();

        for position in scatter(&bounds, 200) {
            let object = harness.handles.insert(());
            let small = AABB::from_center_extents(position, Vec3::new(0.001, 0.001, 0.001));
            let root = harness.tree.root_id();
            harness.tree.emplace(object, small, root, &mut harness.placements).unwrap();
        }

        assert!(harness.tree.octant_count() > 9);
        assert_tree_consistent(&harness.tree);
        assert_eq!(harness.all_leaf_entities().len(), 200);
    }

    #[test]
    fn test_non_power_of_two_region_stays_consistent() {
        let config = SpatialConfig::default()
            .with_region_size(100.0)
            .with_octant_entity_limit(3);
        let mut harness = Harness::at(RegionAddress::new(-9000, 3000, 12), &config);
        let bounds = *harness.tree.world_bounds();

        let objects: Vec<_> = scatter(&bounds, 300).into_iter().map(|p| harness.insert_at(p)).collect();
        assert_tree_consistent(&harness.tree);

        for &object in objects.iter().step_by(2) {
            harness.remove(object);
        }
        assert_tree_consistent(&harness.tree);
        assert_eq!(harness.tree.entity_count(), 150);
    }

    #[test]
    fn test_merge_refused_while_a_child_is_internal() {
        let config = SpatialConfig::default().with_octant_entity_limit(2);
        let mut harness = Harness::new(&config);
        let a = harness.insert_at(Vec3::new(1.0, 1.0, 1.0));
        let b = harness.insert_at(Vec3::new(2.0, 2.0, 2.0));
        harness.insert_at(Vec3::new(3.0, 3.0, 3.0));

        // Thin the deepest leaf without triggering the merge cascade
        let deepest_id = harness.placements[a].tag.octant_id;
        let deepest = harness.tree.octants.get_mut(&deepest_id).unwrap();
        assert!(deepest.remove_entity(a));
        assert!(deepest.remove_entity(b));

        let root_id = harness.tree.root_id();
        let deepest_parent = harness.tree.octant(deepest_id).unwrap().parent().unwrap();
        assert_eq!(harness.tree.entity_count(), 1);
        assert!(!harness.tree.can_merge(root_id).unwrap());
        assert!(harness.tree.can_merge(deepest_parent).unwrap());
    }
}
