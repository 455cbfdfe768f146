//! Spatial index: the registry of region trees
//!
//! Owns one [`RegionTree`] per region that ever received an object, the
//! placement table recording which octant owns each object, and the queue of
//! pending structural events. [`SpatialIndex::update`] must run to completion
//! before a frame's batching walk starts.

use std::collections::{HashMap, VecDeque};

use slotmap::SecondaryMap;

use crate::core::config::{ConfigError, SpatialConfig};
use crate::foundation::math::Vec3;
use crate::scene::{ObjectHandle, RenderableSource, SceneEvent};
use super::bounds::AABB;
use super::error::{SpatialError, SpatialResult};
use super::octant::{OctantTag, Placement, Placements};
use super::region::RegionAddress;
use super::region_tree::{MoveOutcome, RegionTree};

/// Counters from one [`SpatialIndex::update`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexUpdateStats {
    /// Objects newly indexed
    pub inserted: usize,
    /// Objects dropped from the index
    pub removed: usize,
    /// Objects moved to another octant of the same region
    pub moved: usize,
    /// Objects moved to another region
    pub cross_region: usize,
    /// Objects whose bounds changed without changing octant
    pub unchanged: usize,
}

/// Registry of region octrees keyed by region address
pub struct SpatialIndex {
    config: SpatialConfig,
    regions: HashMap<RegionAddress, RegionTree>,
    /// Regions in creation order, so walks are deterministic
    region_order: Vec<RegionAddress>,
    placements: Placements,
    pending: VecDeque<SceneEvent>,
    changed_scratch: Vec<(ObjectHandle, Option<AABB>)>,
    /// Objects placed by this update's events; the sweep skips them
    placed_scratch: SecondaryMap<ObjectHandle, ()>,
}

impl SpatialIndex {
    /// Create an empty index from a validated configuration
    pub fn new(config: SpatialConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            regions: HashMap::new(),
            region_order: Vec::new(),
            placements: Placements::new(),
            pending: VecDeque::new(),
            changed_scratch: Vec::new(),
            placed_scratch: SecondaryMap::new(),
        })
    }
    
    /// Configuration the index was built with
    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }
    
    /// Address of the region containing `point`
    pub fn region_of(&self, point: Vec3) -> RegionAddress {
        RegionAddress::containing(point, self.config.region_size)
    }
    
    /// Index an object under its bounds' center
    ///
    /// Inserting an object that is already tracked moves it instead.
    pub fn insert(&mut self, object: ObjectHandle, bounds: AABB) -> SpatialResult<OctantTag> {
        if self.placements.contains_key(object) {
            self.move_object(object, bounds)?;
            return self.tag(object).ok_or(SpatialError::UntrackedObject(object));
        }
        
        let address = self.region_of(bounds.center());
        let tree = Self::tree_or_create(&mut self.regions, &mut self.region_order, &self.config, address);
        let root = tree.root_id();
        let octant_id = tree.emplace(object, bounds, root, &mut self.placements)?;
        
        Ok(OctantTag { region: address, octant_id })
    }
    
    /// Drop an object from the index
    pub fn remove(&mut self, object: ObjectHandle) -> SpatialResult<()> {
        let tag = self.tracked_tag(object)?;
        let tree = self
            .regions
            .get_mut(&tag.region)
            .ok_or(SpatialError::MissingRegion(tag.region))?;
        
        tree.remove(object, tag.octant_id, &mut self.placements)?;
        self.placements.remove(object);
        Ok(())
    }
    
    /// Re-place an object whose bounds changed
    pub fn move_object(&mut self, object: ObjectHandle, new_bounds: AABB) -> SpatialResult<MoveOutcome> {
        let tag = self.tracked_tag(object)?;
        let target = self.region_of(new_bounds.center());
        
        if target != tag.region {
            let old_tree = self
                .regions
                .get_mut(&tag.region)
                .ok_or(SpatialError::MissingRegion(tag.region))?;
            old_tree.remove(object, tag.octant_id, &mut self.placements)?;
            
            let new_tree = Self::tree_or_create(&mut self.regions, &mut self.region_order, &self.config, target);
            let root = new_tree.root_id();
            new_tree.emplace(object, new_bounds, root, &mut self.placements)?;
            
            log::trace!("Object {:?} moved from region {:?} to {:?}", object, tag.region, target);
            return Ok(MoveOutcome::CrossRegion);
        }
        
        let tree = self
            .regions
            .get_mut(&tag.region)
            .ok_or(SpatialError::MissingRegion(tag.region))?;
        let outcome = tree.move_within(object, new_bounds, tag.octant_id, &mut self.placements)?;
        
        if outcome != MoveOutcome::Unchanged {
            log::trace!("Object {:?} moved within region {:?}: {:?}", object, tag.region, outcome);
        }
        Ok(outcome)
    }
    
    /// Queue the "object gained renderable bounds" notification
    pub fn notify_bounds_gained(&mut self, object: ObjectHandle) {
        self.pending.push_back(SceneEvent::BoundsGained(object));
    }
    
    /// Queue the "object lost renderable bounds" notification
    pub fn notify_bounds_lost(&mut self, object: ObjectHandle) {
        self.pending.push_back(SceneEvent::BoundsLost(object));
    }
    
    /// Queue a scene event
    pub fn notify(&mut self, event: SceneEvent) {
        self.pending.push_back(event);
    }
    
    /// Number of queued structural events
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
    
    /// Apply queued structural events, then re-place every tracked object
    /// whose bounds changed this frame
    pub fn update<S: RenderableSource + ?Sized>(&mut self, scene: &S) -> SpatialResult<IndexUpdateStats> {
        let mut stats = IndexUpdateStats::default();
        self.placed_scratch.clear();
        
        while let Some(event) = self.pending.pop_front() {
            match event {
                SceneEvent::BoundsGained(object) => match scene.world_bounds(object) {
                    Some(bounds) => {
                        self.insert(object, bounds)?;
                        self.placed_scratch.insert(object, ());
                        stats.inserted += 1;
                    }
                    None => log::debug!("Object {:?} gained bounds but has none now, ignoring", object),
                },
                SceneEvent::BoundsLost(object) => {
                    if self.placements.contains_key(object) {
                        self.remove(object)?;
                        stats.removed += 1;
                    }
                }
            }
        }
        
        let mut changed = std::mem::take(&mut self.changed_scratch);
        changed.clear();
        changed.extend(
            self.placements
                .keys()
                .filter(|&object| {
                    !self.placed_scratch.contains_key(object) && scene.bounds_changed_this_frame(object)
                })
                .map(|object| (object, scene.world_bounds(object))),
        );
        
        for (object, bounds) in changed.drain(..) {
            let Some(bounds) = bounds else {
                self.remove(object)?;
                stats.removed += 1;
                continue;
            };
            
            match self.move_object(object, bounds)? {
                MoveOutcome::Unchanged => stats.unchanged += 1,
                MoveOutcome::CrossRegion => stats.cross_region += 1,
                MoveOutcome::WithinParent | MoveOutcome::Reinserted => stats.moved += 1,
            }
        }
        self.changed_scratch = changed;
        
        Ok(stats)
    }
    
    /// Current owner of an object
    pub fn tag(&self, object: ObjectHandle) -> Option<OctantTag> {
        self.placements.get(object).map(|placement| placement.tag)
    }
    
    /// Current placement record of an object
    pub fn placement(&self, object: ObjectHandle) -> Option<&Placement> {
        self.placements.get(object)
    }
    
    /// Check if an object is indexed
    pub fn contains(&self, object: ObjectHandle) -> bool {
        self.placements.contains_key(object)
    }
    
    /// Number of indexed objects
    pub fn object_count(&self) -> usize {
        self.placements.len()
    }
    
    /// Number of region trees created so far
    pub fn region_count(&self) -> usize {
        self.region_order.len()
    }
    
    /// Look up the tree of one region
    pub fn region(&self, address: RegionAddress) -> Option<&RegionTree> {
        self.regions.get(&address)
    }
    
    /// Region trees in creation order
    pub fn regions(&self) -> impl Iterator<Item = &RegionTree> {
        self.region_order.iter().filter_map(|address| self.regions.get(address))
    }
    
    fn tracked_tag(&self, object: ObjectHandle) -> SpatialResult<OctantTag> {
        self.tag(object).ok_or(SpatialError::UntrackedObject(object))
    }
    
    fn tree_or_create<'a>(
        regions: &'a mut HashMap<RegionAddress, RegionTree>,
        region_order: &mut Vec<RegionAddress>,
        config: &SpatialConfig,
        address: RegionAddress,
    ) -> &'a mut RegionTree {
        regions.entry(address).or_insert_with(|| {
            log::debug!("Created region tree {:?}", address);
            region_order.push(address);
            RegionTree::new(address, config)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use crate::scene::SceneObjects;
    use slotmap::SlotMap;

    fn small_box(center: Vec3) -> AABB {
        AABB::from_center_extents(center, Vec3::new(0.5, 0.5, 0.5))
    }

    fn index() -> SpatialIndex {
        SpatialIndex::new(SpatialConfig::default()).unwrap()
    }

    #[test]
    fn test_insert_creates_regions_lazily() {
        let mut handles: SlotMap<ObjectHandle, ()> = SlotMap::with_key();
        let mut index = index();

        let a = handles.insert(());
        let b = handles.insert(());
        let c = handles.insert(());
        let tag_a = index.insert(a, small_box(Vec3::new(10.0, 10.0, 10.0))).unwrap();
        let tag_b = index.insert(b, small_box(Vec3::new(-10.0, 10.0, 300.0))).unwrap();
        index.insert(c, small_box(Vec3::new(20.0, 20.0, 20.0))).unwrap();

        assert_eq!(tag_a.region, RegionAddress::new(0, 0, 0));
        assert_eq!(tag_b.region, RegionAddress::new(-1, 0, 2));
        assert_eq!(index.region_count(), 2);
        assert_eq!(index.object_count(), 3);

        let order: Vec<_> = index.regions().map(RegionTree::address).collect();
        assert_eq!(order, vec![RegionAddress::new(0, 0, 0), RegionAddress::new(-1, 0, 2)]);
    }

    #[test]
    fn test_cross_region_move_retags() {
        let mut handles: SlotMap<ObjectHandle, ()> = SlotMap::with_key();
        let mut index = index();
        let object = handles.insert(());
        index.insert(object, small_box(Vec3::new(10.0, 10.0, 10.0))).unwrap();

        let outcome = index.move_object(object, small_box(Vec3::new(140.0, 10.0, 10.0))).unwrap();

        assert_eq!(outcome, MoveOutcome::CrossRegion);
        let tag = index.tag(object).unwrap();
        assert_eq!(tag.region, RegionAddress::new(1, 0, 0));
        assert!(index.region(RegionAddress::new(0, 0, 0)).unwrap().is_empty());
        let tree = index.region(tag.region).unwrap();
        assert!(tree.octant(tag.octant_id).unwrap().entities().contains(&object));
    }

    #[test]
    fn test_move_to_same_bounds_is_idempotent() {
        let mut handles: SlotMap<ObjectHandle, ()> = SlotMap::with_key();
        let mut index = index();
        let object = handles.insert(());
        let bounds = small_box(Vec3::new(60.0, 60.0, 60.0));
        let tag = index.insert(object, bounds).unwrap();

        assert_eq!(index.move_object(object, bounds).unwrap(), MoveOutcome::Unchanged);
        assert_eq!(index.tag(object), Some(tag));
    }

    #[test]
    fn test_untracked_object_errors() {
        let mut handles: SlotMap<ObjectHandle, ()> = SlotMap::with_key();
        let mut index = index();
        let object = handles.insert(());

        assert!(matches!(index.remove(object), Err(SpatialError::UntrackedObject(_))));
        assert!(matches!(
            index.move_object(object, small_box(Vec3::zeros())),
            Err(SpatialError::UntrackedObject(_))
        ));
    }

    #[test]
    fn test_reinsert_of_tracked_object_moves_it() {
        let mut handles: SlotMap<ObjectHandle, ()> = SlotMap::with_key();
        let mut index = index();
        let object = handles.insert(());
        index.insert(object, small_box(Vec3::new(1.0, 1.0, 1.0))).unwrap();
        let tag = index.insert(object, small_box(Vec3::new(1.0, 1.0, -1.0))).unwrap();

        assert_eq!(index.object_count(), 1);
        assert_eq!(tag.region, RegionAddress::new(0, 0, -1));
        assert_eq!(index.region(RegionAddress::new(0, 0, 0)).unwrap().entity_count(), 0);
    }

    #[test]
    fn test_update_consumes_events_and_moves() {
        let mut scene = SceneObjects::new();
        let mut index = index();

        let still = scene.spawn(None, None, &Transform::from_position(Vec3::new(5.0, 5.0, 5.0)), 0.5);
        let mover = scene.spawn(None, None, &Transform::from_position(Vec3::new(6.0, 5.0, 5.0)), 0.5);
        let doomed = scene.spawn(None, None, &Transform::from_position(Vec3::new(7.0, 5.0, 5.0)), 0.5);

        let mut events = Vec::new();
        scene.drain_events_into(&mut events);
        events.into_iter().for_each(|event| index.notify(event));
        let stats = index.update(&scene).unwrap();
        assert_eq!(stats.inserted, 3);
        assert_eq!(stats.unchanged, 0);
        assert_eq!(index.object_count(), 3);

        scene.begin_frame();
        scene.set_transform(mover, &Transform::from_position(Vec3::new(-6.0, 5.0, 5.0)), 0.5);
        scene.destroy(doomed);

        let mut events = Vec::new();
        scene.drain_events_into(&mut events);
        events.into_iter().for_each(|event| index.notify(event));
        let stats = index.update(&scene).unwrap();

        assert_eq!(stats.removed, 1);
        assert_eq!(stats.cross_region, 1);
        assert!(index.contains(still));
        assert!(!index.contains(doomed));
        assert_eq!(index.tag(mover).unwrap().region, RegionAddress::new(-1, 0, 0));
        assert_eq!(index.pending_count(), 0);
    }

    #[test]
    fn test_out_of_range_depth_is_rejected_up_front() {
        let config = SpatialConfig::default().with_max_octant_depth(40);
        assert!(matches!(SpatialIndex::new(config), Err(ConfigError::Invalid(_))));
    }
}
