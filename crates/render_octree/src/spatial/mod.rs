//! Spatial partitioning data structures
//!
//! World space is divided into fixed-size cubic regions, each holding an
//! adaptive octree of renderable objects. Insert, remove and move operate on
//! a single region tree and touch only the octants along one path.

mod bounds;
mod error;
mod octant;
mod region;
mod region_tree;
mod spatial_index;

pub use bounds::AABB;
pub use error::{SpatialError, SpatialResult};
pub use octant::{craft_id, Octant, OctantId, OctantPayload, OctantTag, Placement};
pub use region::RegionAddress;
pub use region_tree::{MoveOutcome, RegionTree};
pub use spatial_index::{IndexUpdateStats, SpatialIndex};
