//! Spatial index errors

use crate::scene::ObjectHandle;
use super::octant::OctantId;
use super::region::RegionAddress;

/// Result type for spatial index operations
pub type SpatialResult<T> = Result<T, SpatialError>;

/// Errors raised by the spatial index
///
/// Every variant except [`SpatialError::UntrackedObject`] means the tree
/// bookkeeping is inconsistent. Callers should treat those as fatal.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// An object tag points at an octant id missing from the lookup table
    #[error("Octant {octant_id} not found in region {region:?}")]
    MissingOctant {
        /// Region that was searched
        region: RegionAddress,
        /// Octant id that was expected
        octant_id: OctantId,
    },
    
    /// A split produced an octant id that is already registered
    #[error("Octant {octant_id} already registered in region {region:?}")]
    DuplicateOctant {
        /// Region being split
        region: RegionAddress,
        /// Colliding octant id
        octant_id: OctantId,
    },
    
    /// An object tag points at a region that was never created
    #[error("Region {0:?} not found")]
    MissingRegion(RegionAddress),
    
    /// An object tag points at an octant that does not list the object
    #[error("Object {object:?} not listed by octant {octant_id} in region {region:?}")]
    NotInOctant {
        /// Object that was expected
        object: ObjectHandle,
        /// Region that was searched
        region: RegionAddress,
        /// Octant id named by the tag
        octant_id: OctantId,
    },
    
    /// Remove or move requested for an object the index does not track
    #[error("Object {0:?} is not tracked by the spatial index")]
    UntrackedObject(ObjectHandle),
}
