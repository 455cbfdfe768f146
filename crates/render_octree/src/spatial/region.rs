//! Region addressing
//!
//! World space is cut into fixed-size cubic regions; each region that ever
//! receives an object gets its own octree.

use crate::foundation::math::Vec3;
use super::bounds::AABB;

/// Integer address of one cubic region: `floor(position / region_size)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionAddress {
    /// Region index along X
    pub x: i32,
    /// Region index along Y
    pub y: i32,
    /// Region index along Z
    pub z: i32,
}

impl RegionAddress {
    /// Create a region address
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
    
    /// Address of the region containing `position`
    #[allow(clippy::cast_possible_truncation)]
    pub fn containing(position: Vec3, region_size: f32) -> Self {
        Self {
            x: (position.x / region_size).floor() as i32,
            y: (position.y / region_size).floor() as i32,
            z: (position.z / region_size).floor() as i32,
        }
    }
    
    /// World-space minimum corner of the region
    #[allow(clippy::cast_precision_loss)]
    pub fn origin(&self, region_size: f32) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32) * region_size
    }
    
    /// World-space bounds of the region
    pub fn bounds(&self, region_size: f32) -> AABB {
        let origin = self.origin(region_size);
        AABB::new(origin, origin + Vec3::new(region_size, region_size, region_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containing_floors_negative_coordinates() {
        assert_eq!(RegionAddress::containing(Vec3::new(0.0, 127.9, 128.0), 128.0), RegionAddress::new(0, 0, 1));
        assert_eq!(RegionAddress::containing(Vec3::new(-0.5, -128.0, -128.5), 128.0), RegionAddress::new(-1, -1, -2));
    }

    #[test]
    fn test_bounds_contain_member_points() {
        let point = Vec3::new(-10.0, 300.0, 5.0);
        let address = RegionAddress::containing(point, 128.0);
        assert!(address.bounds(128.0).contains_point(point));
    }
}
