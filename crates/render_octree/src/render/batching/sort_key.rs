//! Packed batching sort key

/// Packed composite ordering key for one renderable object
///
/// The primary word orders by shader, then mesh source, then material, then
/// submesh:
///
/// ```text
/// bit 63      48 47      32 31          15 14     5 4    0
///     | shader | mesh src |  material     | submesh | 0  |
///        16         16          17            10      5
/// ```
///
/// The locator word (`partition:32 | data_index:32`) breaks ties in walk
/// order and points back at the snapshot the key was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    primary: u64,
    locator: u64,
}

impl SortKey {
    const SHADER_SHIFT: u32 = 48;
    const MESH_SHIFT: u32 = 32;
    const MATERIAL_SHIFT: u32 = 15;
    const SUBMESH_SHIFT: u32 = 5;

    /// Largest shader id that fits the key
    pub const MAX_SHADER_ID: u32 = (1 << 16) - 1;
    /// Largest mesh source id that fits the key
    pub const MAX_MESH_ID: u32 = (1 << 16) - 1;
    /// Largest material id that fits the key
    pub const MAX_MATERIAL_ID: u32 = (1 << 17) - 1;
    /// Largest submesh index that fits the key
    pub const MAX_SUBMESH: u32 = (1 << 10) - 1;

    /// Pack a key, or `None` if any id is out of range for its field
    pub fn try_new(
        shader_id: u32,
        mesh_id: u32,
        material_id: u32,
        submesh: u32,
        partition: u32,
        data_index: u32,
    ) -> Option<Self> {
        if shader_id > Self::MAX_SHADER_ID
            || mesh_id > Self::MAX_MESH_ID
            || material_id > Self::MAX_MATERIAL_ID
            || submesh > Self::MAX_SUBMESH
        {
            return None;
        }

        let primary = (u64::from(shader_id) << Self::SHADER_SHIFT)
            | (u64::from(mesh_id) << Self::MESH_SHIFT)
            | (u64::from(material_id) << Self::MATERIAL_SHIFT)
            | (u64::from(submesh) << Self::SUBMESH_SHIFT);
        let locator = (u64::from(partition) << 32) | u64::from(data_index);

        Some(Self { primary, locator })
    }

    /// Dense shader id
    pub const fn shader_id(&self) -> u32 {
        (self.primary >> Self::SHADER_SHIFT) as u32
    }

    /// Dense mesh source id
    pub const fn mesh_id(&self) -> u32 {
        ((self.primary >> Self::MESH_SHIFT) & 0xFFFF) as u32
    }

    /// Dense material id
    pub const fn material_id(&self) -> u32 {
        ((self.primary >> Self::MATERIAL_SHIFT) & 0x1_FFFF) as u32
    }

    /// Submesh index within the mesh source
    pub const fn submesh(&self) -> u32 {
        ((self.primary >> Self::SUBMESH_SHIFT) & 0x3FF) as u32
    }

    /// Batcher that produced the key
    pub const fn partition(&self) -> u32 {
        (self.locator >> 32) as u32
    }

    /// Snapshot index within the producing batcher
    pub const fn data_index(&self) -> u32 {
        self.locator as u32
    }

    /// True when both keys draw the same mesh with the same material and shader
    pub const fn same_group(&self, other: &Self) -> bool {
        self.primary == other.primary
    }
}
