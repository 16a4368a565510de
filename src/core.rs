// src/core.rs
//
// Scalar types, face/axis helpers, chunk extents, 3D span views and the
// world-space region key. Everything downstream builds on these.

use bytemuck::{Pod, Zeroable};

/// Voxel identifier. Zero universally means "empty".
pub type VoxelId = u16;

/// Index into an external material table.
pub type MaterialIndex = u16;

pub const NULL_MATERIAL_INDEX: MaterialIndex = 0;
pub const INVALID_MATERIAL_INDEX: MaterialIndex = MaterialIndex::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One of the six axis-aligned outward directions of a voxel cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockFace {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

pub const BLOCK_FACE_COUNT: usize = 6;

impl BlockFace {
    pub const ALL: [BlockFace; BLOCK_FACE_COUNT] = [
        BlockFace::PosX,
        BlockFace::NegX,
        BlockFace::PosY,
        BlockFace::NegY,
        BlockFace::PosZ,
        BlockFace::NegZ,
    ];

    #[inline]
    pub const fn axis(self) -> Axis {
        match self {
            BlockFace::PosX | BlockFace::NegX => Axis::X,
            BlockFace::PosY | BlockFace::NegY => Axis::Y,
            BlockFace::PosZ | BlockFace::NegZ => Axis::Z,
        }
    }

    /// +1 for the positive faces, -1 for the negative ones.
    #[inline]
    pub const fn sign(self) -> i32 {
        match self {
            BlockFace::PosX | BlockFace::PosY | BlockFace::PosZ => 1,
            _ => -1,
        }
    }

    #[inline]
    pub const fn opposite(self) -> BlockFace {
        match self {
            BlockFace::PosX => BlockFace::NegX,
            BlockFace::NegX => BlockFace::PosX,
            BlockFace::PosY => BlockFace::NegY,
            BlockFace::NegY => BlockFace::PosY,
            BlockFace::PosZ => BlockFace::NegZ,
            BlockFace::NegZ => BlockFace::PosZ,
        }
    }

    #[inline]
    pub const fn normal(self) -> [i32; 3] {
        match self {
            BlockFace::PosX => [1, 0, 0],
            BlockFace::NegX => [-1, 0, 0],
            BlockFace::PosY => [0, 1, 0],
            BlockFace::NegY => [0, -1, 0],
            BlockFace::PosZ => [0, 0, 1],
            BlockFace::NegZ => [0, 0, -1],
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            BlockFace::PosX => "+X",
            BlockFace::NegX => "-X",
            BlockFace::PosY => "+Y",
            BlockFace::NegY => "-Y",
            BlockFace::PosZ => "+Z",
            BlockFace::NegZ => "-Z",
        }
    }
}

/// Dense chunk dimensions. All three components are positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkExtent {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl ChunkExtent {
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn to_array(self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub const fn volume(self) -> usize {
        self.x as usize * self.y as usize * self.z as usize
    }

    #[inline]
    pub const fn contains(self, px: u32, py: u32, pz: u32) -> bool {
        px < self.x && py < self.y && pz < self.z
    }
}

impl Default for ChunkExtent {
    fn default() -> Self {
        cubic_extent(1)
    }
}

#[inline]
pub const fn cubic_extent(edge: u32) -> ChunkExtent {
    ChunkExtent::new(edge, edge, edge)
}

/// Read-only view of a dense 3D buffer, addressed `x + X*(y + Y*z)`.
#[derive(Clone, Copy)]
pub struct Span3<'a, T> {
    data: &'a [T],
    extent: ChunkExtent,
}

impl<'a, T> Span3<'a, T> {
    /// `data.len()` must equal `extent.volume()`.
    #[inline]
    pub fn new(data: &'a [T], extent: ChunkExtent) -> Self {
        debug_assert_eq!(data.len(), extent.volume());
        Self { data, extent }
    }

    #[inline]
    pub fn extent(&self) -> ChunkExtent {
        self.extent
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.extent.x as usize * (y + self.extent.y as usize * z)
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        self.extent
            .contains(x as u32, y as u32, z as u32)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> &T {
        &self.data[self.index(x, y, z)]
    }

    #[inline]
    pub fn linear(&self) -> &'a [T] {
        self.data
    }
}

impl<T: Copy> Span3<'_, T> {
    #[inline]
    pub fn at(&self, x: usize, y: usize, z: usize) -> T {
        self.data[self.index(x, y, z)]
    }
}

/// Mutable view of a dense 3D buffer.
pub struct Span3Mut<'a, T> {
    data: &'a mut [T],
    extent: ChunkExtent,
}

impl<'a, T> Span3Mut<'a, T> {
    #[inline]
    pub fn new(data: &'a mut [T], extent: ChunkExtent) -> Self {
        debug_assert_eq!(data.len(), extent.volume());
        Self { data, extent }
    }

    #[inline]
    pub fn extent(&self) -> ChunkExtent {
        self.extent
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.extent.x as usize * (y + self.extent.y as usize * z)
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        self.extent.contains(x as u32, y as u32, z as u32)
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> &mut T {
        let idx = self.index(x, y, z);
        &mut self.data[idx]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: T) {
        let idx = self.index(x, y, z);
        self.data[idx] = value;
    }

    #[inline]
    pub fn linear_mut(&mut self) -> &mut [T] {
        self.data
    }

    /// Consume the view, returning the full mutable slice with the original
    /// borrow lifetime.
    #[inline]
    pub fn into_linear(self) -> &'a mut [T] {
        self.data
    }

    #[inline]
    pub fn as_span(&self) -> Span3<'_, T> {
        Span3 {
            data: self.data,
            extent: self.extent,
        }
    }
}

impl<T: Copy> Span3Mut<'_, T> {
    #[inline]
    pub fn at(&self, x: usize, y: usize, z: usize) -> T {
        self.data[self.index(x, y, z)]
    }

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

/// World-space chunk coordinate. Serves as the hash key for every
/// region-scoped map; `Pod` so the blob framing can cast it directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RegionKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl RegionKey {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    #[inline]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs()
            + (self.y - other.y).unsigned_abs()
            + (self.z - other.z).unsigned_abs()
    }
}

impl std::hash::Hash for RegionKey {
    // Golden-ratio mixing so neighboring keys land far apart.
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        let mut h = (self.x as u64).wrapping_mul(0x9E37_79B1_85EB_CA87);
        h ^= (self.y as u64)
            .wrapping_add(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(h << 6)
            .wrapping_add(h >> 2);
        h ^= (self.z as u64)
            .wrapping_add(0xC2B2_AE3D_27D4_EB4F)
            .wrapping_add(h << 6)
            .wrapping_add(h >> 2);
        state.write_u64(h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn face_axis_sign_opposite() {
        for face in BlockFace::ALL {
            assert_eq!(face.opposite().opposite(), face);
            assert_eq!(face.axis(), face.opposite().axis());
            assert_eq!(face.sign(), -face.opposite().sign());

            let n = face.normal();
            assert_eq!(n[face.axis().index()], face.sign());
            let others: i32 = n.iter().map(|v| v.abs()).sum();
            assert_eq!(others, 1);
        }
    }

    #[test]
    fn extent_volume_and_contains() {
        let e = ChunkExtent::new(4, 3, 2);
        assert_eq!(e.volume(), 24);
        assert!(e.contains(3, 2, 1));
        assert!(!e.contains(4, 0, 0));
        assert_eq!(cubic_extent(8), ChunkExtent::new(8, 8, 8));
    }

    #[test]
    fn span_index_mapping() {
        let e = ChunkExtent::new(3, 4, 5);
        let data: Vec<u32> = (0..e.volume() as u32).collect();
        let span = Span3::new(&data, e);

        for z in 0..5 {
            for y in 0..4 {
                for x in 0..3 {
                    let idx = span.index(x, y, z);
                    assert_eq!(idx, x + 3 * (y + 4 * z));
                    assert!(idx < e.volume());
                    assert_eq!(span.at(x, y, z), idx as u32);
                }
            }
        }
    }

    #[test]
    fn span_mut_set_get() {
        let e = cubic_extent(2);
        let mut data = vec![0u16; e.volume()];
        let mut span = Span3Mut::new(&mut data, e);
        span.set(1, 0, 1, 42);
        assert_eq!(span.at(1, 0, 1), 42);
        assert_eq!(data[1 + 2 * (0 + 2 * 1)], 42);
    }

    #[test]
    fn region_key_neighbors_do_not_collide() {
        let mut seen = HashSet::new();
        for x in -2..=2 {
            for y in -2..=2 {
                for z in -2..=2 {
                    assert!(seen.insert(RegionKey::new(x, y, z)));
                }
            }
        }
        assert_eq!(seen.len(), 125);
    }

    #[test]
    fn region_key_manhattan() {
        let a = RegionKey::new(0, 0, 0);
        assert_eq!(a.manhattan_distance(RegionKey::new(1, 0, 0)), 1);
        assert_eq!(a.manhattan_distance(RegionKey::new(-1, 2, 3)), 6);
    }
}
