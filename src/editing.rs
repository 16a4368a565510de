// src/editing.rs
//
// World-space voxel edits: split an i64 world position into a region key
// plus local chunk coordinates, then write through the owning manager.

use crate::chunk::ChunkStorage;
use crate::core::{ChunkExtent, RegionKey, VoxelId};
use crate::region::{RegionError, RegionManager};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldPosition {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl WorldPosition {
    #[inline]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkCoordinates {
    pub region: RegionKey,
    pub local: [u32; 3],
}

#[inline]
fn floor_divmod(value: i64, divisor: u32) -> (i32, u32) {
    let denom = divisor as i64;
    (
        value.div_euclid(denom) as i32,
        value.rem_euclid(denom) as u32,
    )
}

/// Split a world position into its owning region and the local coordinate
/// inside that chunk.
#[inline]
pub fn split_world_position(position: WorldPosition, extent: ChunkExtent) -> ChunkCoordinates {
    let (rx, lx) = floor_divmod(position.x, extent.x);
    let (ry, ly) = floor_divmod(position.y, extent.y);
    let (rz, lz) = floor_divmod(position.z, extent.z);
    ChunkCoordinates {
        region: RegionKey::new(rx, ry, rz),
        local: [lx, ly, lz],
    }
}

#[inline]
pub fn linear_index(extent: ChunkExtent, local: [u32; 3]) -> usize {
    local[0] as usize + extent.x as usize * (local[1] as usize + extent.y as usize * local[2] as usize)
}

/// Write one voxel in a chunk. Returns false when out of bounds.
pub fn set_voxel(chunk: &mut ChunkStorage, local: [u32; 3], id: VoxelId) -> bool {
    if !chunk.extent().contains(local[0], local[1], local[2]) {
        return false;
    }
    chunk.planes_mut().voxels().set(
        local[0] as usize,
        local[1] as usize,
        local[2] as usize,
        id,
    );
    true
}

pub fn clear_voxel(chunk: &mut ChunkStorage, local: [u32; 3]) -> bool {
    set_voxel(chunk, local, 0)
}

/// Write one voxel at a world position, loading the chunk if needed.
pub fn set_voxel_in_world(
    regions: &mut RegionManager,
    position: WorldPosition,
    id: VoxelId,
) -> Result<bool, RegionError> {
    let coords = split_world_position(position, regions.chunk_dimensions());
    let chunk = regions.assure(coords.region)?;
    Ok(set_voxel(chunk, coords.local, id))
}

pub fn clear_voxel_in_world(
    regions: &mut RegionManager,
    position: WorldPosition,
) -> Result<bool, RegionError> {
    set_voxel_in_world(regions, position, 0)
}

/// Flip a world voxel between empty and `on_value`.
pub fn toggle_voxel(
    regions: &mut RegionManager,
    position: WorldPosition,
    on_value: VoxelId,
) -> Result<bool, RegionError> {
    let coords = split_world_position(position, regions.chunk_dimensions());
    let chunk = regions.assure(coords.region)?;
    if !chunk
        .extent()
        .contains(coords.local[0], coords.local[1], coords.local[2])
    {
        return Ok(false);
    }

    let (x, y, z) = (
        coords.local[0] as usize,
        coords.local[1] as usize,
        coords.local[2] as usize,
    );
    let mut planes = chunk.planes_mut();
    let mut voxels = planes.voxels();
    let current = voxels.at(x, y, z);
    voxels.set(x, y, z, if current == 0 { on_value } else { 0 });
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cubic_extent;

    #[test]
    fn split_handles_negative_world_coordinates() {
        let extent = cubic_extent(16);
        let coords = split_world_position(WorldPosition::new(-1, 0, 31), extent);
        assert_eq!(coords.region, RegionKey::new(-1, 0, 1));
        assert_eq!(coords.local, [15, 0, 15]);

        let coords = split_world_position(WorldPosition::new(-16, -17, 0), extent);
        assert_eq!(coords.region, RegionKey::new(-1, -2, 0));
        assert_eq!(coords.local, [0, 15, 0]);
    }

    #[test]
    fn split_and_linear_index_agree() {
        let extent = ChunkExtent::new(4, 8, 2);
        let coords = split_world_position(WorldPosition::new(5, 9, 3), extent);
        assert_eq!(coords.region, RegionKey::new(1, 1, 1));
        assert_eq!(coords.local, [1, 1, 1]);
        assert_eq!(linear_index(extent, coords.local), 1 + 4 * (1 + 8));
    }

    #[test]
    fn chunk_level_set_respects_bounds() {
        let mut chunk = ChunkStorage::with_extent(cubic_extent(4));
        assert!(set_voxel(&mut chunk, [3, 3, 3], 9));
        assert!(!set_voxel(&mut chunk, [4, 0, 0], 9));
        assert_eq!(chunk.planes().voxels().at(3, 3, 3), 9);
        assert!(chunk.dirty());
    }

    #[test]
    fn world_edits_route_to_the_right_chunk() {
        let mut manager = RegionManager::new(cubic_extent(4));
        assert!(set_voxel_in_world(&mut manager, WorldPosition::new(-1, 2, 5), 7).expect("assure"));

        let chunk = manager.find(RegionKey::new(-1, 0, 1)).expect("loaded");
        assert_eq!(chunk.planes().voxels().at(3, 2, 1), 7);

        assert!(
            clear_voxel_in_world(&mut manager, WorldPosition::new(-1, 2, 5)).expect("assure")
        );
        let chunk = manager.find(RegionKey::new(-1, 0, 1)).expect("loaded");
        assert_eq!(chunk.planes().voxels().at(3, 2, 1), 0);
    }

    #[test]
    fn toggle_flips_between_empty_and_value() {
        let mut manager = RegionManager::new(cubic_extent(4));
        let pos = WorldPosition::new(2, 2, 2);

        assert!(toggle_voxel(&mut manager, pos, 5).expect("assure"));
        assert_eq!(
            manager
                .find(RegionKey::new(0, 0, 0))
                .expect("loaded")
                .planes()
                .voxels()
                .at(2, 2, 2),
            5
        );

        assert!(toggle_voxel(&mut manager, pos, 5).expect("assure"));
        assert_eq!(
            manager
                .find(RegionKey::new(0, 0, 0))
                .expect("loaded")
                .planes()
                .voxels()
                .at(2, 2, 2),
            0
        );
    }
}
