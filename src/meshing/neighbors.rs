// src/meshing/neighbors.rs
//
// Cross-chunk sampling for the meshers. A coordinate one step outside the
// primary chunk is valid only when exactly one axis is out of range; it
// then remaps to a local coordinate inside the face neighbor.

use crate::chunk::{ChunkStorage, PlanesRef};
use crate::core::{BlockFace, ChunkExtent, VoxelId};

/// Up to six neighbor chunks surrounding a primary chunk.
#[derive(Clone, Copy, Default)]
pub struct ChunkNeighbors<'a> {
    pub pos_x: Option<&'a ChunkStorage>,
    pub neg_x: Option<&'a ChunkStorage>,
    pub pos_y: Option<&'a ChunkStorage>,
    pub neg_y: Option<&'a ChunkStorage>,
    pub pos_z: Option<&'a ChunkStorage>,
    pub neg_z: Option<&'a ChunkStorage>,
}

impl<'a> ChunkNeighbors<'a> {
    #[inline]
    pub fn get(&self, face: BlockFace) -> Option<&'a ChunkStorage> {
        match face {
            BlockFace::PosX => self.pos_x,
            BlockFace::NegX => self.neg_x,
            BlockFace::PosY => self.pos_y,
            BlockFace::NegY => self.neg_y,
            BlockFace::PosZ => self.pos_z,
            BlockFace::NegZ => self.neg_z,
        }
    }
}

/// Where a possibly out-of-range coordinate lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeighborSample {
    /// Inside the primary chunk: the linear index.
    InBounds(usize),
    /// Exactly one axis out of range, remapped into the face neighbor.
    OutOfBounds { face: BlockFace, local: [usize; 3] },
    /// No single neighbor covers the coordinate.
    Unresolved,
}

/// Single dispatch point for cross-boundary lookups. `neighbor_extent`
/// reports the extent of the chunk behind a face, or None when absent.
pub fn remap_to_neighbor(
    extent: ChunkExtent,
    coord: [isize; 3],
    neighbor_extent: impl Fn(BlockFace) -> Option<ChunkExtent>,
) -> NeighborSample {
    let dims = [extent.x as isize, extent.y as isize, extent.z as isize];

    let mut out_of_bounds_axes = 0;
    let mut face = BlockFace::PosX;

    if coord[0] < 0 {
        face = BlockFace::NegX;
        out_of_bounds_axes += 1;
    } else if coord[0] >= dims[0] {
        face = BlockFace::PosX;
        out_of_bounds_axes += 1;
    }
    if coord[1] < 0 {
        face = BlockFace::NegY;
        out_of_bounds_axes += 1;
    } else if coord[1] >= dims[1] {
        face = BlockFace::PosY;
        out_of_bounds_axes += 1;
    }
    if coord[2] < 0 {
        face = BlockFace::NegZ;
        out_of_bounds_axes += 1;
    } else if coord[2] >= dims[2] {
        face = BlockFace::PosZ;
        out_of_bounds_axes += 1;
    }

    if out_of_bounds_axes == 0 {
        let (x, y, z) = (coord[0] as usize, coord[1] as usize, coord[2] as usize);
        return NeighborSample::InBounds(x + extent.x as usize * (y + extent.y as usize * z));
    }
    if out_of_bounds_axes != 1 {
        return NeighborSample::Unresolved;
    }

    let Some(neighbor) = neighbor_extent(face) else {
        return NeighborSample::Unresolved;
    };

    let mut local = coord;
    match face {
        BlockFace::NegX => local[0] += neighbor.x as isize,
        BlockFace::PosX => local[0] -= dims[0],
        BlockFace::NegY => local[1] += neighbor.y as isize,
        BlockFace::PosY => local[1] -= dims[1],
        BlockFace::NegZ => local[2] += neighbor.z as isize,
        BlockFace::PosZ => local[2] -= dims[2],
    }

    if local[0] < 0
        || local[0] >= neighbor.x as isize
        || local[1] < 0
        || local[1] >= neighbor.y as isize
        || local[2] < 0
        || local[2] >= neighbor.z as isize
    {
        return NeighborSample::Unresolved;
    }

    NeighborSample::OutOfBounds {
        face,
        local: [local[0] as usize, local[1] as usize, local[2] as usize],
    }
}

/// Plane guards of the present neighbors, acquired once per mesh pass.
pub(crate) struct NeighborViews<'a> {
    views: [Option<PlanesRef<'a>>; 6],
}

impl<'a> NeighborViews<'a> {
    pub fn load(neighbors: &ChunkNeighbors<'a>) -> Self {
        let mut views = [None, None, None, None, None, None];
        for face in BlockFace::ALL {
            if let Some(chunk) = neighbors.get(face) {
                views[face as usize] = Some(chunk.planes());
            }
        }
        Self { views }
    }

    fn extent_of(&self, face: BlockFace) -> Option<ChunkExtent> {
        self.views[face as usize]
            .as_ref()
            .map(|planes| planes.extent())
    }

    /// Voxel behind a cross-boundary coordinate, or None when no neighbor
    /// covers it. `coord` must already be outside `extent` on exactly one
    /// axis (anything else resolves to None).
    pub fn voxel(&self, extent: ChunkExtent, coord: [isize; 3]) -> Option<VoxelId> {
        match remap_to_neighbor(extent, coord, |face| self.extent_of(face)) {
            NeighborSample::OutOfBounds { face, local } => {
                let planes = self.views[face as usize].as_ref()?;
                Some(planes.voxels().at(local[0], local[1], local[2]))
            }
            _ => None,
        }
    }
}
