// src/trace/clipmap.rs
//
// Coarse-occupancy mip pyramid over one chunk. Level 0 carries per-voxel
// bounds; every following level halves each dimension (floored, clamped to
// one) and each cell takes the union of its up-to-eight child cells. The
// pyramid stops once a 1x1x1 level has been emitted.

use rayon::prelude::*;

use crate::chunk::ChunkStorage;

use super::svo::VoxelNodeBounds;

#[derive(Clone, Debug, Default)]
pub struct ClipmapLevel {
    pub dimensions: [u32; 3],
    pub cells: Vec<VoxelNodeBounds>,
}

impl ClipmapLevel {
    #[inline]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        x as usize
            + self.dimensions[0] as usize * (y as usize + self.dimensions[1] as usize * z as usize)
    }

    #[inline]
    pub fn cell(&self, x: u32, y: u32, z: u32) -> &VoxelNodeBounds {
        &self.cells[self.index(x, y, z)]
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClipmapGrid {
    levels: Vec<ClipmapLevel>,
}

impl ClipmapGrid {
    pub fn build(&mut self, chunk: &ChunkStorage) {
        self.levels.clear();

        let extent = chunk.extent();
        let planes = chunk.planes();
        let voxels = planes.voxels();

        // Level 0: one cell per voxel.
        let mut base = ClipmapLevel {
            dimensions: [extent.x, extent.y, extent.z],
            cells: vec![VoxelNodeBounds::default(); extent.volume()],
        };
        for (i, cell) in base.cells.iter_mut().enumerate() {
            cell.include(voxels.linear()[i]);
        }
        self.levels.push(base);

        loop {
            let prev = self.levels.last().expect("level 0 pushed above");
            if prev.dimensions == [1, 1, 1] {
                break;
            }
            let next = downsample(prev);
            self.levels.push(next);
        }
    }

    pub fn from_chunk(chunk: &ChunkStorage) -> Self {
        let mut grid = Self::default();
        grid.build(chunk);
        grid
    }

    #[inline]
    pub fn levels(&self) -> &[ClipmapLevel] {
        &self.levels
    }
}

fn downsample(prev: &ClipmapLevel) -> ClipmapLevel {
    let dims = [
        (prev.dimensions[0] / 2).max(1),
        (prev.dimensions[1] / 2).max(1),
        (prev.dimensions[2] / 2).max(1),
    ];
    let slab = dims[0] as usize * dims[1] as usize;
    let mut cells = vec![VoxelNodeBounds::default(); slab * dims[2] as usize];

    cells
        .par_chunks_mut(slab)
        .enumerate()
        .for_each(|(z, out_slab)| {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    let out = &mut out_slab[x as usize + dims[0] as usize * y as usize];
                    for dz in 0..2u32 {
                        for dy in 0..2u32 {
                            for dx in 0..2u32 {
                                let sx = x * 2 + dx;
                                let sy = y * 2 + dy;
                                let sz = z as u32 * 2 + dz;
                                if sx >= prev.dimensions[0]
                                    || sy >= prev.dimensions[1]
                                    || sz >= prev.dimensions[2]
                                {
                                    continue;
                                }
                                out.merge(prev.cell(sx, sy, sz));
                            }
                        }
                    }
                }
            }
        });

    ClipmapLevel {
        dimensions: dims,
        cells,
    }
}
