// src/meshing/mod.rs
//
// Mesh extraction from chunk contents: a greedy quad-merge mesher for
// blocky output and a marching-cubes mesher for smooth isosurfaces. Both
// sample across chunk boundaries through the neighbor remap.

mod greedy;
mod marching;
mod neighbors;
mod tables;

pub use greedy::{greedy_mesh, greedy_mesh_with, greedy_mesh_with_neighbor_chunks};
pub use marching::{
    marching_cubes, marching_cubes_from_chunk, marching_cubes_uniform, MarchingCubesConfig,
};
pub use neighbors::{remap_to_neighbor, ChunkNeighbors, NeighborSample};

use bytemuck::{Pod, Zeroable};

use crate::core::VoxelId;

/// One mesh vertex, laid out for direct GPU upload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub id: VoxelId,
    pub _pad: u16,
}

impl Vertex {
    #[inline]
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2], id: VoxelId) -> Self {
        Self {
            position,
            normal,
            uv,
            id,
            _pad: 0,
        }
    }
}

/// Owned triangle soup with 32-bit indices.
#[derive(Clone, Debug, Default)]
pub struct MeshResult {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshResult {
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
