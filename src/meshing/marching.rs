// src/meshing/marching.rs
//
// Marching-cubes isosurface extraction. Cell corners sample a scalar
// density; corners strictly below the iso value count as inside (solid).
// Triangles come from the canonical tables with vertices interpolated
// along crossed edges.

use crate::chunk::ChunkStorage;
use crate::core::{ChunkExtent, VoxelId};

use super::neighbors::{ChunkNeighbors, NeighborViews};
use super::tables::{CUBE_CORNERS, EDGE_CONNECTION, EDGE_TABLE, TRI_TABLE};
use super::{MeshResult, Vertex};

#[derive(Clone, Copy, Debug)]
pub struct MarchingCubesConfig {
    /// Scalar threshold: samples strictly below it are solid.
    pub iso_value: f32,
}

impl Default for MarchingCubesConfig {
    fn default() -> Self {
        Self { iso_value: 0.5 }
    }
}

#[inline]
fn interpolate_vertex(p0: [f32; 3], p1: [f32; 3], v0: f32, v1: f32, iso_value: f32) -> [f32; 3] {
    let delta = v1 - v0;
    if delta.abs() < 1e-6 {
        return p0;
    }
    let mu = ((iso_value - v0) / delta).clamp(0.0, 1.0);
    [
        p0[0] + mu * (p1[0] - p0[0]),
        p0[1] + mu * (p1[1] - p0[1]),
        p0[2] + mu * (p1[2] - p0[2]),
    ]
}

#[inline]
fn face_normal(p0: [f32; 3], p1: [f32; 3], p2: [f32; 3]) -> [f32; 3] {
    let u = [p1[0] - p0[0], p1[1] - p0[1], p1[2] - p0[2]];
    let v = [p2[0] - p0[0], p2[1] - p0[1], p2[2] - p0[2]];
    let normal = [
        v[1] * u[2] - v[2] * u[1],
        v[2] * u[0] - v[0] * u[2],
        v[0] * u[1] - v[1] * u[0],
    ];
    let length_sq = normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2];
    if length_sq <= 1e-12 {
        return [0.0, 0.0, 0.0];
    }
    let inv = 1.0 / length_sq.sqrt();
    [normal[0] * inv, normal[1] * inv, normal[2] * inv]
}

/// March over every cell of `extent`. The density sampler may be called
/// one past the extent on each axis; the material sampler is called at
/// cell origins only.
pub fn marching_cubes(
    extent: ChunkExtent,
    density: impl Fn(usize, usize, usize) -> f32,
    material: impl Fn(usize, usize, usize) -> VoxelId,
    config: &MarchingCubesConfig,
) -> MeshResult {
    let mut result = MeshResult::default();
    let approximate_cells = extent.volume();
    result.vertices.reserve(approximate_cells * 3);
    result.indices.reserve(approximate_cells * 3);

    let mut edge_vertices = [[0.0f32; 3]; 12];

    for z in 0..extent.z as usize {
        for y in 0..extent.y as usize {
            for x in 0..extent.x as usize {
                let mut corner_values = [0.0f32; 8];
                let mut corner_positions = [[0.0f32; 3]; 8];
                for (corner, offset) in CUBE_CORNERS.iter().enumerate() {
                    let sx = x + offset[0] as usize;
                    let sy = y + offset[1] as usize;
                    let sz = z + offset[2] as usize;
                    corner_values[corner] = density(sx, sy, sz);
                    corner_positions[corner] = [sx as f32, sy as f32, sz as f32];
                }

                let mut cube_index = 0usize;
                for (corner, &value) in corner_values.iter().enumerate() {
                    if value < config.iso_value {
                        cube_index |= 1 << corner;
                    }
                }

                let edges = EDGE_TABLE[cube_index];
                if edges == 0 {
                    continue;
                }

                for (edge, connection) in EDGE_CONNECTION.iter().enumerate() {
                    if edges & (1 << edge) == 0 {
                        continue;
                    }
                    edge_vertices[edge] = interpolate_vertex(
                        corner_positions[connection[0]],
                        corner_positions[connection[1]],
                        corner_values[connection[0]],
                        corner_values[connection[1]],
                        config.iso_value,
                    );
                }

                let id = material(x, y, z);
                let row = &TRI_TABLE[cube_index];
                let mut tri = 0;
                while row[tri] != -1 {
                    let p0 = edge_vertices[row[tri] as usize];
                    let p1 = edge_vertices[row[tri + 1] as usize];
                    let p2 = edge_vertices[row[tri + 2] as usize];
                    let normal = face_normal(p0, p1, p2);

                    let base_index = result.vertices.len() as u32;
                    result
                        .vertices
                        .push(Vertex::new(p0, normal, [p0[0], p0[1]], id));
                    result
                        .vertices
                        .push(Vertex::new(p1, normal, [p1[0], p1[1]], id));
                    result
                        .vertices
                        .push(Vertex::new(p2, normal, [p2[0], p2[1]], id));
                    result
                        .indices
                        .extend_from_slice(&[base_index, base_index + 1, base_index + 2]);
                    tri += 3;
                }
            }
        }
    }

    result
}

/// March with one material id for every vertex.
pub fn marching_cubes_uniform(
    extent: ChunkExtent,
    density: impl Fn(usize, usize, usize) -> f32,
    config: &MarchingCubesConfig,
    material: VoxelId,
) -> MeshResult {
    marching_cubes(extent, density, |_, _, _| material, config)
}

/// March a chunk's voxels: solid cells sample 0.0, empty cells 1.0, and
/// coordinates outside every provided neighbor default to 1.0 (empty).
pub fn marching_cubes_from_chunk(
    chunk: &ChunkStorage,
    is_solid: impl Fn(VoxelId) -> bool,
    neighbors: &ChunkNeighbors<'_>,
    config: &MarchingCubesConfig,
) -> MeshResult {
    let extent = chunk.extent();
    let planes = chunk.planes();
    let voxels = planes.voxels();
    let views = NeighborViews::load(neighbors);

    let sample_voxel = |x: isize, y: isize, z: isize| -> Option<VoxelId> {
        if x >= 0
            && x < extent.x as isize
            && y >= 0
            && y < extent.y as isize
            && z >= 0
            && z < extent.z as isize
        {
            return Some(voxels.at(x as usize, y as usize, z as usize));
        }
        views.voxel(extent, [x, y, z])
    };

    let density = |x: usize, y: usize, z: usize| -> f32 {
        match sample_voxel(x as isize, y as isize, z as isize) {
            Some(id) if is_solid(id) => 0.0,
            _ => 1.0,
        }
    };
    let material = |x: usize, y: usize, z: usize| voxels.at(x, y, z);

    marching_cubes(extent, density, material, config)
}
