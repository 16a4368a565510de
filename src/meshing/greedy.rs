// src/meshing/greedy.rs
//
// Greedy quad-merge mesher. For each of the six face directions, sweep the
// chunk plane by plane, mask the cells whose face is exposed, then merge
// mask runs into maximal quads (width along u first, then height along v).
//
// Vertical faces (Z axis) get a 0.001 bias along the face direction so
// coplanar faces of stacked chunks do not z-fight.

use crate::chunk::ChunkStorage;
use crate::core::{BlockFace, VoxelId};

use super::neighbors::{ChunkNeighbors, NeighborViews};
use super::{MeshResult, Vertex};

const VERTICAL_FACE_BIAS: f32 = 0.001;

#[derive(Clone, Copy, Default)]
struct MaskCell {
    filled: bool,
    id: VoxelId,
}

/// Mesh with the default opacity rule (id != 0) and no neighbors: the
/// chunk boundary is treated as open.
pub fn greedy_mesh(chunk: &ChunkStorage) -> MeshResult {
    greedy_mesh_with(chunk, |id| id != 0, |_| false)
}

/// Mesh with a custom opacity predicate and an out-of-chunk sampler that
/// reports whether the voxel at a (one-axis out-of-range) coordinate is
/// opaque.
pub fn greedy_mesh_with(
    chunk: &ChunkStorage,
    is_opaque: impl Fn(VoxelId) -> bool,
    neighbor_opaque: impl Fn([isize; 3]) -> bool,
) -> MeshResult {
    let mut result = MeshResult::default();
    let extent = chunk.extent();
    let dims = [extent.x as usize, extent.y as usize, extent.z as usize];
    let planes = chunk.planes();
    let voxels = planes.voxels();

    for face in BlockFace::ALL {
        let axis = face.axis().index();
        let sign = face.sign();
        let u_axis = (axis + 1) % 3;
        let v_axis = (axis + 2) % 3;
        let du = dims[u_axis];
        let dv = dims[v_axis];

        let mut mask = vec![MaskCell::default(); du * dv];

        for plane in 0..dims[axis] {
            mask.fill(MaskCell::default());

            for v in 0..dv {
                for u in 0..du {
                    let mut pos = [0usize; 3];
                    pos[axis] = plane;
                    pos[u_axis] = u;
                    pos[v_axis] = v;

                    let current = voxels.at(pos[0], pos[1], pos[2]);
                    if !is_opaque(current) {
                        continue;
                    }

                    let mut neighbor = [pos[0] as isize, pos[1] as isize, pos[2] as isize];
                    neighbor[axis] += sign as isize;

                    let inside = neighbor[axis] >= 0 && neighbor[axis] < dims[axis] as isize;
                    let neighbor_solid = if inside {
                        is_opaque(voxels.at(
                            neighbor[0] as usize,
                            neighbor[1] as usize,
                            neighbor[2] as usize,
                        ))
                    } else {
                        neighbor_opaque(neighbor)
                    };

                    if !neighbor_solid {
                        mask[u + v * du] = MaskCell {
                            filled: true,
                            id: current,
                        };
                    }
                }
            }

            emit_merged_quads(&mut result, &mut mask, face, plane, du, dv);
        }
    }

    result
}

/// Mesh with up to six neighbor chunks supplying cross-boundary opacity.
pub fn greedy_mesh_with_neighbor_chunks(
    chunk: &ChunkStorage,
    neighbors: &ChunkNeighbors<'_>,
    is_opaque: impl Fn(VoxelId) -> bool,
) -> MeshResult {
    let extent = chunk.extent();
    let views = NeighborViews::load(neighbors);
    greedy_mesh_with(chunk, &is_opaque, |coord| {
        views
            .voxel(extent, coord)
            .is_some_and(|id| is_opaque(id))
    })
}

fn emit_merged_quads(
    result: &mut MeshResult,
    mask: &mut [MaskCell],
    face: BlockFace,
    plane: usize,
    du: usize,
    dv: usize,
) {
    let axis = face.axis().index();
    let sign = face.sign();
    let u_axis = (axis + 1) % 3;
    let v_axis = (axis + 2) % 3;

    for v in 0..dv {
        for u in 0..du {
            let idx = u + v * du;
            let cell = mask[idx];
            if !cell.filled {
                continue;
            }

            // Grow width along u while ids match.
            let mut width = 1;
            while u + width < du {
                let next = mask[idx + width];
                if !next.filled || next.id != cell.id {
                    break;
                }
                width += 1;
            }

            // Grow height along v while every column matches.
            let mut height = 1;
            'grow: while v + height < dv {
                for x in 0..width {
                    let next = mask[idx + x + height * du];
                    if !next.filled || next.id != cell.id {
                        break 'grow;
                    }
                }
                height += 1;
            }

            let mut axis_coord = (plane + usize::from(sign > 0)) as f32;
            if axis == 2 {
                axis_coord += sign as f32 * VERTICAL_FACE_BIAS;
            }

            let mut base = [0.0f32; 3];
            base[axis] = axis_coord;
            base[u_axis] = u as f32;
            base[v_axis] = v as f32;

            let mut du_vec = [0.0f32; 3];
            du_vec[u_axis] = width as f32;
            let mut dv_vec = [0.0f32; 3];
            dv_vec[v_axis] = height as f32;

            let corners = [
                base,
                [
                    base[0] + du_vec[0],
                    base[1] + du_vec[1],
                    base[2] + du_vec[2],
                ],
                [
                    base[0] + du_vec[0] + dv_vec[0],
                    base[1] + du_vec[1] + dv_vec[1],
                    base[2] + du_vec[2] + dv_vec[2],
                ],
                [
                    base[0] + dv_vec[0],
                    base[1] + dv_vec[1],
                    base[2] + dv_vec[2],
                ],
            ];
            let uv = [
                [0.0, 0.0],
                [width as f32, 0.0],
                [width as f32, height as f32],
                [0.0, height as f32],
            ];

            let n = face.normal();
            let normal = [n[0] as f32, n[1] as f32, n[2] as f32];

            let base_index = result.vertices.len() as u32;
            for corner in 0..4 {
                result
                    .vertices
                    .push(Vertex::new(corners[corner], normal, uv[corner], cell.id));
            }
            if sign > 0 {
                result.indices.extend_from_slice(&[
                    base_index,
                    base_index + 1,
                    base_index + 2,
                    base_index,
                    base_index + 2,
                    base_index + 3,
                ]);
            } else {
                result.indices.extend_from_slice(&[
                    base_index,
                    base_index + 2,
                    base_index + 1,
                    base_index,
                    base_index + 3,
                    base_index + 2,
                ]);
            }

            for dy in 0..height {
                for dx in 0..width {
                    mask[u + dx + (v + dy) * du].filled = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkFill;
    use crate::core::cubic_extent;
    use crate::meshing::mesh_tests::assert_mesh_invariants;

    #[test]
    fn single_voxel_emits_six_quads() {
        let mut chunk = ChunkStorage::with_extent(cubic_extent(3));
        chunk.planes_mut().voxels().set(1, 1, 1, 42);

        let mesh = greedy_mesh(&chunk);
        assert_mesh_invariants(&mesh);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.vertices.iter().all(|vertex| vertex.id == 42));
    }

    #[test]
    fn solid_slab_merges_to_one_quad_per_face() {
        // A full 4x4x1 slab: every face direction merges into one quad,
        // so 6 quads total.
        let mut chunk = ChunkStorage::new(crate::chunk::ChunkConfig {
            extent: crate::core::ChunkExtent::new(4, 4, 1),
            ..crate::chunk::ChunkConfig::default()
        });
        chunk.fill(ChunkFill::voxel(1));

        let mesh = greedy_mesh(&chunk);
        assert_mesh_invariants(&mesh);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
    }

    #[test]
    fn merge_prefers_width_then_height() {
        // Two voxels in a row along x: the +Y face is one 2x1 quad.
        let mut chunk = ChunkStorage::with_extent(cubic_extent(3));
        {
            let mut planes = chunk.planes_mut();
            let mut voxels = planes.voxels();
            voxels.set(0, 0, 0, 7);
            voxels.set(1, 0, 0, 7);
        }

        let mesh = greedy_mesh(&chunk);
        assert_mesh_invariants(&mesh);
        // 6 merged quads for the 2x1x1 box: 24 vertices.
        assert_eq!(mesh.vertices.len(), 24);
    }

    #[test]
    fn different_ids_do_not_merge() {
        let mut chunk = ChunkStorage::with_extent(cubic_extent(3));
        {
            let mut planes = chunk.planes_mut();
            let mut voxels = planes.voxels();
            voxels.set(0, 0, 0, 1);
            voxels.set(1, 0, 0, 2);
        }

        let mesh = greedy_mesh(&chunk);
        assert_mesh_invariants(&mesh);
        // Ten exposed faces (2 x-caps, the seam hides 2), none merged
        // across the id change: 4 + 4 + 2 top + 2 bottom + 2 front + 2
        // back... every quad is 1x1 here: 10 quads.
        assert_eq!(mesh.vertices.len(), 40);
        assert_eq!(mesh.indices.len(), 60);
    }

    #[test]
    fn interior_faces_are_culled() {
        let mut chunk = ChunkStorage::with_extent(cubic_extent(2));
        chunk.fill(ChunkFill::voxel(1));

        let mesh = greedy_mesh(&chunk);
        assert_mesh_invariants(&mesh);
        // A solid cube merges each outer face into one quad; nothing
        // interior survives.
        assert_eq!(mesh.vertices.len(), 24);
    }

    #[test]
    fn vertical_bias_offsets_z_faces() {
        let mut chunk = ChunkStorage::with_extent(cubic_extent(1));
        chunk.planes_mut().voxels().set(0, 0, 0, 1);

        let mesh = greedy_mesh(&chunk);
        for vertex in &mesh.vertices {
            if vertex.normal == [0.0, 0.0, 1.0] {
                assert!(vertex.position[2] > 1.0 && vertex.position[2] < 1.1);
            }
            if vertex.normal == [0.0, 0.0, -1.0] {
                assert!(vertex.position[2] > -0.1 && vertex.position[2] < 0.0);
            }
            if vertex.normal == [1.0, 0.0, 0.0] {
                assert_eq!(vertex.position[0], 1.0, "x faces carry no bias");
            }
        }
    }

    #[test]
    fn neighbor_sampler_suppresses_boundary_faces() {
        let mut chunk = ChunkStorage::with_extent(cubic_extent(2));
        chunk.fill(ChunkFill::voxel(1));

        // Everything beyond +X is opaque: no +X faces in the output.
        let mesh = greedy_mesh_with(&chunk, |id| id != 0, |coord| coord[0] >= 2);
        assert_mesh_invariants(&mesh);
        assert!(mesh
            .vertices
            .iter()
            .all(|vertex| vertex.normal != [1.0, 0.0, 0.0]));
        // The other five directions still emit one merged quad each.
        assert_eq!(mesh.vertices.len(), 20);
    }

    #[test]
    fn neighbor_chunks_suppress_shared_faces() {
        let mut chunk = ChunkStorage::with_extent(cubic_extent(2));
        chunk.fill(ChunkFill::voxel(1));
        let mut east = ChunkStorage::with_extent(cubic_extent(2));
        east.fill(ChunkFill::voxel(1));

        let neighbors = ChunkNeighbors {
            pos_x: Some(&east),
            ..ChunkNeighbors::default()
        };
        let mesh = greedy_mesh_with_neighbor_chunks(&chunk, &neighbors, |id| id != 0);
        assert_mesh_invariants(&mesh);
        assert!(
            mesh.vertices
                .iter()
                .all(|vertex| vertex.normal != [1.0, 0.0, 0.0]),
            "+X faces hidden by the opaque east neighbor"
        );

        // An empty east neighbor exposes them again.
        let empty = ChunkStorage::with_extent(cubic_extent(2));
        let neighbors = ChunkNeighbors {
            pos_x: Some(&empty),
            ..ChunkNeighbors::default()
        };
        let mesh = greedy_mesh_with_neighbor_chunks(&chunk, &neighbors, |id| id != 0);
        assert!(mesh
            .vertices
            .iter()
            .any(|vertex| vertex.normal == [1.0, 0.0, 0.0]));
    }

    #[test]
    fn winding_matches_face_sign() {
        let mut chunk = ChunkStorage::with_extent(cubic_extent(1));
        chunk.planes_mut().voxels().set(0, 0, 0, 1);
        let mesh = greedy_mesh(&chunk);

        // For every triangle, the geometric normal from the winding must
        // point the same way as the stored face normal.
        for tri in mesh.indices.chunks(3) {
            let a = mesh.vertices[tri[0] as usize];
            let b = mesh.vertices[tri[1] as usize];
            let c = mesh.vertices[tri[2] as usize];
            let u = [
                b.position[0] - a.position[0],
                b.position[1] - a.position[1],
                b.position[2] - a.position[2],
            ];
            let v = [
                c.position[0] - a.position[0],
                c.position[1] - a.position[1],
                c.position[2] - a.position[2],
            ];
            let cross = [
                u[1] * v[2] - u[2] * v[1],
                u[2] * v[0] - u[0] * v[2],
                u[0] * v[1] - u[1] * v[0],
            ];
            let dot = cross[0] * a.normal[0] + cross[1] * a.normal[1] + cross[2] * a.normal[2];
            assert!(dot > 0.0, "winding agrees with normal {:?}", a.normal);
        }
    }
}
