// src/trace/lighting.rs
//
// Cheap baked lighting from cone-traced occlusion: empty cells are fully
// skylit, solid cells take blocklight from an upward cone trace and fold
// it into skylight.

use glam::Vec3;
use rayon::prelude::*;

use crate::chunk::ChunkStorage;
use crate::core::Span3;

use super::rays::{cone_trace_occlusion_view, ConeTraceDesc};

const BAKE_APERTURE: f32 = 0.75;
const BAKE_STEPS: u32 = 6;
const BAKE_MAX_DISTANCE: f32 = 12.0;

/// Rewrite the chunk's skylight/blocklight planes from its voxel contents.
/// Empty cells get blocklight 0 and skylight 15; solid cells get
/// blocklight `(1 - ao) * 15` and skylight raised to at least that.
pub fn bake_lighting(chunk: &mut ChunkStorage) {
    let extent = chunk.extent();
    let row = extent.x as usize;
    let rows_per_slab = extent.y as usize;

    let mut planes = chunk.planes_mut();
    let views = planes.views_mut();
    let voxels = views.voxels.into_linear();
    let skylight = views.skylight.into_linear();
    let blocklight = views.blocklight.into_linear();

    let voxel_view = Span3::new(voxels, extent);

    blocklight
        .par_chunks_mut(row)
        .zip(skylight.par_chunks_mut(row))
        .enumerate()
        .for_each(|(row_index, (block_row, sky_row))| {
            let y = row_index % rows_per_slab;
            let z = row_index / rows_per_slab;

            for x in 0..row {
                let id = voxel_view.at(x, y, z);
                if id == 0 {
                    block_row[x] = 0;
                    sky_row[x] = 15;
                    continue;
                }

                let desc = ConeTraceDesc {
                    origin: Vec3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5),
                    direction: Vec3::Y,
                    max_distance: BAKE_MAX_DISTANCE,
                    aperture: BAKE_APERTURE,
                    steps: BAKE_STEPS,
                };
                let occlusion = cone_trace_occlusion_view(&voxel_view, &desc);
                let light = ((1.0 - occlusion).clamp(0.0, 1.0) * 15.0) as u8;
                block_row[x] = light;
                sky_row[x] = sky_row[x].max(light);
            }
        });
}
