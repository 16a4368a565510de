// src/trace/rays.rs
//
// Voxel ray queries: amanatides-woo DDA traversal through a chunk's grid
// and a stepped cone trace for ambient occlusion.

use glam::{IVec3, Vec3};

use crate::chunk::ChunkStorage;
use crate::core::{Span3, VoxelId};

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct VoxelHit {
    pub hit: bool,
    pub position: IVec3,
    pub distance: f32,
    pub material: VoxelId,
}

#[inline]
fn floor_to_ivec(value: Vec3) -> IVec3 {
    IVec3::new(
        value.x.floor() as i32,
        value.y.floor() as i32,
        value.z.floor() as i32,
    )
}

/// Walk the grid cell by cell along `ray` and return the first non-empty
/// voxel within `max_distance`. The origin voxel counts. Direction need
/// not be normalized; zero components are defended with a large inverse.
pub fn trace_voxels(chunk: &ChunkStorage, ray: &Ray, max_distance: f32) -> VoxelHit {
    let planes = chunk.planes();
    trace_voxels_view(&planes.voxels(), ray, max_distance)
}

/// View-level DDA; lets callers already holding a plane guard trace
/// without re-locking.
pub fn trace_voxels_view(voxels: &Span3<'_, VoxelId>, ray: &Ray, max_distance: f32) -> VoxelHit {
    let mut result = VoxelHit::default();
    if voxels.is_empty() {
        return result;
    }
    let extent = voxels.extent();

    let mut inv_dir = [0.0f32; 3];
    for axis in 0..3 {
        let d = ray.direction[axis];
        inv_dir[axis] = if d.abs() > 1e-6 { 1.0 / d } else { f32::MAX };
    }

    let mut voxel_pos = floor_to_ivec(ray.origin);

    let mut t_max = [0.0f32; 3];
    let mut t_delta = [0.0f32; 3];
    for axis in 0..3 {
        let d = ray.direction[axis];
        if d > 0.0 {
            t_max[axis] = ((voxel_pos[axis] + 1) as f32 - ray.origin[axis]) * inv_dir[axis];
            t_delta[axis] = inv_dir[axis].abs();
        } else if d < 0.0 {
            t_max[axis] = (voxel_pos[axis] as f32 - ray.origin[axis]) * inv_dir[axis];
            t_delta[axis] = inv_dir[axis].abs();
        } else {
            t_max[axis] = f32::INFINITY;
            t_delta[axis] = f32::INFINITY;
        }
    }

    let step = IVec3::new(
        ray.direction.x.signum() as i32 * i32::from(ray.direction.x != 0.0),
        ray.direction.y.signum() as i32 * i32::from(ray.direction.y != 0.0),
        ray.direction.z.signum() as i32 * i32::from(ray.direction.z != 0.0),
    );

    let in_bounds = |pos: IVec3| {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && pos.x < extent.x as i32
            && pos.y < extent.y as i32
            && pos.z < extent.z as i32
    };

    let mut distance = 0.0f32;
    while distance <= max_distance {
        if in_bounds(voxel_pos) {
            let id = voxels.at(voxel_pos.x as usize, voxel_pos.y as usize, voxel_pos.z as usize);
            if id != 0 {
                result.hit = true;
                result.position = voxel_pos;
                result.distance = distance;
                result.material = id;
                return result;
            }
        }

        let mut axis = 0;
        if t_max[1] < t_max[axis] {
            axis = 1;
        }
        if t_max[2] < t_max[axis] {
            axis = 2;
        }

        distance = t_max[axis];
        voxel_pos[axis] += step[axis];
        t_max[axis] += t_delta[axis];

        if !in_bounds(voxel_pos) && distance > max_distance {
            break;
        }
    }

    result
}

#[derive(Clone, Copy, Debug)]
pub struct ConeTraceDesc {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_distance: f32,
    pub aperture: f32,
    pub steps: u32,
}

impl Default for ConeTraceDesc {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Y,
            max_distance: 16.0,
            aperture: 0.5,
            steps: 8,
        }
    }
}

/// Stepped occlusion estimate: march `steps` samples along the cone axis,
/// widening the probe radius with the aperture; each occluded step adds
/// 1/steps. Result is clamped to [0, 1].
pub fn cone_trace_occlusion(chunk: &ChunkStorage, desc: &ConeTraceDesc) -> f32 {
    let planes = chunk.planes();
    cone_trace_occlusion_view(&planes.voxels(), desc)
}

pub fn cone_trace_occlusion_view(voxels: &Span3<'_, VoxelId>, desc: &ConeTraceDesc) -> f32 {
    if voxels.is_empty() || desc.steps == 0 {
        return 0.0;
    }
    let extent = voxels.extent();

    let length = desc.direction.length();
    if length <= 1e-6 {
        return 0.0;
    }
    let dir = desc.direction / length;

    let mut occlusion = 0.0f32;
    for step in 0..desc.steps {
        let t = (step as f32 + 0.5) / desc.steps as f32;
        let radius = desc.aperture * t;
        let distance = desc.max_distance * t;
        let sample = desc.origin + dir * distance;

        let center = floor_to_ivec(sample);
        let radius_voxels = radius.ceil() as i32;

        'probe: for dz in -radius_voxels..=radius_voxels {
            for dy in -radius_voxels..=radius_voxels {
                for dx in -radius_voxels..=radius_voxels {
                    let probe = center + IVec3::new(dx, dy, dz);
                    if probe.x < 0
                        || probe.y < 0
                        || probe.z < 0
                        || probe.x >= extent.x as i32
                        || probe.y >= extent.y as i32
                        || probe.z >= extent.z as i32
                    {
                        continue;
                    }
                    let id =
                        voxels.at(probe.x as usize, probe.y as usize, probe.z as usize);
                    if id != 0 {
                        occlusion += 1.0 / desc.steps as f32;
                        break 'probe;
                    }
                }
            }
        }
    }

    occlusion.clamp(0.0, 1.0)
}
