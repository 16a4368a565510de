// src/trace/mod.rs
//
// Ray-tracing support: sparse voxel octrees, clipmap occupancy pyramids,
// the per-region acceleration cache, voxel ray queries and baked lighting.

mod cache;
mod clipmap;
mod lighting;
mod rays;
mod svo;

pub use cache::{
    export_gpu_nodes, install_global_illumination, AccelerationCache, RegionAccelEntry,
};
pub use clipmap::{ClipmapGrid, ClipmapLevel};
pub use lighting::bake_lighting;
pub use rays::{
    cone_trace_occlusion, cone_trace_occlusion_view, trace_voxels, trace_voxels_view,
    ConeTraceDesc, Ray, VoxelHit,
};
pub use svo::{GpuNode, SparseVoxelOctree, SvoNode, VoxelNodeBounds, INVALID_CHILD};
