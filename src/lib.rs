//! Sparse, chunk-partitioned voxel world engine.
//!
//! The crate keeps a world as dense per-chunk planes behind a region
//! manager that streams chunks in and out under an LRU budget, runs
//! deferred per-chunk work, and fans dirty notifications out to observers.
//! From chunk contents it derives polygonal meshes (greedy and
//! marching-cubes), navigation grids with A* and flow fields, and
//! ray-tracing acceleration structures (sparse voxel octree, clipmap),
//! and round-trips chunks through a versioned binary payload format.
//!
//! ```
//! use voxel_world::{cubic_extent, greedy_mesh, RegionKey, RegionManager};
//!
//! let mut world = RegionManager::new(cubic_extent(16));
//! let key = RegionKey::new(0, 0, 0);
//! let chunk = world.assure(key).expect("no loader installed");
//! chunk.planes_mut().voxels().set(8, 8, 8, 1);
//!
//! let mesh = greedy_mesh(world.find(key).expect("resident").as_ref());
//! assert_eq!(mesh.vertices.len(), 24);
//! ```

pub mod chunk;
pub mod core;
pub mod editing;
pub mod effects;
pub mod meshing;
pub mod nav;
pub mod region;
pub mod serial;
pub mod trace;

pub use crate::core::{
    cubic_extent, Axis, BlockFace, ChunkExtent, MaterialIndex, RegionKey, Span3, Span3Mut,
    VoxelId, BLOCK_FACE_COUNT, INVALID_MATERIAL_INDEX, NULL_MATERIAL_INDEX,
};

pub use crate::chunk::{
    ChunkConfig, ChunkError, ChunkFill, ChunkStorage, CompressFn, DecompressFn, DirtyListener,
    PlaneViews, PlaneViewsMut, PlanesMut, PlanesRef,
};

pub use crate::region::{
    BoxedError, RegionError, RegionManager, RegionSnapshot,
};

pub use crate::meshing::{
    greedy_mesh, greedy_mesh_with, greedy_mesh_with_neighbor_chunks, marching_cubes,
    marching_cubes_from_chunk, marching_cubes_uniform, ChunkNeighbors, MarchingCubesConfig,
    MeshResult, NeighborSample, Vertex,
};

pub use crate::nav::{
    a_star, build_nav_grid, compute_flow_field, follow_flow, stitch_neighbor_regions, FlowField,
    NavBridge, NavBuildConfig, NavError, NavGrid, NavNeighborConfig, NavNodeIndex, NavPath,
    NavRegionView, StitchedNavGraph, INVALID_NODE,
};

pub use crate::trace::{
    bake_lighting, cone_trace_occlusion, install_global_illumination, trace_voxels,
    AccelerationCache, ClipmapGrid, ConeTraceDesc, GpuNode, Ray, SparseVoxelOctree, VoxelHit,
    VoxelNodeBounds,
};

pub use crate::serial::{
    deserialize_chunk, dump_region, file_sink, ingest_blob, is_legacy_chunk_payload,
    migrate_legacy_chunk_payload, read_region_blob, serialize_chunk, serialize_snapshot,
    RegionBlob, SerialError,
};

pub use crate::effects::{
    has_active_effects, simulate_decay, stamp_emitter, DecaySettings, EffectChannels,
    EmitterBrush, VelocitySample,
};
