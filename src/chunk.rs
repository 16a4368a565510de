// src/chunk.rs
//
// Dense per-chunk plane storage. A chunk always carries the four base
// planes (voxels, skylight, blocklight, metadata); materials, float light
// caches and particle-effect planes are allocated on demand via the config.
//
// The plane set and the compression state live behind one per-chunk mutex.
// Plane access goes through guard bundles acquired once per operation:
// acquiring a guard lazily re-inflates a compressed chunk, and the mutable
// guard marks the chunk dirty and fires the dirty listeners. Two distinct
// chunks can flush compression concurrently; a single chunk serializes
// blob/flag access through its own lock.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::{
    ChunkExtent, MaterialIndex, Span3, Span3Mut, VoxelId, cubic_extent, INVALID_MATERIAL_INDEX,
};
use crate::effects::{EffectChannels, VelocitySample};

#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// A view of an optional plane was requested but the feature is off.
    #[error("plane not enabled: {0}")]
    DisabledPlane(&'static str),
    /// A bulk transfer did not match the chunk volume.
    #[error("voxel data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Which planes a chunk allocates, and its dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkConfig {
    pub extent: ChunkExtent,
    pub enable_materials: bool,
    pub enable_high_precision_lighting: bool,
    pub effect_channels: EffectChannels,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            extent: cubic_extent(32),
            enable_materials: false,
            enable_high_precision_lighting: false,
            effect_channels: EffectChannels::NONE,
        }
    }
}

/// Uniform values written by [`ChunkStorage::fill`].
#[derive(Clone, Copy, Debug)]
pub struct ChunkFill {
    pub voxel: VoxelId,
    pub skylight: u8,
    pub blocklight: u8,
    pub metadata: u8,
    pub material: MaterialIndex,
    pub skylight_cache: f32,
    pub blocklight_cache: f32,
}

impl Default for ChunkFill {
    fn default() -> Self {
        Self {
            voxel: 0,
            skylight: 0,
            blocklight: 0,
            metadata: 0,
            material: INVALID_MATERIAL_INDEX,
            skylight_cache: 0.0,
            blocklight_cache: 0.0,
        }
    }
}

impl ChunkFill {
    #[inline]
    pub fn voxel(voxel: VoxelId) -> Self {
        Self {
            voxel,
            ..Self::default()
        }
    }
}

/// Read-only spans over every present plane, handed to compression hooks
/// and the serializer.
pub struct PlaneViews<'a> {
    pub voxels: Span3<'a, VoxelId>,
    pub skylight: Span3<'a, u8>,
    pub blocklight: Span3<'a, u8>,
    pub metadata: Span3<'a, u8>,
    pub materials: Option<Span3<'a, MaterialIndex>>,
    pub skylight_cache: Option<Span3<'a, f32>>,
    pub blocklight_cache: Option<Span3<'a, f32>>,
    pub effect_density: Option<Span3<'a, f32>>,
    pub effect_velocity: Option<Span3<'a, VelocitySample>>,
    pub effect_lifetime: Option<Span3<'a, f32>>,
}

/// Mutable spans over every present plane.
pub struct PlaneViewsMut<'a> {
    pub voxels: Span3Mut<'a, VoxelId>,
    pub skylight: Span3Mut<'a, u8>,
    pub blocklight: Span3Mut<'a, u8>,
    pub metadata: Span3Mut<'a, u8>,
    pub materials: Option<Span3Mut<'a, MaterialIndex>>,
    pub skylight_cache: Option<Span3Mut<'a, f32>>,
    pub blocklight_cache: Option<Span3Mut<'a, f32>>,
    pub effect_density: Option<Span3Mut<'a, f32>>,
    pub effect_velocity: Option<Span3Mut<'a, VelocitySample>>,
    pub effect_lifetime: Option<Span3Mut<'a, f32>>,
}

pub type CompressFn = dyn Fn(&PlaneViews<'_>) -> Vec<u8> + Send + Sync;
pub type DecompressFn = dyn Fn(PlaneViewsMut<'_>, &[u8]) + Send + Sync;

/// Listener fired on every dirtying access. Must not re-enter the same
/// chunk's plane guards.
pub type DirtyListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
struct PlaneSet {
    voxels: Vec<VoxelId>,
    skylight: Vec<u8>,
    blocklight: Vec<u8>,
    metadata: Vec<u8>,
    materials: Option<Vec<MaterialIndex>>,
    skylight_cache: Option<Vec<f32>>,
    blocklight_cache: Option<Vec<f32>>,
    effect_density: Option<Vec<f32>>,
    effect_velocity: Option<Vec<VelocitySample>>,
    effect_lifetime: Option<Vec<f32>>,
}

impl PlaneSet {
    fn allocate(config: &ChunkConfig) -> Self {
        let count = config.extent.volume();
        let hp = config.enable_high_precision_lighting;

        Self {
            voxels: vec![0; count],
            skylight: vec![0; count],
            blocklight: vec![0; count],
            metadata: vec![0; count],
            materials: if config.enable_materials {
                Some(vec![INVALID_MATERIAL_INDEX; count])
            } else {
                None
            },
            skylight_cache: if hp { Some(vec![0.0; count]) } else { None },
            blocklight_cache: if hp { Some(vec![0.0; count]) } else { None },
            effect_density: if config.effect_channels.contains(EffectChannels::DENSITY) {
                Some(vec![0.0; count])
            } else {
                None
            },
            effect_velocity: if config.effect_channels.contains(EffectChannels::VELOCITY) {
                Some(vec![VelocitySample::default(); count])
            } else {
                None
            },
            effect_lifetime: if config.effect_channels.contains(EffectChannels::LIFETIME) {
                Some(vec![0.0; count])
            } else {
                None
            },
        }
    }

    fn views(&self, extent: ChunkExtent) -> PlaneViews<'_> {
        PlaneViews {
            voxels: Span3::new(&self.voxels, extent),
            skylight: Span3::new(&self.skylight, extent),
            blocklight: Span3::new(&self.blocklight, extent),
            metadata: Span3::new(&self.metadata, extent),
            materials: self.materials.as_deref().map(|p| Span3::new(p, extent)),
            skylight_cache: self.skylight_cache.as_deref().map(|p| Span3::new(p, extent)),
            blocklight_cache: self
                .blocklight_cache
                .as_deref()
                .map(|p| Span3::new(p, extent)),
            effect_density: self.effect_density.as_deref().map(|p| Span3::new(p, extent)),
            effect_velocity: self
                .effect_velocity
                .as_deref()
                .map(|p| Span3::new(p, extent)),
            effect_lifetime: self
                .effect_lifetime
                .as_deref()
                .map(|p| Span3::new(p, extent)),
        }
    }

    fn views_mut(&mut self, extent: ChunkExtent) -> PlaneViewsMut<'_> {
        PlaneViewsMut {
            voxels: Span3Mut::new(&mut self.voxels, extent),
            skylight: Span3Mut::new(&mut self.skylight, extent),
            blocklight: Span3Mut::new(&mut self.blocklight, extent),
            metadata: Span3Mut::new(&mut self.metadata, extent),
            materials: self
                .materials
                .as_deref_mut()
                .map(|p| Span3Mut::new(p, extent)),
            skylight_cache: self
                .skylight_cache
                .as_deref_mut()
                .map(|p| Span3Mut::new(p, extent)),
            blocklight_cache: self
                .blocklight_cache
                .as_deref_mut()
                .map(|p| Span3Mut::new(p, extent)),
            effect_density: self
                .effect_density
                .as_deref_mut()
                .map(|p| Span3Mut::new(p, extent)),
            effect_velocity: self
                .effect_velocity
                .as_deref_mut()
                .map(|p| Span3Mut::new(p, extent)),
            effect_lifetime: self
                .effect_lifetime
                .as_deref_mut()
                .map(|p| Span3Mut::new(p, extent)),
        }
    }
}

#[derive(Clone)]
struct ChunkState {
    planes: PlaneSet,
    compression_requested: bool,
    compressed: bool,
    compressed_blob: Vec<u8>,
    encode: Option<Arc<CompressFn>>,
    decode: Option<Arc<DecompressFn>>,
}

/// Dense voxel chunk. Cloning deep-copies the plane set and shares the
/// listener callables, which is what makes `Arc<ChunkStorage>` snapshots
/// copy-on-write safe.
pub struct ChunkStorage {
    config: ChunkConfig,
    state: Mutex<ChunkState>,
    dirty: bool,
    listeners: Vec<DirtyListener>,
}

impl std::fmt::Debug for ChunkStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStorage")
            .field("config", &self.config)
            .field("dirty", &self.dirty)
            .field("listeners_len", &self.listeners.len())
            .finish()
    }
}

impl ChunkStorage {
    pub fn new(config: ChunkConfig) -> Self {
        Self {
            state: Mutex::new(ChunkState {
                planes: PlaneSet::allocate(&config),
                compression_requested: false,
                compressed: false,
                compressed_blob: Vec::new(),
                encode: None,
                decode: None,
            }),
            config,
            dirty: false,
            listeners: Vec::new(),
        }
    }

    pub fn with_extent(extent: ChunkExtent) -> Self {
        Self::new(ChunkConfig {
            extent,
            ..ChunkConfig::default()
        })
    }

    #[inline]
    pub fn extent(&self) -> ChunkExtent {
        self.config.extent
    }

    #[inline]
    pub fn volume(&self) -> usize {
        self.config.extent.volume()
    }

    #[inline]
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, ChunkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read access to every plane. Lazily re-inflates a compressed chunk.
    pub fn planes(&self) -> PlanesRef<'_> {
        let mut state = self.lock();
        inflate_locked(&mut state, self.config.extent);
        PlanesRef {
            state,
            extent: self.config.extent,
        }
    }

    /// Write access to every plane. Marks the chunk dirty and fires the
    /// dirty listeners (in registration order) before the lock is taken.
    pub fn planes_mut(&mut self) -> PlanesMut<'_> {
        self.mark_dirty(true);
        let mut state = self.lock();
        inflate_locked(&mut state, self.config.extent);
        PlanesMut {
            state,
            extent: self.config.extent,
        }
    }

    /// Overwrite every plane with uniform values. Effect planes reset to
    /// zero. Marks dirty.
    pub fn fill(&mut self, fill: ChunkFill) {
        {
            let mut state = self.lock();
            inflate_locked(&mut state, self.config.extent);
            let planes = &mut state.planes;
            planes.voxels.fill(fill.voxel);
            planes.skylight.fill(fill.skylight);
            planes.blocklight.fill(fill.blocklight);
            planes.metadata.fill(fill.metadata);
            if let Some(materials) = planes.materials.as_mut() {
                materials.fill(fill.material);
            }
            if let Some(cache) = planes.skylight_cache.as_mut() {
                cache.fill(fill.skylight_cache);
            }
            if let Some(cache) = planes.blocklight_cache.as_mut() {
                cache.fill(fill.blocklight_cache);
            }
            if let Some(density) = planes.effect_density.as_mut() {
                density.fill(0.0);
            }
            if let Some(velocity) = planes.effect_velocity.as_mut() {
                velocity.fill(VelocitySample::default());
            }
            if let Some(lifetime) = planes.effect_lifetime.as_mut() {
                lifetime.fill(0.0);
            }
        }
        self.mark_dirty(true);
    }

    /// Bulk-copy the voxel plane only. Marks dirty.
    pub fn assign_voxels(&mut self, data: &[VoxelId]) -> Result<(), ChunkError> {
        {
            let mut state = self.lock();
            inflate_locked(&mut state, self.config.extent);
            if data.len() != state.planes.voxels.len() {
                return Err(ChunkError::SizeMismatch {
                    expected: state.planes.voxels.len(),
                    actual: data.len(),
                });
            }
            state.planes.voxels.copy_from_slice(data);
        }
        self.mark_dirty(true);
        Ok(())
    }

    pub fn set_compression_hooks(
        &self,
        encode: Arc<CompressFn>,
        decode: Option<Arc<DecompressFn>>,
    ) {
        let mut state = self.lock();
        state.encode = Some(encode);
        state.decode = decode;
    }

    pub fn request_compression(&self) {
        self.lock().compression_requested = true;
    }

    /// Encode the present plane set into the blob if compression was
    /// requested and an encoder is installed. The encoder always sees live
    /// data. Returns whether an encode happened.
    pub fn flush_compression(&self) -> bool {
        let mut state = self.lock();
        if !state.compression_requested {
            return false;
        }
        let Some(encode) = state.encode.clone() else {
            return false;
        };
        inflate_locked(&mut state, self.config.extent);
        let state = &mut *state;
        state.compressed_blob = encode(&state.planes.views(self.config.extent));
        state.compression_requested = false;
        state.compressed = true;
        true
    }

    /// Explicitly re-inflate. Idempotent; returns whether a decode ran.
    pub fn decompress(&self) -> bool {
        let mut state = self.lock();
        if !state.compressed || state.compressed_blob.is_empty() {
            return false;
        }
        inflate_locked(&mut state, self.config.extent);
        true
    }

    pub fn compressed(&self) -> bool {
        self.lock().compressed
    }

    pub fn compressed_blob(&self) -> Vec<u8> {
        self.lock().compressed_blob.clone()
    }

    pub fn clear_compression(&self) {
        let mut state = self.lock();
        state.compression_requested = false;
        state.compressed = false;
        state.compressed_blob.clear();
    }

    /// Set or clear the dirty flag. Setting it fires the listeners in
    /// registration order.
    pub fn mark_dirty(&mut self, value: bool) {
        self.dirty = value;
        if value {
            for listener in &self.listeners {
                listener();
            }
        }
    }

    #[inline]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn add_dirty_listener(&mut self, listener: DirtyListener) {
        self.listeners.push(listener);
    }

    pub fn clear_dirty_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Swap in another chunk's planes, config and compression state while
    /// keeping this chunk's listener list. Used by blob ingestion. Clears
    /// dirty.
    pub fn replace_contents(&mut self, other: ChunkStorage) {
        self.config = other.config;
        *self.state.get_mut().unwrap_or_else(|e| e.into_inner()) =
            other.state.into_inner().unwrap_or_else(|e| e.into_inner());
        self.dirty = false;
    }
}

impl Default for ChunkStorage {
    fn default() -> Self {
        Self::new(ChunkConfig::default())
    }
}

impl Clone for ChunkStorage {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            state: Mutex::new(self.lock().clone()),
            dirty: self.dirty,
            listeners: self.listeners.clone(),
        }
    }
}

fn inflate_locked(state: &mut ChunkState, extent: ChunkExtent) {
    if !state.compressed || state.compressed_blob.is_empty() {
        return;
    }
    if let Some(decode) = state.decode.clone() {
        let blob = std::mem::take(&mut state.compressed_blob);
        decode(state.planes.views_mut(extent), &blob);
    } else {
        state.compressed_blob.clear();
    }
    state.compressed = false;
}

/// Read guard over a chunk's planes.
pub struct PlanesRef<'a> {
    state: MutexGuard<'a, ChunkState>,
    extent: ChunkExtent,
}

impl PlanesRef<'_> {
    #[inline]
    pub fn extent(&self) -> ChunkExtent {
        self.extent
    }

    #[inline]
    pub fn voxels(&self) -> Span3<'_, VoxelId> {
        Span3::new(&self.state.planes.voxels, self.extent)
    }

    #[inline]
    pub fn skylight(&self) -> Span3<'_, u8> {
        Span3::new(&self.state.planes.skylight, self.extent)
    }

    #[inline]
    pub fn blocklight(&self) -> Span3<'_, u8> {
        Span3::new(&self.state.planes.blocklight, self.extent)
    }

    #[inline]
    pub fn metadata(&self) -> Span3<'_, u8> {
        Span3::new(&self.state.planes.metadata, self.extent)
    }

    pub fn materials(&self) -> Result<Span3<'_, MaterialIndex>, ChunkError> {
        self.state
            .planes
            .materials
            .as_deref()
            .map(|p| Span3::new(p, self.extent))
            .ok_or(ChunkError::DisabledPlane("materials"))
    }

    pub fn skylight_cache(&self) -> Result<Span3<'_, f32>, ChunkError> {
        self.state
            .planes
            .skylight_cache
            .as_deref()
            .map(|p| Span3::new(p, self.extent))
            .ok_or(ChunkError::DisabledPlane("skylight_cache"))
    }

    pub fn blocklight_cache(&self) -> Result<Span3<'_, f32>, ChunkError> {
        self.state
            .planes
            .blocklight_cache
            .as_deref()
            .map(|p| Span3::new(p, self.extent))
            .ok_or(ChunkError::DisabledPlane("blocklight_cache"))
    }

    pub fn effect_density(&self) -> Result<Span3<'_, f32>, ChunkError> {
        self.state
            .planes
            .effect_density
            .as_deref()
            .map(|p| Span3::new(p, self.extent))
            .ok_or(ChunkError::DisabledPlane("effect_density"))
    }

    pub fn effect_velocity(&self) -> Result<Span3<'_, VelocitySample>, ChunkError> {
        self.state
            .planes
            .effect_velocity
            .as_deref()
            .map(|p| Span3::new(p, self.extent))
            .ok_or(ChunkError::DisabledPlane("effect_velocity"))
    }

    pub fn effect_lifetime(&self) -> Result<Span3<'_, f32>, ChunkError> {
        self.state
            .planes
            .effect_lifetime
            .as_deref()
            .map(|p| Span3::new(p, self.extent))
            .ok_or(ChunkError::DisabledPlane("effect_lifetime"))
    }

    /// All present planes at once.
    pub fn views(&self) -> PlaneViews<'_> {
        self.state.planes.views(self.extent)
    }
}

/// Write guard over a chunk's planes.
pub struct PlanesMut<'a> {
    state: MutexGuard<'a, ChunkState>,
    extent: ChunkExtent,
}

impl PlanesMut<'_> {
    #[inline]
    pub fn extent(&self) -> ChunkExtent {
        self.extent
    }

    #[inline]
    pub fn voxels(&mut self) -> Span3Mut<'_, VoxelId> {
        Span3Mut::new(&mut self.state.planes.voxels, self.extent)
    }

    #[inline]
    pub fn skylight(&mut self) -> Span3Mut<'_, u8> {
        Span3Mut::new(&mut self.state.planes.skylight, self.extent)
    }

    #[inline]
    pub fn blocklight(&mut self) -> Span3Mut<'_, u8> {
        Span3Mut::new(&mut self.state.planes.blocklight, self.extent)
    }

    #[inline]
    pub fn metadata(&mut self) -> Span3Mut<'_, u8> {
        Span3Mut::new(&mut self.state.planes.metadata, self.extent)
    }

    pub fn materials(&mut self) -> Result<Span3Mut<'_, MaterialIndex>, ChunkError> {
        let extent = self.extent;
        self.state
            .planes
            .materials
            .as_deref_mut()
            .map(|p| Span3Mut::new(p, extent))
            .ok_or(ChunkError::DisabledPlane("materials"))
    }

    pub fn skylight_cache(&mut self) -> Result<Span3Mut<'_, f32>, ChunkError> {
        let extent = self.extent;
        self.state
            .planes
            .skylight_cache
            .as_deref_mut()
            .map(|p| Span3Mut::new(p, extent))
            .ok_or(ChunkError::DisabledPlane("skylight_cache"))
    }

    pub fn blocklight_cache(&mut self) -> Result<Span3Mut<'_, f32>, ChunkError> {
        let extent = self.extent;
        self.state
            .planes
            .blocklight_cache
            .as_deref_mut()
            .map(|p| Span3Mut::new(p, extent))
            .ok_or(ChunkError::DisabledPlane("blocklight_cache"))
    }

    pub fn effect_density(&mut self) -> Result<Span3Mut<'_, f32>, ChunkError> {
        let extent = self.extent;
        self.state
            .planes
            .effect_density
            .as_deref_mut()
            .map(|p| Span3Mut::new(p, extent))
            .ok_or(ChunkError::DisabledPlane("effect_density"))
    }

    pub fn effect_velocity(&mut self) -> Result<Span3Mut<'_, VelocitySample>, ChunkError> {
        let extent = self.extent;
        self.state
            .planes
            .effect_velocity
            .as_deref_mut()
            .map(|p| Span3Mut::new(p, extent))
            .ok_or(ChunkError::DisabledPlane("effect_velocity"))
    }

    pub fn effect_lifetime(&mut self) -> Result<Span3Mut<'_, f32>, ChunkError> {
        let extent = self.extent;
        self.state
            .planes
            .effect_lifetime
            .as_deref_mut()
            .map(|p| Span3Mut::new(p, extent))
            .ok_or(ChunkError::DisabledPlane("effect_lifetime"))
    }

    /// All present planes at once, mutably.
    pub fn views_mut(&mut self) -> PlaneViewsMut<'_> {
        self.state.planes.views_mut(self.extent)
    }
}
