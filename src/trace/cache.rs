// src/trace/cache.rs
//
// Per-region acceleration structures (SVO + clipmap) rebuilt on demand.
// Callers wire the cache to a region manager: a dirty observer invalidates
// entries, and queued tasks rebuild them and re-bake lighting.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap as HashMap;
use tracing::{debug, trace};

use crate::chunk::ChunkStorage;
use crate::core::RegionKey;
use crate::region::RegionManager;

use super::clipmap::ClipmapGrid;
use super::lighting::bake_lighting;
use super::svo::{GpuNode, SparseVoxelOctree};

#[derive(Clone, Debug, Default)]
pub struct RegionAccelEntry {
    pub svo: SparseVoxelOctree,
    pub clipmap: ClipmapGrid,
    pub dirty: bool,
}

#[derive(Default)]
pub struct AccelerationCache {
    regions: HashMap<RegionKey, RegionAccelEntry>,
}

impl AccelerationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild both structures for `key` from `chunk` and clear its dirty
    /// flag.
    pub fn update_region(&mut self, key: RegionKey, chunk: &ChunkStorage) {
        let entry = self.regions.entry(key).or_default();
        entry.svo.build(chunk, SparseVoxelOctree::DEFAULT_MAX_DEPTH);
        entry.clipmap.build(chunk);
        entry.dirty = false;
        trace!(?key, nodes = entry.svo.nodes().len(), "acceleration rebuilt");
    }

    /// Flag `key` for rebuild, creating an empty dirty entry if needed.
    pub fn invalidate_region(&mut self, key: RegionKey) {
        self.regions.entry(key).or_default().dirty = true;
    }

    pub fn find(&self, key: RegionKey) -> Option<&RegionAccelEntry> {
        self.regions.get(&key)
    }

    pub fn assure(&mut self, key: RegionKey) -> &mut RegionAccelEntry {
        self.regions.entry(key).or_default()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Rebuild every loaded region whose entry is absent or dirty.
    pub fn rebuild_dirty(&mut self, manager: &RegionManager) {
        let mut rebuilt = 0usize;
        for snapshot in manager.snapshot_loaded(true) {
            let needs_rebuild = self
                .regions
                .get(&snapshot.key)
                .map_or(true, |entry| entry.dirty);
            if needs_rebuild {
                self.update_region(snapshot.key, &snapshot.chunk);
                rebuilt += 1;
            }
        }
        if rebuilt > 0 {
            debug!(rebuilt, "acceleration cache caught up");
        }
    }
}

/// Append `key`'s exported SVO nodes to `out_buffer`, if cached.
pub fn export_gpu_nodes(cache: &AccelerationCache, key: RegionKey, out_buffer: &mut Vec<GpuNode>) {
    if let Some(entry) = cache.find(key) {
        out_buffer.extend(entry.svo.export_gpu_buffer());
    }
}

/// Wire the cache to a manager: catch up dirty entries now, invalidate on
/// every future dirty notification, and enqueue per-chunk tasks that
/// rebuild acceleration and re-bake lighting.
pub fn install_global_illumination(
    manager: &mut RegionManager,
    cache: &Arc<Mutex<AccelerationCache>>,
) {
    cache
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .rebuild_dirty(manager);

    let observer_cache = cache.clone();
    manager.add_dirty_observer(move |key| {
        observer_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .invalidate_region(key);
    });

    for snapshot in manager.snapshot_loaded(true) {
        let task_cache = cache.clone();
        manager.enqueue_task(snapshot.key, move |chunk, key| {
            let mut cache = task_cache.lock().unwrap_or_else(|e| e.into_inner());
            cache.update_region(key, chunk);
            bake_lighting(chunk);
            Ok(())
        });
    }
}
