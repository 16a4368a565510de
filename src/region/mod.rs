// src/region/mod.rs
//
// Owner of all loaded chunks. Streams chunks in through an optional loader,
// evicts least-recently-used chunks past a resident cap (saving dirty ones
// through an optional saver), runs deferred per-chunk tasks with a budget,
// fans dirty notifications out to observers, and keeps lazily rebuilt
// navigation grids per region.
//
// Chunks are shared-owned: `find`/`snapshot_loaded` hand out `Arc` handles
// that survive eviction, and mutation goes through `Arc::make_mut`, so a
// held snapshot sees the pre-write planes instead of racing the writer.

mod lru;

use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use rustc_hash::FxHashMap as HashMap;
use tracing::{debug, trace};

use crate::chunk::{ChunkConfig, ChunkStorage};
use crate::core::{ChunkExtent, RegionKey};
use crate::nav::{
    build_nav_grid, stitch_neighbor_regions, NavBuildConfig, NavGrid, NavRegionView,
    StitchedNavGraph,
};

use lru::RecencyQueue;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("chunk loader failed for region {key:?}")]
    Loader {
        key: RegionKey,
        #[source]
        source: BoxedError,
    },
    #[error("chunk saver failed for region {key:?}")]
    Saver {
        key: RegionKey,
        #[source]
        source: BoxedError,
    },
    #[error("deferred task failed for region {key:?}")]
    Task {
        key: RegionKey,
        #[source]
        source: BoxedError,
    },
}

pub type LoaderFn = dyn FnMut(RegionKey) -> Result<ChunkStorage, BoxedError>;
pub type SaverFn = dyn FnMut(RegionKey, &ChunkStorage) -> Result<(), BoxedError>;
pub type TaskFn = dyn FnOnce(&mut ChunkStorage, RegionKey) -> Result<(), BoxedError>;
pub type DirtyObserverFn = dyn FnMut(RegionKey);

enum Task {
    User(Box<TaskFn>),
    NavRebuild,
}

struct RegionEntry {
    chunk: Arc<ChunkStorage>,
    pinned: bool,
}

#[derive(Default)]
struct NavEntry {
    grid: Option<Arc<NavGrid>>,
    dirty: bool,
    rebuild_pending: bool,
    revision: u64,
}

/// Shared-const handle to a loaded chunk, safe to keep across ticks and
/// evictions.
#[derive(Clone)]
pub struct RegionSnapshot {
    pub key: RegionKey,
    pub chunk: Arc<ChunkStorage>,
}

pub struct RegionManager {
    chunk_config: ChunkConfig,
    regions: HashMap<RegionKey, RegionEntry>,
    lru: RecencyQueue,
    max_resident: usize,
    loader: Option<Box<LoaderFn>>,
    saver: Option<Box<SaverFn>>,
    tasks: VecDeque<(RegionKey, Task)>,
    observers: Vec<Box<DirtyObserverFn>>,
    nav_enabled: bool,
    nav_config: NavBuildConfig,
    nav_cache: HashMap<RegionKey, NavEntry>,
    dirty_tx: Sender<RegionKey>,
    dirty_rx: Receiver<RegionKey>,
}

impl RegionManager {
    pub fn new(chunk_dimensions: ChunkExtent) -> Self {
        Self::with_chunk_config(ChunkConfig {
            extent: chunk_dimensions,
            ..ChunkConfig::default()
        })
    }

    /// Manager whose default-constructed chunks carry the given optional
    /// planes.
    pub fn with_chunk_config(chunk_config: ChunkConfig) -> Self {
        let (dirty_tx, dirty_rx) = crossbeam_channel::unbounded();
        Self {
            chunk_config,
            regions: HashMap::default(),
            lru: RecencyQueue::new(),
            max_resident: 128,
            loader: None,
            saver: None,
            tasks: VecDeque::new(),
            observers: Vec::new(),
            nav_enabled: false,
            nav_config: NavBuildConfig::default(),
            nav_cache: HashMap::default(),
            dirty_tx,
            dirty_rx,
        }
    }

    #[inline]
    pub fn chunk_dimensions(&self) -> ChunkExtent {
        self.chunk_config.extent
    }

    #[inline]
    pub fn chunk_config(&self) -> &ChunkConfig {
        &self.chunk_config
    }

    /// Look up or create the chunk for `key` and touch the LRU. Never
    /// evicts. Fails only when a user loader fails.
    pub fn assure(&mut self, key: RegionKey) -> Result<&mut ChunkStorage, RegionError> {
        if !self.regions.contains_key(&key) {
            let mut chunk = match self.loader.as_mut() {
                Some(loader) => {
                    loader(key).map_err(|source| RegionError::Loader { key, source })?
                }
                None => ChunkStorage::new(self.chunk_config),
            };
            let tx = self.dirty_tx.clone();
            chunk.add_dirty_listener(Arc::new(move || {
                let _ = tx.send(key);
            }));
            debug!(?key, "chunk loaded");
            self.regions.insert(
                key,
                RegionEntry {
                    chunk: Arc::new(chunk),
                    pinned: false,
                },
            );
        }

        self.lru.touch(key);
        let entry = self
            .regions
            .get_mut(&key)
            .expect("region resident after load_or_create");
        Ok(Arc::make_mut(&mut entry.chunk))
    }

    /// Shared handle without touching the LRU.
    pub fn find(&self, key: RegionKey) -> Option<Arc<ChunkStorage>> {
        self.regions.get(&key).map(|entry| entry.chunk.clone())
    }

    pub fn set_loader(
        &mut self,
        loader: impl FnMut(RegionKey) -> Result<ChunkStorage, BoxedError> + 'static,
    ) {
        self.loader = Some(Box::new(loader));
    }

    pub fn set_saver(
        &mut self,
        saver: impl FnMut(RegionKey, &ChunkStorage) -> Result<(), BoxedError> + 'static,
    ) {
        self.saver = Some(Box::new(saver));
    }

    pub fn set_max_resident(&mut self, limit: usize) -> Result<(), RegionError> {
        self.max_resident = limit;
        self.evict_until_within_limit()
    }

    #[inline]
    pub fn max_resident(&self) -> usize {
        self.max_resident
    }

    #[inline]
    pub fn resident(&self) -> usize {
        self.regions.len()
    }

    /// Forbid eviction of `key` until unpinned.
    pub fn pin(&mut self, key: RegionKey) {
        if let Some(entry) = self.regions.get_mut(&key) {
            entry.pinned = true;
        }
    }

    /// Allow eviction again; the chunk re-enters the LRU at the
    /// most-recently-used end.
    pub fn unpin(&mut self, key: RegionKey) {
        if let Some(entry) = self.regions.get_mut(&key) {
            entry.pinned = false;
            self.lru.touch(key);
        }
    }

    /// Append a deferred task; tasks run FIFO across all keys.
    pub fn enqueue_task(
        &mut self,
        key: RegionKey,
        task: impl FnOnce(&mut ChunkStorage, RegionKey) -> Result<(), BoxedError> + 'static,
    ) {
        self.tasks.push_back((key, Task::User(Box::new(task))));
    }

    #[inline]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn add_dirty_observer(&mut self, observer: impl FnMut(RegionKey) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Drain dirty notifications, run up to `budget` queued tasks in FIFO
    /// order, then evict down to the resident cap. Returns the number of
    /// tasks processed. A failing task leaves the queue positioned past it.
    pub fn tick(&mut self, budget: usize) -> Result<usize, RegionError> {
        self.drain_dirty_events();

        let mut processed = 0;
        while processed < budget {
            let Some((key, task)) = self.tasks.pop_front() else {
                break;
            };
            match task {
                Task::User(task) => {
                    let chunk = self.assure(key)?;
                    task(chunk, key).map_err(|source| RegionError::Task { key, source })?;
                }
                Task::NavRebuild => self.run_nav_rebuild(key)?,
            }
            processed += 1;
        }

        if processed > 0 {
            trace!(processed, remaining = self.tasks.len(), "tick drained tasks");
        }
        self.evict_until_within_limit()?;
        Ok(processed)
    }

    /// Run every queued task.
    pub fn tick_all(&mut self) -> Result<usize, RegionError> {
        self.tick(usize::MAX)
    }

    pub fn for_each_loaded(&self, mut visitor: impl FnMut(RegionKey, &ChunkStorage)) {
        for (key, entry) in &self.regions {
            visitor(*key, &entry.chunk);
        }
    }

    /// Shared handles to loaded chunks; by default only dirty ones.
    pub fn snapshot_loaded(&self, include_clean: bool) -> Vec<RegionSnapshot> {
        let mut snapshots = Vec::with_capacity(self.regions.len());
        for (key, entry) in &self.regions {
            if !include_clean && !entry.chunk.dirty() {
                continue;
            }
            snapshots.push(RegionSnapshot {
                key: *key,
                chunk: entry.chunk.clone(),
            });
        }
        snapshots
    }

    /// Drop a chunk, saving it first when dirty. No-op (false) for pinned
    /// or missing keys.
    pub fn unload(&mut self, key: RegionKey) -> Result<bool, RegionError> {
        let Some(entry) = self.regions.get(&key) else {
            return Ok(false);
        };
        if entry.pinned {
            return Ok(false);
        }

        self.save_if_dirty(key)?;
        self.nav_cache.remove(&key);
        self.lru.remove(&key);
        self.regions.remove(&key);
        debug!(?key, "chunk unloaded");
        Ok(true)
    }

    /// Evict least-recently-used unpinned chunks until the resident count
    /// fits the cap.
    pub fn evict_until_within_limit(&mut self) -> Result<(), RegionError> {
        while self.regions.len() > self.max_resident && !self.lru.is_empty() {
            let Some(key) = self.lru.pop_oldest() else {
                break;
            };
            let Some(entry) = self.regions.get(&key) else {
                continue;
            };
            if entry.pinned {
                continue;
            }

            self.save_if_dirty(key)?;
            self.nav_cache.remove(&key);
            self.regions.remove(&key);
            debug!(?key, "chunk evicted");
        }
        Ok(())
    }

    fn save_if_dirty(&mut self, key: RegionKey) -> Result<(), RegionError> {
        let Some(entry) = self.regions.get(&key) else {
            return Ok(());
        };
        if !entry.chunk.dirty() {
            return Ok(());
        }
        if let Some(saver) = self.saver.as_mut() {
            saver(key, &entry.chunk).map_err(|source| RegionError::Saver { key, source })?;
            trace!(?key, "dirty chunk saved");
        }
        Ok(())
    }

    // ----------------------------
    // Navigation integration
    // ----------------------------

    /// Turn cached navigation on or off. Enabling marks every resident
    /// chunk's nav entry dirty so grids rebuild on the next ticks.
    pub fn enable_navigation(&mut self, enabled: bool) {
        self.nav_enabled = enabled;
        if enabled {
            let keys: Vec<RegionKey> = self.regions.keys().copied().collect();
            for key in keys {
                self.mark_nav_dirty(key);
            }
        }
    }

    #[inline]
    pub fn navigation_enabled(&self) -> bool {
        self.nav_enabled
    }

    pub fn set_navigation_build_config(&mut self, config: NavBuildConfig) {
        self.nav_config = config;
        let keys: Vec<RegionKey> = self.regions.keys().copied().collect();
        for key in keys {
            self.mark_nav_dirty(key);
        }
    }

    #[inline]
    pub fn navigation_build_config(&self) -> &NavBuildConfig {
        &self.nav_config
    }

    /// Cached grid for `key`, or None when disabled or not built yet.
    pub fn navigation_grid(&self, key: RegionKey) -> Option<Arc<NavGrid>> {
        if !self.nav_enabled {
            return None;
        }
        self.nav_cache.get(&key)?.grid.clone()
    }

    /// Revision counter of the cached grid; bumps on every rebuild.
    pub fn navigation_revision(&self, key: RegionKey) -> u64 {
        self.nav_cache.get(&key).map_or(0, |entry| entry.revision)
    }

    pub fn request_navigation_rebuild(&mut self, key: RegionKey) {
        self.mark_nav_dirty(key);
    }

    /// Collect the nav grids of `origin` and the given neighbors and bridge
    /// them face to face.
    pub fn stitch_navigation(
        &self,
        origin: RegionKey,
        neighbors: &[RegionKey],
    ) -> StitchedNavGraph {
        let mut graph = StitchedNavGraph::default();
        let mut push = |key: RegionKey| {
            if let Some(grid) = self.navigation_grid(key) {
                graph.regions.push(NavRegionView { key, grid });
            }
        };
        push(origin);
        for &key in neighbors {
            push(key);
        }

        stitch_neighbor_regions(&self.nav_config.neighbor, self.chunk_config.extent, &mut graph);
        graph
    }

    fn mark_nav_dirty(&mut self, key: RegionKey) {
        let entry = self.nav_cache.entry(key).or_default();
        entry.dirty = true;
        self.schedule_nav_rebuild(key);
    }

    /// At most one rebuild task sits in the queue per key, guarded by
    /// `rebuild_pending`.
    fn schedule_nav_rebuild(&mut self, key: RegionKey) {
        if !self.nav_enabled {
            return;
        }
        let entry = self.nav_cache.entry(key).or_default();
        if entry.rebuild_pending {
            return;
        }
        entry.rebuild_pending = true;
        self.tasks.push_back((key, Task::NavRebuild));
    }

    fn run_nav_rebuild(&mut self, key: RegionKey) -> Result<(), RegionError> {
        if !self.nav_enabled {
            if let Some(entry) = self.nav_cache.get_mut(&key) {
                entry.rebuild_pending = false;
            }
            return Ok(());
        }

        let config = self.nav_config.clone();
        let chunk = self.assure(key)?;
        let grid = build_nav_grid(chunk, &config);

        let entry = self.nav_cache.entry(key).or_default();
        entry.grid = Some(Arc::new(grid));
        entry.dirty = false;
        entry.rebuild_pending = false;
        entry.revision = entry.revision.wrapping_add(1);
        trace!(?key, revision = entry.revision, "nav grid rebuilt");
        Ok(())
    }

    /// Pull queued dirty notifications from chunk listeners: mark nav
    /// entries dirty and fan out to observers.
    fn drain_dirty_events(&mut self) {
        let keys: Vec<RegionKey> = self.dirty_rx.try_iter().collect();
        if keys.is_empty() {
            return;
        }

        let mut observers = std::mem::take(&mut self.observers);
        for &key in &keys {
            self.mark_nav_dirty(key);
            for observer in observers.iter_mut() {
                observer(key);
            }
        }
        let added = std::mem::replace(&mut self.observers, observers);
        self.observers.extend(added);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cubic_extent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn key(x: i32) -> RegionKey {
        RegionKey::new(x, 0, 0)
    }

    #[test]
    fn assure_creates_zeroed_chunk_without_loader() {
        let mut manager = RegionManager::new(cubic_extent(4));
        let chunk = manager.assure(key(0)).expect("no loader cannot fail");
        assert_eq!(chunk.extent(), cubic_extent(4));
        assert!(chunk.planes().voxels().linear().iter().all(|&v| v == 0));
        assert_eq!(manager.resident(), 1);
    }

    #[test]
    fn loader_supplies_chunk_contents() {
        let mut manager = RegionManager::new(cubic_extent(2));
        manager.set_loader(|key| {
            let mut chunk = ChunkStorage::with_extent(cubic_extent(2));
            chunk.planes_mut().voxels().set(0, 0, 0, key.x as u16);
            chunk.mark_dirty(false);
            Ok(chunk)
        });

        let chunk = manager.assure(key(7)).expect("loader succeeds");
        assert_eq!(chunk.planes().voxels().at(0, 0, 0), 7);
    }

    #[test]
    fn loader_failure_propagates() {
        let mut manager = RegionManager::new(cubic_extent(2));
        manager.set_loader(|_| Err("backing store offline".into()));
        let err = manager.assure(key(1)).unwrap_err();
        assert!(matches!(err, RegionError::Loader { .. }));
        assert_eq!(manager.resident(), 0);
    }

    #[test]
    fn find_does_not_create_or_touch() {
        let mut manager = RegionManager::new(cubic_extent(2));
        assert!(manager.find(key(0)).is_none());
        manager.assure(key(0)).expect("create");
        assert!(manager.find(key(0)).is_some());
        assert_eq!(manager.resident(), 1);
    }

    #[test]
    fn eviction_respects_cap_and_order() {
        let mut manager = RegionManager::new(cubic_extent(2));
        manager.set_max_resident(2).expect("no saver");

        manager.assure(key(0)).expect("a");
        manager.assure(key(1)).expect("b");
        manager.assure(key(2)).expect("c");
        manager.tick(0).expect("evict pass");

        assert_eq!(manager.resident(), 2);
        assert!(manager.find(key(0)).is_none(), "oldest evicted");
        assert!(manager.find(key(1)).is_some());
        assert!(manager.find(key(2)).is_some());
    }

    #[test]
    fn saver_runs_for_dirty_evictions_only() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let saved_in_saver = saved.clone();

        let mut manager = RegionManager::new(cubic_extent(2));
        manager.set_saver(move |key, _chunk| {
            saved_in_saver.lock().expect("test saver lock").push(key);
            Ok(())
        });
        manager.set_max_resident(1).expect("empty");

        // Clean chunk: evicted silently. Fresh default chunks are clean.
        manager.assure(key(0)).expect("a");
        manager.assure(key(1)).expect("b");
        manager.tick(0).expect("evict");
        assert!(saved.lock().expect("lock").is_empty());

        // Dirty chunk: saved on eviction.
        manager
            .assure(key(1))
            .expect("resident")
            .planes_mut()
            .voxels()
            .set(0, 0, 0, 5);
        manager.assure(key(2)).expect("c");
        manager.tick(0).expect("evict");
        assert_eq!(*saved.lock().expect("lock"), vec![key(1)]);
    }

    #[test]
    fn pinned_chunks_never_evict() {
        let mut manager = RegionManager::new(cubic_extent(2));
        manager.set_max_resident(1).expect("empty");

        manager.assure(key(0)).expect("a");
        manager.pin(key(0));
        manager.assure(key(1)).expect("b");
        manager.tick(0).expect("evict");

        assert!(manager.find(key(0)).is_some(), "pinned survives");
        assert!(manager.find(key(1)).is_none(), "unpinned newcomer evicted");

        manager.unpin(key(0));
        manager.assure(key(2)).expect("c");
        manager.tick(0).expect("evict");
        assert!(manager.find(key(0)).is_none(), "unpinned now evictable");
        assert!(manager.find(key(2)).is_some());
    }

    #[test]
    fn tasks_run_fifo_with_budget() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut manager = RegionManager::new(cubic_extent(2));

        for i in 0..4 {
            let order = order.clone();
            manager.enqueue_task(key(i), move |_chunk, key| {
                order.lock().expect("lock").push(key.x);
                Ok(())
            });
        }

        assert_eq!(manager.tick(2).expect("tick"), 2);
        assert_eq!(*order.lock().expect("lock"), vec![0, 1]);
        assert_eq!(manager.tick_all().expect("tick"), 2);
        assert_eq!(*order.lock().expect("lock"), vec![0, 1, 2, 3]);
    }

    #[test]
    fn failing_task_leaves_queue_past_it() {
        let mut manager = RegionManager::new(cubic_extent(2));
        manager.enqueue_task(key(0), |_chunk, _key| Err("boom".into()));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_in_task = ran.clone();
        manager.enqueue_task(key(1), move |_chunk, _key| {
            ran_in_task.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = manager.tick_all().unwrap_err();
        assert!(matches!(err, RegionError::Task { .. }));
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        // The failed task is gone; the rest of the queue still runs.
        assert_eq!(manager.tick_all().expect("tick"), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dirty_observers_fan_out_on_tick() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_observer = seen.clone();

        let mut manager = RegionManager::new(cubic_extent(2));
        manager.add_dirty_observer(move |key| {
            seen_in_observer.lock().expect("lock").push(key);
        });

        manager
            .assure(key(3))
            .expect("create")
            .planes_mut()
            .voxels()
            .set(0, 0, 0, 1);
        assert!(seen.lock().expect("lock").is_empty(), "deferred to tick");

        manager.tick(0).expect("tick");
        assert_eq!(*seen.lock().expect("lock"), vec![key(3)]);
    }

    #[test]
    fn snapshot_filters_clean_chunks() {
        let mut manager = RegionManager::new(cubic_extent(2));
        manager.assure(key(0)).expect("clean");
        manager
            .assure(key(1))
            .expect("dirty")
            .planes_mut()
            .voxels()
            .set(0, 0, 0, 1);

        let dirty_only = manager.snapshot_loaded(false);
        assert_eq!(dirty_only.len(), 1);
        assert_eq!(dirty_only[0].key, key(1));

        assert_eq!(manager.snapshot_loaded(true).len(), 2);
    }

    #[test]
    fn snapshot_survives_eviction_with_old_contents() {
        let mut manager = RegionManager::new(cubic_extent(2));
        manager
            .assure(key(0))
            .expect("create")
            .planes_mut()
            .voxels()
            .set(0, 0, 0, 9);

        let snapshot = manager.find(key(0)).expect("resident");
        manager.unload(key(0)).expect("unpinned");
        assert!(manager.find(key(0)).is_none());
        assert_eq!(snapshot.planes().voxels().at(0, 0, 0), 9);

        // A held snapshot makes the next write copy instead of mutate.
        manager
            .assure(key(0))
            .expect("recreate")
            .planes_mut()
            .voxels()
            .set(0, 0, 0, 1);
        assert_eq!(snapshot.planes().voxels().at(0, 0, 0), 9);
    }

    #[test]
    fn unload_pinned_or_missing_is_noop() {
        let mut manager = RegionManager::new(cubic_extent(2));
        assert!(!manager.unload(key(0)).expect("missing"));
        manager.assure(key(0)).expect("create");
        manager.pin(key(0));
        assert!(!manager.unload(key(0)).expect("pinned"));
        manager.unpin(key(0));
        assert!(manager.unload(key(0)).expect("unpinned"));
    }

    #[test]
    fn nav_rebuild_coalesces_and_reflects_edits() {
        let mut manager = RegionManager::new(cubic_extent(4));
        manager.enable_navigation(true);

        // Floor at y == 0.
        {
            let chunk = manager.assure(key(0)).expect("create");
            let mut planes = chunk.planes_mut();
            let mut voxels = planes.voxels();
            for z in 0..4 {
                for x in 0..4 {
                    voxels.set(x, 0, z, 1);
                }
            }
        }
        manager.tick_all().expect("rebuild");

        let grid = manager.navigation_grid(key(0)).expect("built");
        assert!(grid.walkable_at(0, 1, 0));
        let revision = manager.navigation_revision(key(0));

        // Many edits before the next tick still queue exactly one rebuild.
        for i in 0..5 {
            manager
                .assure(key(0))
                .expect("resident")
                .planes_mut()
                .voxels()
                .set(i % 4, 1, 0, 1);
        }
        manager.drain_dirty_events();
        let nav_tasks = manager.pending_tasks();
        assert_eq!(nav_tasks, 1, "rebuilds coalesce per key");

        manager.tick_all().expect("rebuild");
        assert_eq!(manager.navigation_revision(key(0)), revision + 1);
        let grid = manager.navigation_grid(key(0)).expect("rebuilt");
        assert!(!grid.walkable_at(0, 1, 0), "edit reflected after tick");
    }

    #[test]
    fn navigation_grid_requires_enable() {
        let mut manager = RegionManager::new(cubic_extent(2));
        manager.assure(key(0)).expect("create");
        manager.tick_all().expect("tick");
        assert!(manager.navigation_grid(key(0)).is_none());
    }

    #[test]
    fn stitch_navigation_bridges_adjacent_grids() {
        let mut manager = RegionManager::new(cubic_extent(4));
        manager.enable_navigation(true);

        for k in [key(0), key(1)] {
            let chunk = manager.assure(k).expect("create");
            let mut planes = chunk.planes_mut();
            let mut voxels = planes.voxels();
            for z in 0..4 {
                for x in 0..4 {
                    voxels.set(x, 0, z, 1);
                }
            }
        }
        manager.tick_all().expect("rebuild");

        let graph = manager.stitch_navigation(key(0), &[key(1)]);
        assert_eq!(graph.regions.len(), 2);
        assert!(!graph.bridges.is_empty());
    }
}
